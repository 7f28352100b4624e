// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keycloak admin API client.
//!
//! Authenticates with the client-credentials grant and talks to
//! `/admin/realms/{realm}/...`. A fresh admin token is requested for every
//! call; nothing is cached between requests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::KeycloakConfig;

/// A platform user as returned by the admin API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl IdentityUser {
    /// First value of a user attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RealmRole {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum KeycloakError {
    #[error("Keycloak auth failed: {0}")]
    Auth(String),

    #[error("Keycloak request failed: {0}")]
    Request(String),

    #[error("Keycloak response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Keycloak user not found: {0}")]
    UserNotFound(String),
}

/// Identity provider operations used by the invitation and account workflows.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, KeycloakError>;

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<IdentityUser>, KeycloakError>;

    async fn get_user_realm_roles(&self, user_id: &str) -> Result<Vec<RealmRole>, KeycloakError>;

    /// Merge `attributes` into the user's existing attributes.
    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: HashMap<String, Vec<String>>,
    ) -> Result<(), KeycloakError>;

    async fn remove_user_realm_roles(
        &self,
        user_id: &str,
        roles: &[RealmRole],
    ) -> Result<(), KeycloakError>;
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct KeycloakAdminClient {
    server_url: Url,
    realm: String,
    client_id: String,
    client_secret: String,
    http: Client,
}

impl KeycloakAdminClient {
    pub fn new(config: &KeycloakConfig, timeout: Duration) -> Result<Self, KeycloakError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeycloakError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            server_url: config.server_url.clone(),
            realm: config.realm.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http,
        })
    }

    /// Build `<server>/<prefix...>/<segments...>` with each segment escaped.
    fn endpoint(&self, prefix: &[&str], segments: &[&str]) -> Result<Url, KeycloakError> {
        let mut url = self.server_url.clone();
        url.path_segments_mut()
            .map_err(|_| KeycloakError::Request("server URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(prefix)
            .extend(segments);
        Ok(url)
    }

    fn admin_url(&self, segments: &[&str]) -> Result<Url, KeycloakError> {
        self.endpoint(&["admin", "realms", &self.realm], segments)
    }

    async fn access_token(&self) -> Result<String, KeycloakError> {
        let url = self.endpoint(
            &["realms", &self.realm],
            &["protocol", "openid-connect", "token"],
        )?;

        let mut form = HashMap::new();
        form.insert("grant_type", "client_credentials");
        form.insert("client_id", self.client_id.as_str());
        form.insert("client_secret", self.client_secret.as_str());

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| KeycloakError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(KeycloakError::Auth(format!(
                "token request returned {status}: {body}"
            )));
        }

        let token_response: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| KeycloakError::Auth(format!("invalid token response: {e}")))?;

        if token_response.access_token.trim().is_empty() {
            return Err(KeycloakError::Auth(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(token_response.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, KeycloakError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| KeycloakError::Request(e.to_string()))?;

        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| KeycloakError::InvalidResponse(e.to_string()))
    }

    async fn find_users(&self, query: &[(&str, &str)]) -> Result<Vec<IdentityUser>, KeycloakError> {
        let url = self.admin_url(&["users"])?;
        self.get_json(url, query).await
    }
}

#[async_trait]
impl IdentityAdmin for KeycloakAdminClient {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, KeycloakError> {
        debug!(realm = %self.realm, "Looking up user by email");
        let users = self
            .find_users(&[("email", email), ("exact", "true")])
            .await?;
        Ok(pick_user(users, |u| {
            u.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        }))
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<IdentityUser>, KeycloakError> {
        debug!(realm = %self.realm, username = %username, "Looking up user by username");
        let users = self
            .find_users(&[("username", username), ("exact", "true")])
            .await?;
        Ok(pick_user(users, |u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn get_user_realm_roles(&self, user_id: &str) -> Result<Vec<RealmRole>, KeycloakError> {
        let url = self.admin_url(&["users", user_id, "role-mappings", "realm"])?;
        self.get_json(url, &[]).await
    }

    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: HashMap<String, Vec<String>>,
    ) -> Result<(), KeycloakError> {
        let url = self.admin_url(&["users", user_id])?;
        let mut representation: Value = self.get_json(url.clone(), &[]).await?;
        merge_attributes(&mut representation, attributes)?;

        let token = self.access_token().await?;
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&representation)
            .send()
            .await
            .map_err(|e| KeycloakError::Request(e.to_string()))?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn remove_user_realm_roles(
        &self,
        user_id: &str,
        roles: &[RealmRole],
    ) -> Result<(), KeycloakError> {
        if roles.is_empty() {
            return Ok(());
        }

        let url = self.admin_url(&["users", user_id, "role-mappings", "realm"])?;
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(token)
            .json(roles)
            .send()
            .await
            .map_err(|e| KeycloakError::Request(e.to_string()))?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, KeycloakError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(KeycloakError::UserNotFound(url));
    }
    Err(KeycloakError::Request(format!(
        "{url} returned {status}: {body}"
    )))
}

/// `exact=true` is not honoured by every Keycloak version, so the result set
/// is filtered again locally.
fn pick_user<F>(users: Vec<IdentityUser>, predicate: F) -> Option<IdentityUser>
where
    F: Fn(&IdentityUser) -> bool,
{
    users.into_iter().find(|u| predicate(u))
}

fn merge_attributes(
    representation: &mut Value,
    attributes: HashMap<String, Vec<String>>,
) -> Result<(), KeycloakError> {
    let object = representation.as_object_mut().ok_or_else(|| {
        KeycloakError::InvalidResponse("user representation is not an object".to_string())
    })?;

    let existing = object
        .entry("attributes")
        .or_insert_with(|| Value::Object(Default::default()));
    if existing.is_null() {
        *existing = Value::Object(Default::default());
    }
    let existing = existing.as_object_mut().ok_or_else(|| {
        KeycloakError::InvalidResponse("user attributes are not an object".to_string())
    })?;

    for (key, values) in attributes {
        existing.insert(
            key,
            Value::Array(values.into_iter().map(Value::String).collect()),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> KeycloakAdminClient {
        let config = KeycloakConfig {
            server_url: Url::parse("https://keycloak.example.com/auth/").unwrap(),
            realm: "platform".to_string(),
            client_id: "auth-service".to_string(),
            client_secret: "secret".to_string(),
            base_role: "uma_authorization".to_string(),
        };
        KeycloakAdminClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn admin_url_escapes_segments() {
        let url = client()
            .admin_url(&["users", "a/b", "role-mappings", "realm"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://keycloak.example.com/auth/admin/realms/platform/users/a%2Fb/role-mappings/realm"
        );
    }

    #[test]
    fn token_endpoint_is_realm_scoped() {
        let url = client()
            .endpoint(
                &["realms", "platform"],
                &["protocol", "openid-connect", "token"],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://keycloak.example.com/auth/realms/platform/protocol/openid-connect/token"
        );
    }

    #[test]
    fn merge_attributes_keeps_existing_keys() {
        let mut rep = json!({
            "id": "u1",
            "username": "jdoe",
            "attributes": { "lab": ["x"], "status": ["pending"] }
        });
        merge_attributes(
            &mut rep,
            HashMap::from([("status".to_string(), vec!["disabled".to_string()])]),
        )
        .unwrap();

        assert_eq!(rep["attributes"]["lab"], json!(["x"]));
        assert_eq!(rep["attributes"]["status"], json!(["disabled"]));
    }

    #[test]
    fn merge_attributes_creates_missing_map() {
        let mut rep = json!({ "id": "u1", "attributes": null });
        merge_attributes(
            &mut rep,
            HashMap::from([("status".to_string(), vec!["active".to_string()])]),
        )
        .unwrap();
        assert_eq!(rep["attributes"]["status"], json!(["active"]));
    }

    #[test]
    fn user_deserializes_without_optional_fields() {
        let user: IdentityUser =
            serde_json::from_value(json!({ "id": "u1", "username": "jdoe" })).unwrap();
        assert!(user.email.is_none());
        assert!(user.attribute("status").is_none());
    }

    #[test]
    fn pick_user_filters_inexact_matches() {
        let users = vec![
            IdentityUser {
                id: "1".into(),
                username: "jdoe2".into(),
                email: Some("jdoe2@example.com".into()),
                attributes: HashMap::new(),
            },
            IdentityUser {
                id: "2".into(),
                username: "jdoe".into(),
                email: Some("JDoe@example.com".into()),
                attributes: HashMap::new(),
            },
        ];
        let found = pick_user(users, |u| u.username == "jdoe").unwrap();
        assert_eq!(found.id, "2");
    }
}
