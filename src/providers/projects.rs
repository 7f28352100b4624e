// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Project metadata lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectLookupError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project service request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait ProjectLookup: Send + Sync {
    /// Resolve a project by id or code.
    async fn get(&self, id_or_code: &str) -> Result<Project, ProjectLookupError>;
}

#[derive(Debug, Clone)]
pub struct ProjectClient {
    base_url: Url,
    http: Client,
}

impl ProjectClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ProjectLookupError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProjectLookupError::Request(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { base_url, http })
    }

    fn project_url(&self, id_or_code: &str) -> Result<Url, ProjectLookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProjectLookupError::Request("service URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1", "projects", id_or_code]);
        Ok(url)
    }
}

#[async_trait]
impl ProjectLookup for ProjectClient {
    async fn get(&self, id_or_code: &str) -> Result<Project, ProjectLookupError> {
        let response = self
            .http
            .get(self.project_url(id_or_code)?)
            .send()
            .await
            .map_err(|e| ProjectLookupError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ProjectLookupError::NotFound(id_or_code.to_string())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(ProjectLookupError::Request(format!(
                    "project service returned {status}: {body}"
                )))
            }
            _ => response
                .json()
                .await
                .map_err(|e| ProjectLookupError::Request(format!("invalid response: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_url_escapes_code() {
        let client = ProjectClient::new(
            Url::parse("http://project.local/").unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.project_url("my code").unwrap().as_str(),
            "http://project.local/v1/projects/my%20code"
        );
    }
}
