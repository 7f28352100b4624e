// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed [`Config`] loaded once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5061` |
//! | `DATA_DIR` | Directory holding the embedded database | `/data` |
//! | `DB_SCHEMA_PREFIX` | Namespace prefix for the invitation/event tables | `auth` |
//! | `KEYCLOAK_SERVER_URL` | Keycloak base URL | Required |
//! | `KEYCLOAK_REALM` | Realm holding platform users | Required |
//! | `KEYCLOAK_CLIENT_ID` | Admin client id (client credentials) | Required |
//! | `KEYCLOAK_SECRET` | Admin client secret | Required |
//! | `KEYCLOAK_BASE_ROLE` | Realm role kept when an account is disabled | `uma_authorization` |
//! | `ENABLE_ACTIVE_DIRECTORY` | Toggle directory integration | `true` |
//! | `LDAP_URL` | Directory server URL | Required when AD enabled |
//! | `LDAP_ADMIN_DN` / `LDAP_ADMIN_SECRET` | Bind credentials | Required when AD enabled |
//! | `LDAP_OU`, `LDAP_DC1`, `LDAP_DC2` | Group DN components | Required when AD enabled |
//! | `LDAP_COMMON_NAME_PREFIX` | Prefix of every managed group CN | Required when AD enabled |
//! | `AD_USER_GROUP` / `AD_ADMIN_GROUP` | Base user group / admin group names | `users` / `platform-admins` |
//! | `NOTIFY_SERVICE` | Notification service base URL | Required |
//! | `PROJECT_SERVICE` | Project metadata service base URL | Required |
//! | `EMAIL_SUPPORT` / `EMAIL_ADMIN` / `EMAIL_HELPDESK` | Mail addresses used in invitations | Required |
//! | `DOMAIN_NAME` | Public domain of the platform | Required |
//! | `PROJECT_NAME` | Human platform name used in subjects | Required |
//! | `INVITATION_URL_LOGIN` | Login URL sent to invitees | Required |
//! | `INVITE_ATTACHMENT` / `INVITE_ATTACHMENT_NAME` | Optional file attached to new-account invitations | unset |
//! | `INVITATION_TTL_DAYS` | Days before an invitation expires | `14` |
//! | `HTTP_TIMEOUT_SECS` | Timeout applied to every upstream HTTP call | `15` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::{path::PathBuf, time::Duration};

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the embedded database directory.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5061;
const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_SCHEMA_PREFIX: &str = "auth";
const DEFAULT_BASE_ROLE: &str = "uma_authorization";
const DEFAULT_USER_GROUP: &str = "users";
const DEFAULT_ADMIN_GROUP: &str = "platform-admins";
const DEFAULT_INVITATION_TTL_DAYS: i64 = 14;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Database file name inside `DATA_DIR`.
const DATABASE_FILE: &str = "auth.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub schema_prefix: String,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    pub server_url: Url,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    /// Realm role every account keeps, even when disabled.
    pub base_role: String,
}

/// Directory service settings.
///
/// Group DNs are formatted as `cn=<prefix>-<name>,ou=<ou>,dc=<dc1>,dc=<dc2>`.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub enabled: bool,
    pub url: String,
    pub bind_dn: String,
    pub bind_secret: String,
    pub ou: String,
    pub dc1: String,
    pub dc2: String,
    pub common_name_prefix: String,
    pub user_group: String,
    pub admin_group: String,
}

impl DirectoryConfig {
    pub fn format_group_dn(&self, group_name: &str) -> String {
        format!(
            "cn={}-{},ou={},dc={},dc={}",
            self.common_name_prefix, group_name, self.ou, self.dc1, self.dc2
        )
    }

    pub fn search_base(&self) -> String {
        format!("dc={},dc={}", self.dc1, self.dc2)
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub service_url: Url,
    pub support_email: String,
    pub admin_email: String,
    pub helpdesk_email: String,
    pub domain_name: String,
    pub project_name: String,
    pub login_url: String,
    pub attachment_path: Option<PathBuf>,
    pub attachment_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub keycloak: KeycloakConfig,
    pub directory: DirectoryConfig,
    pub notification: NotificationConfig,
    pub project_service_url: Url,
    pub invitation_ttl: chrono::Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };

        let server = ServerConfig {
            host: env.or_default(HOST_ENV, DEFAULT_HOST),
            port: env.parsed_or(PORT_ENV, DEFAULT_PORT)?,
        };

        let storage = StorageConfig {
            data_dir: PathBuf::from(env.or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            schema_prefix: env.or_default("DB_SCHEMA_PREFIX", DEFAULT_SCHEMA_PREFIX),
        };

        let keycloak = KeycloakConfig {
            server_url: env.url("KEYCLOAK_SERVER_URL")?,
            realm: env.required("KEYCLOAK_REALM")?,
            client_id: env.required("KEYCLOAK_CLIENT_ID")?,
            client_secret: env.required("KEYCLOAK_SECRET")?,
            base_role: env.or_default("KEYCLOAK_BASE_ROLE", DEFAULT_BASE_ROLE),
        };

        let enabled = env.parsed_or("ENABLE_ACTIVE_DIRECTORY", true)?;
        // Directory credentials are only mandatory when the integration is on.
        let directory_value = |name: &str| -> Result<String, ConfigError> {
            if enabled {
                env.required(name)
            } else {
                Ok(env.optional(name).unwrap_or_default())
            }
        };
        let directory = DirectoryConfig {
            enabled,
            url: directory_value("LDAP_URL")?,
            bind_dn: directory_value("LDAP_ADMIN_DN")?,
            bind_secret: directory_value("LDAP_ADMIN_SECRET")?,
            ou: directory_value("LDAP_OU")?,
            dc1: directory_value("LDAP_DC1")?,
            dc2: directory_value("LDAP_DC2")?,
            common_name_prefix: directory_value("LDAP_COMMON_NAME_PREFIX")?,
            user_group: env.or_default("AD_USER_GROUP", DEFAULT_USER_GROUP),
            admin_group: env.or_default("AD_ADMIN_GROUP", DEFAULT_ADMIN_GROUP),
        };

        let notification = NotificationConfig {
            service_url: env.url("NOTIFY_SERVICE")?,
            support_email: env.required("EMAIL_SUPPORT")?,
            admin_email: env.required("EMAIL_ADMIN")?,
            helpdesk_email: env.required("EMAIL_HELPDESK")?,
            domain_name: env.required("DOMAIN_NAME")?,
            project_name: env.required("PROJECT_NAME")?,
            login_url: env.required("INVITATION_URL_LOGIN")?,
            attachment_path: env.optional("INVITE_ATTACHMENT").map(PathBuf::from),
            attachment_name: env.optional("INVITE_ATTACHMENT_NAME"),
        };

        let ttl_days: i64 = env.parsed_or("INVITATION_TTL_DAYS", DEFAULT_INVITATION_TTL_DAYS)?;
        let timeout_secs: u64 = env.parsed_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            server,
            storage,
            keycloak,
            directory,
            notification,
            project_service_url: env.url("PROJECT_SERVICE")?,
            invitation_ttl: chrono::Duration::days(ttl_days),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn url(&self, name: &str) -> Result<Url, ConfigError> {
        let raw = self.required(name)?;
        Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}
