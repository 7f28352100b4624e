// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::{Config, DirectoryConfig, NotificationConfig};
use crate::providers::{DirectoryConnector, IdentityAdmin, Notifier, ProjectLookup};
use crate::storage::Database;

/// Settings the workflows read at request time.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Realm role every account keeps when disabled.
    pub base_role: String,
    pub directory: DirectoryConfig,
    pub notification: NotificationConfig,
    pub invitation_ttl: chrono::Duration,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_role: config.keycloak.base_role.clone(),
            directory: config.directory.clone(),
            notification: config.notification.clone(),
            invitation_ttl: config.invitation_ttl,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub identity: Arc<dyn IdentityAdmin>,
    pub directory: Arc<dyn DirectoryConnector>,
    pub notifier: Arc<dyn Notifier>,
    pub projects: Arc<dyn ProjectLookup>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        identity: Arc<dyn IdentityAdmin>,
        directory: Arc<dyn DirectoryConnector>,
        notifier: Arc<dyn Notifier>,
        projects: Arc<dyn ProjectLookup>,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            identity,
            directory,
            notifier,
            projects,
            settings: Arc::new(settings),
        }
    }
}
