// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators that record every call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::config::DirectoryConfig;

// =============================================================================
// Identity
// =============================================================================

#[derive(Default)]
pub struct FakeIdentity {
    pub users: Mutex<Vec<IdentityUser>>,
    pub roles: Mutex<HashMap<String, Vec<RealmRole>>>,
    pub attribute_updates: Mutex<Vec<(String, HashMap<String, Vec<String>>)>>,
    pub removed_roles: Mutex<Vec<(String, Vec<RealmRole>)>>,
    pub fail_lookups: Mutex<bool>,
}

impl FakeIdentity {
    pub fn with_user(self, id: &str, username: &str, email: &str) -> Self {
        self.users.lock().unwrap().push(IdentityUser {
            id: id.to_string(),
            username: username.to_string(),
            email: Some(email.to_string()),
            attributes: HashMap::new(),
        });
        self
    }

    pub fn with_roles(self, user_id: &str, names: &[&str]) -> Self {
        let roles = names
            .iter()
            .map(|name| RealmRole {
                id: Some(format!("role-{name}")),
                name: name.to_string(),
            })
            .collect();
        self.roles.lock().unwrap().insert(user_id.to_string(), roles);
        self
    }

    pub fn set_attribute(&self, user_id: &str, key: &str, value: &str) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.attributes
                .insert(key.to_string(), vec![value.to_string()]);
        }
    }

    fn check_available(&self) -> Result<(), KeycloakError> {
        if *self.fail_lookups.lock().unwrap() {
            return Err(KeycloakError::Request("keycloak unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityAdmin for FakeIdentity {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<IdentityUser>, KeycloakError> {
        self.check_available()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<IdentityUser>, KeycloakError> {
        self.check_available()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_realm_roles(&self, user_id: &str) -> Result<Vec<RealmRole>, KeycloakError> {
        self.check_available()?;
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_user_attributes(
        &self,
        user_id: &str,
        attributes: HashMap<String, Vec<String>>,
    ) -> Result<(), KeycloakError> {
        self.attribute_updates
            .lock()
            .unwrap()
            .push((user_id.to_string(), attributes));
        Ok(())
    }

    async fn remove_user_realm_roles(
        &self,
        user_id: &str,
        roles: &[RealmRole],
    ) -> Result<(), KeycloakError> {
        self.removed_roles
            .lock()
            .unwrap()
            .push((user_id.to_string(), roles.to_vec()));
        Ok(())
    }
}

// =============================================================================
// Directory
// =============================================================================

#[derive(Debug, Default)]
pub struct DirectoryLog {
    pub users: HashMap<String, DirectoryUser>,
    pub added: Vec<(String, String)>,
    pub removed: Vec<(String, String)>,
    pub connects: usize,
    pub disconnects: usize,
    /// Make every membership change fail.
    pub fail_modify: bool,
}

pub struct FakeDirectory {
    pub config: DirectoryConfig,
    pub log: Arc<Mutex<DirectoryLog>>,
}

impl FakeDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config,
            log: Arc::new(Mutex::new(DirectoryLog::default())),
        }
    }

    pub fn with_user(self, email: &str, dn: &str, member_of: &[&str]) -> Self {
        self.log.lock().unwrap().users.insert(
            email.to_string(),
            DirectoryUser {
                dn: dn.to_string(),
                member_of: member_of.iter().map(|g| g.to_string()).collect(),
            },
        );
        self
    }
}

#[async_trait]
impl DirectoryConnector for FakeDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        self.log.lock().unwrap().connects += 1;
        Ok(Box::new(FakeSession {
            config: self.config.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSession {
    config: DirectoryConfig,
    log: Arc<Mutex<DirectoryLog>>,
}

#[async_trait]
impl DirectorySession for FakeSession {
    async fn get_user_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        Ok(self.log.lock().unwrap().users.get(email).cloned())
    }

    fn format_group_dn(&self, group_name: &str) -> String {
        self.config.format_group_dn(group_name)
    }

    async fn add_user_to_group(
        &mut self,
        user_dn: &str,
        group_dn: &str,
    ) -> Result<GroupChange, DirectoryError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_modify {
            return Err(DirectoryError::Modify(format!("{group_dn}: rc=50")));
        }
        let already = log
            .users
            .values()
            .any(|u| u.dn == user_dn && u.member_of.iter().any(|g| g == group_dn));
        log.added.push((user_dn.to_string(), group_dn.to_string()));
        Ok(if already {
            GroupChange::Unchanged
        } else {
            GroupChange::Applied
        })
    }

    async fn remove_user_from_group(
        &mut self,
        user_dn: &str,
        group_dn: &str,
    ) -> Result<GroupChange, DirectoryError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_modify {
            return Err(DirectoryError::Modify(format!("{group_dn}: rc=50")));
        }
        log.removed.push((user_dn.to_string(), group_dn.to_string()));
        Ok(GroupChange::Applied)
    }

    async fn disconnect(&mut self) -> Result<(), DirectoryError> {
        self.log.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

// =============================================================================
// Notifier
// =============================================================================

#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifierError::Request("notify unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Default)]
pub struct FakeProjects {
    pub projects: Vec<Project>,
}

impl FakeProjects {
    pub fn with_project(mut self, id: &str, code: &str, name: &str) -> Self {
        self.projects.push(Project {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
        });
        self
    }
}

#[async_trait]
impl ProjectLookup for FakeProjects {
    async fn get(&self, id_or_code: &str) -> Result<Project, ProjectLookupError> {
        self.projects
            .iter()
            .find(|p| p.id == id_or_code || p.code == id_or_code)
            .cloned()
            .ok_or_else(|| ProjectLookupError::NotFound(id_or_code.to_string()))
    }
}

/// Directory settings used by tests: prefix `plat`, user group `users`.
pub fn directory_config(enabled: bool) -> DirectoryConfig {
    DirectoryConfig {
        enabled,
        url: "ldap://ldap.test".to_string(),
        bind_dn: "cn=admin,dc=example,dc=com".to_string(),
        bind_secret: "secret".to_string(),
        ou: "Groups".to_string(),
        dc1: "example".to_string(),
        dc2: "com".to_string(),
        common_name_prefix: "plat".to_string(),
        user_group: "users".to_string(),
        admin_group: "platform-admins".to_string(),
    }
}
