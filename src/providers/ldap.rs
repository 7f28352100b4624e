// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Directory (LDAP / Active Directory) group membership client.
//!
//! A [`DirectoryConnector`] opens one bound [`DirectorySession`] per logical
//! operation. Callers must call [`DirectorySession::disconnect`] once they are
//! done, on the error path too.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use tracing::{debug, warn};

use crate::config::DirectoryConfig;

/// `entryAlreadyExists`: the member value is already present.
const RC_ALREADY_EXISTS: u32 = 68;
/// `noSuchAttribute`: the member value is not present.
const RC_NO_SUCH_ATTRIBUTE: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory connection failed: {0}")]
    Connection(String),

    #[error("Directory bind failed: {0}")]
    Bind(String),

    #[error("Directory search failed: {0}")]
    Search(String),

    #[error("Directory modify failed: {0}")]
    Modify(String),
}

/// A directory account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub dn: String,
    /// DNs of the groups the account belongs to.
    pub member_of: Vec<String>,
}

/// Outcome of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    Applied,
    /// Nothing to do: already a member on add, not a member on remove.
    Unchanged,
}

#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError>;
}

#[async_trait]
pub trait DirectorySession: Send {
    async fn get_user_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError>;

    fn format_group_dn(&self, group_name: &str) -> String;

    async fn add_user_to_group(
        &mut self,
        user_dn: &str,
        group_dn: &str,
    ) -> Result<GroupChange, DirectoryError>;

    async fn remove_user_from_group(
        &mut self,
        user_dn: &str,
        group_dn: &str,
    ) -> Result<GroupChange, DirectoryError>;

    async fn is_account_in_ad(&mut self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self.get_user_by_email(email).await?.is_some())
    }

    async fn disconnect(&mut self) -> Result<(), DirectoryError>;
}

/// Production connector backed by `ldap3`.
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    config: DirectoryConfig,
    timeout: Duration,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

#[async_trait]
impl DirectoryConnector for LdapDirectory {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        ldap.simple_bind(&self.config.bind_dn, &self.config.bind_secret)
            .await
            .map_err(|e| DirectoryError::Bind(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Bind(e.to_string()))?;

        debug!(url = %self.config.url, "Directory session opened");
        Ok(Box::new(LdapSession {
            ldap,
            config: self.config.clone(),
        }))
    }
}

struct LdapSession {
    ldap: Ldap,
    config: DirectoryConfig,
}

impl LdapSession {
    async fn modify_member(
        &mut self,
        group_dn: &str,
        change: Mod<&str>,
        tolerated_rc: u32,
    ) -> Result<GroupChange, DirectoryError> {
        let result = self
            .ldap
            .modify(group_dn, vec![change])
            .await
            .map_err(|e| DirectoryError::Modify(e.to_string()))?;

        match result.rc {
            0 => Ok(GroupChange::Applied),
            rc if rc == tolerated_rc => Ok(GroupChange::Unchanged),
            rc => Err(DirectoryError::Modify(format!(
                "{group_dn}: rc={rc} {}",
                result.text
            ))),
        }
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn get_user_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        let filter = user_filter(email);
        let base = self.config.search_base();

        let (entries, _result) = self
            .ldap
            .search(&base, Scope::Subtree, &filter, vec!["mail", "memberOf"])
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        Ok(entries.into_iter().next().map(|entry| {
            let mut entry = SearchEntry::construct(entry);
            DirectoryUser {
                dn: entry.dn,
                member_of: entry.attrs.remove("memberOf").unwrap_or_default(),
            }
        }))
    }

    fn format_group_dn(&self, group_name: &str) -> String {
        self.config.format_group_dn(group_name)
    }

    async fn add_user_to_group(
        &mut self,
        user_dn: &str,
        group_dn: &str,
    ) -> Result<GroupChange, DirectoryError> {
        let change = Mod::Add("member", HashSet::from([user_dn]));
        let outcome = self
            .modify_member(group_dn, change, RC_ALREADY_EXISTS)
            .await?;
        if outcome == GroupChange::Unchanged {
            warn!(user_dn = %user_dn, group_dn = %group_dn, "User already member of group");
        }
        Ok(outcome)
    }

    async fn remove_user_from_group(
        &mut self,
        user_dn: &str,
        group_dn: &str,
    ) -> Result<GroupChange, DirectoryError> {
        let change = Mod::Delete("member", HashSet::from([user_dn]));
        let outcome = self
            .modify_member(group_dn, change, RC_NO_SUCH_ATTRIBUTE)
            .await?;
        if outcome == GroupChange::Unchanged {
            warn!(user_dn = %user_dn, group_dn = %group_dn, "User not a member of group");
        }
        Ok(outcome)
    }

    async fn disconnect(&mut self) -> Result<(), DirectoryError> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))
    }
}

fn user_filter(email: &str) -> String {
    format!(
        "(&(objectClass=user)(mail={}))",
        ldap3::ldap_escape(email)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_filter_escapes_email() {
        assert_eq!(
            user_filter("a*b@example.com"),
            "(&(objectClass=user)(mail=a\\2ab@example.com))"
        );
        assert_eq!(
            user_filter("jdoe@example.com"),
            "(&(objectClass=user)(mail=jdoe@example.com))"
        );
    }
}
