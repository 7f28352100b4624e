// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account enable/disable and direct directory group changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::events::EventService;
use super::{close_directory, ServiceError, ServiceResult};
use crate::config::DirectoryConfig;
use crate::providers::{DirectoryError, DirectorySession, GroupChange, IdentityUser};
use crate::state::AppState;
use crate::storage::repository::NewEvent;
use crate::storage::{EventType, StoredEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountAction {
    Enable,
    Disable,
}

impl AccountAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountAction::Enable => "enable",
            AccountAction::Disable => "disable",
        }
    }

    /// Value written to the identity provider's `status` attribute.
    pub fn account_status(&self) -> &'static str {
        match self {
            AccountAction::Enable => "active",
            AccountAction::Disable => "disabled",
        }
    }

    fn event_type(&self) -> EventType {
        match self {
            AccountAction::Enable => EventType::AccountActivated,
            AccountAction::Disable => EventType::AccountDisable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperation {
    Add,
    Remove,
}

impl GroupOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperation::Add => "add",
            GroupOperation::Remove => "remove",
        }
    }
}

pub struct AccountService<'a> {
    state: &'a AppState,
}

impl<'a> AccountService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Enable or disable an account.
    ///
    /// Disabling also strips every realm role but the base role and, when
    /// the directory is enabled, every managed group but the base user
    /// group. Identity provider changes stay in place if a later step fails.
    pub async fn set_account_status(
        &self,
        email: &str,
        action: AccountAction,
        operator: &str,
    ) -> ServiceResult<StoredEvent> {
        info!(email = %email, action = %action.as_str(), "Updating account status");
        let identity = &self.state.identity;

        let user = identity
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {email} not found")))?;

        identity
            .update_user_attributes(
                &user.id,
                HashMap::from([(
                    "status".to_string(),
                    vec![action.account_status().to_string()],
                )]),
            )
            .await?;

        if action == AccountAction::Disable {
            self.strip_realm_roles(&user).await?;
            if self.state.settings.directory.enabled {
                self.strip_directory_groups(email).await?;
            }
        }

        EventService::new(self.state)
            .record(
                NewEvent::new(action.event_type())
                    .with_operator(operator)
                    .with_target(&user.id, &user.username),
            )
            .await
    }

    async fn strip_realm_roles(&self, user: &IdentityUser) -> ServiceResult<()> {
        let base_role = &self.state.settings.base_role;
        let roles: Vec<_> = self
            .state
            .identity
            .get_user_realm_roles(&user.id)
            .await?
            .into_iter()
            .filter(|r| &r.name != base_role)
            .collect();

        info!(user_id = %user.id, count = roles.len(), "Removing realm roles");
        self.state
            .identity
            .remove_user_realm_roles(&user.id, &roles)
            .await?;
        Ok(())
    }

    async fn strip_directory_groups(&self, email: &str) -> ServiceResult<()> {
        let mut session = self.state.directory.connect().await?;
        let result =
            remove_managed_groups(session.as_mut(), &self.state.settings.directory, email).await;
        close_directory(session.as_mut()).await;
        Ok(result?)
    }

    /// Add or remove a directory account to/from `<prefix>-<group_code>`.
    pub async fn update_directory_group(
        &self,
        operation: GroupOperation,
        email: &str,
        group_code: &str,
    ) -> ServiceResult<GroupChange> {
        info!(
            email = %email,
            operation = %operation.as_str(),
            group_code = %group_code,
            "Updating directory group"
        );
        let mut session = self.state.directory.connect().await?;
        let result = change_group(session.as_mut(), operation, email, group_code).await;
        close_directory(session.as_mut()).await;
        result
    }
}

async fn change_group(
    session: &mut dyn DirectorySession,
    operation: GroupOperation,
    email: &str,
    group_code: &str,
) -> ServiceResult<GroupChange> {
    let user = session
        .get_user_by_email(email)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User {email} not found in directory")))?;
    let group_dn = session.format_group_dn(group_code);

    let change = match operation {
        GroupOperation::Add => session.add_user_to_group(&user.dn, &group_dn).await?,
        GroupOperation::Remove => session.remove_user_from_group(&user.dn, &group_dn).await?,
    };
    Ok(change)
}

async fn remove_managed_groups(
    session: &mut dyn DirectorySession,
    config: &DirectoryConfig,
    email: &str,
) -> Result<(), DirectoryError> {
    let Some(user) = session.get_user_by_email(email).await? else {
        warn!(email = %email, "Account not found in directory, no groups removed");
        return Ok(());
    };

    for group_dn in user
        .member_of
        .iter()
        .filter(|dn| is_removable_group(config, dn))
    {
        session.remove_user_from_group(&user.dn, group_dn).await?;
        info!(user_dn = %user.dn, group_dn = %group_dn, "Removed directory group");
    }
    Ok(())
}

/// Groups named `<prefix>-...`, except the base user group. A bare
/// `<prefix>` match without the separator is not enough.
fn is_removable_group(config: &DirectoryConfig, group_dn: &str) -> bool {
    let Some(cn) = common_name(group_dn) else {
        return false;
    };
    let cn = cn.to_ascii_lowercase();
    let prefix = format!("{}-", config.common_name_prefix).to_ascii_lowercase();
    let user_group = format!("{prefix}{}", config.user_group.to_ascii_lowercase());
    cn.starts_with(&prefix) && cn != user_group
}

/// Value of the leading `CN=` RDN.
fn common_name(dn: &str) -> Option<&str> {
    let first = dn.split(',').next()?.trim();
    let (attr, value) = first.split_once('=')?;
    attr.trim().eq_ignore_ascii_case("cn").then_some(value.trim())
}
