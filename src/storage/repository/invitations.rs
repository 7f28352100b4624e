// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Invitation repository.
//!
//! Invitations are created when an admin invites an email address to the
//! platform (optionally into a project) and move from `pending` to
//! `complete` once the invitee registers. Rows are never deleted.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::super::{Database, StorageError, StorageResult};
use super::{cmp_opt, sort_and_page, Pagination, SortOrder};

/// Role granted on the platform itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformRole {
    Admin,
    Member,
}

impl PlatformRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformRole::Admin => "admin",
            PlatformRole::Member => "member",
        }
    }
}

impl fmt::Display for PlatformRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Complete,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Complete => "complete",
        }
    }
}

/// Invitation row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredInvitation {
    /// Unique invitation identifier (UUID)
    pub id: String,
    /// Opaque code handed to the invitee
    pub invitation_code: String,
    pub email: String,
    pub platform_role: PlatformRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_role: Option<String>,
    /// Code of the project the invitee joins, absent for platform-only invites
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_code: Option<String>,
    pub status: InvitationStatus,
    /// Username of the inviter
    pub invited_by: String,
    pub create_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_timestamp: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating an invitation.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub platform_role: PlatformRole,
    pub project_role: Option<String>,
    pub project_code: Option<String>,
    pub invited_by: String,
    pub expiry_timestamp: Option<DateTime<Utc>>,
}

/// Exact-match filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationFilter {
    pub id: Option<String>,
    pub email: Option<String>,
    pub project_code: Option<String>,
    pub status: Option<InvitationStatus>,
    pub platform_role: Option<PlatformRole>,
    pub invited_by: Option<String>,
}

impl InvitationFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_project_code(mut self, project_code: impl Into<String>) -> Self {
        self.project_code = Some(project_code.into());
        self
    }

    pub fn with_status(mut self, status: InvitationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, invitation: &StoredInvitation) -> bool {
        self.id.as_deref().map_or(true, |v| invitation.id == v)
            && self.email.as_deref().map_or(true, |v| invitation.email == v)
            && self
                .project_code
                .as_deref()
                .map_or(true, |v| invitation.project_code.as_deref() == Some(v))
            && self.status.map_or(true, |v| invitation.status == v)
            && self
                .platform_role
                .map_or(true, |v| invitation.platform_role == v)
            && self
                .invited_by
                .as_deref()
                .map_or(true, |v| invitation.invited_by == v)
    }
}

/// Listing filter: substring match on `email` / `invited_by`, exact match on
/// everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InvitationSearch {
    pub email: Option<String>,
    pub invited_by: Option<String>,
    pub project_code: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status: Option<InvitationStatus>,
    #[serde(deserialize_with = "blank_as_none")]
    pub platform_role: Option<PlatformRole>,
}

/// `""` and `null` count as an absent filter.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(value) => T::deserialize(value).map(Some).map_err(D::Error::custom),
    }
}

impl InvitationSearch {
    fn matches(&self, invitation: &StoredInvitation) -> bool {
        let contains = |needle: &Option<String>, haystack: &str| {
            needle
                .as_deref()
                .filter(|n| !n.is_empty())
                .map_or(true, |n| haystack.contains(n))
        };

        contains(&self.email, &invitation.email)
            && contains(&self.invited_by, &invitation.invited_by)
            && self
                .project_code
                .as_deref()
                .filter(|c| !c.is_empty())
                .map_or(true, |v| invitation.project_code.as_deref() == Some(v))
            && self.status.map_or(true, |v| invitation.status == v)
            && self
                .platform_role
                .map_or(true, |v| invitation.platform_role == v)
    }
}

/// Sortable invitation columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationColumn {
    Id,
    InvitationCode,
    ExpiryTimestamp,
    #[default]
    CreateTimestamp,
    InvitedBy,
    Email,
    PlatformRole,
    ProjectRole,
    ProjectCode,
    Status,
}

impl InvitationColumn {
    fn compare(self, a: &StoredInvitation, b: &StoredInvitation) -> Ordering {
        match self {
            InvitationColumn::Id => a.id.cmp(&b.id),
            InvitationColumn::InvitationCode => a.invitation_code.cmp(&b.invitation_code),
            InvitationColumn::ExpiryTimestamp => a.expiry_timestamp.cmp(&b.expiry_timestamp),
            InvitationColumn::CreateTimestamp => a.create_timestamp.cmp(&b.create_timestamp),
            InvitationColumn::InvitedBy => a.invited_by.cmp(&b.invited_by),
            InvitationColumn::Email => a.email.cmp(&b.email),
            InvitationColumn::PlatformRole => a.platform_role.as_str().cmp(b.platform_role.as_str()),
            InvitationColumn::ProjectRole => {
                cmp_opt(a.project_role.as_deref(), b.project_role.as_deref())
            }
            InvitationColumn::ProjectCode => {
                cmp_opt(a.project_code.as_deref(), b.project_code.as_deref())
            }
            InvitationColumn::Status => a.status.as_str().cmp(b.status.as_str()),
        }
    }
}

/// Mutable invitation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationPatch {
    pub status: Option<InvitationStatus>,
}

/// Repository for invitation operations.
pub struct InvitationRepository<'a> {
    db: &'a Database,
}

impl<'a> InvitationRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new `pending` invitation with a generated id, code and
    /// creation timestamp.
    pub fn create(&self, new: &NewInvitation) -> StorageResult<StoredInvitation> {
        let invitation = StoredInvitation {
            id: uuid::Uuid::new_v4().to_string(),
            invitation_code: uuid::Uuid::new_v4().simple().to_string(),
            email: new.email.clone(),
            platform_role: new.platform_role,
            project_role: new.project_role.clone(),
            project_code: new.project_code.clone(),
            status: InvitationStatus::Pending,
            invited_by: new.invited_by.clone(),
            create_timestamp: Utc::now(),
            expiry_timestamp: new.expiry_timestamp,
        };

        self.db
            .insert_new(self.db.invitations(), &invitation.id, &invitation)?;
        Ok(invitation)
    }

    /// Get an invitation by ID.
    pub fn get(&self, id: &str) -> StorageResult<StoredInvitation> {
        self.db
            .get(self.db.invitations(), id)?
            .ok_or_else(|| StorageError::NotFound(format!("Invitation {id}")))
    }

    /// All invitations matching an exact filter, in storage order.
    pub fn query(&self, filter: &InvitationFilter) -> StorageResult<Vec<StoredInvitation>> {
        let rows: Vec<StoredInvitation> = self.db.scan(self.db.invitations())?;
        Ok(rows.into_iter().filter(|i| filter.matches(i)).collect())
    }

    /// Filtered, ordered, paginated listing. Returns `(page, total)`.
    pub fn list(
        &self,
        search: &InvitationSearch,
        pagination: Pagination,
        order_by: InvitationColumn,
        order: SortOrder,
    ) -> StorageResult<(Vec<StoredInvitation>, usize)> {
        let rows: Vec<StoredInvitation> = self.db.scan(self.db.invitations())?;
        let rows: Vec<StoredInvitation> =
            rows.into_iter().filter(|i| search.matches(i)).collect();

        Ok(sort_and_page(rows, order, pagination, |a, b| {
            order_by.compare(a, b).then_with(|| a.id.cmp(&b.id))
        }))
    }

    /// Apply `patch` to the invitation matching `filter`.
    pub fn update(
        &self,
        filter: &InvitationFilter,
        patch: &InvitationPatch,
    ) -> StorageResult<StoredInvitation> {
        self.db
            .update_first(
                self.db.invitations(),
                |i: &StoredInvitation| filter.matches(i),
                |i| {
                    if let Some(status) = patch.status {
                        i.status = status;
                    }
                },
            )?
            .ok_or_else(|| StorageError::NotFound(format!("Invitation matching {filter:?}")))
    }
}
