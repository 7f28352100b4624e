// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User-account audit events.
//!
//! Every invitation, role change and account enable/disable leaves one row.
//! `detail` is a free-form JSON object whose keys depend on the event type;
//! invitation events carry `invitation_id`, project-scoped events carry
//! `project_code`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::super::{Database, StorageError, StorageResult};
use super::{cmp_opt, sort_and_page, Pagination, SortOrder};

/// Detail key linking an event to its invitation.
pub const DETAIL_INVITATION_ID: &str = "invitation_id";
/// Detail key holding the project an event belongs to.
pub const DETAIL_PROJECT_CODE: &str = "project_code";

/// Types of user-account events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    InviteToPlatform,
    InviteToProject,
    RemoveFromProject,
    RoleChange,
    AccountDisable,
    AccountActivated,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InviteToPlatform => "INVITE_TO_PLATFORM",
            EventType::InviteToProject => "INVITE_TO_PROJECT",
            EventType::RemoveFromProject => "REMOVE_FROM_PROJECT",
            EventType::RoleChange => "ROLE_CHANGE",
            EventType::AccountDisable => "ACCOUNT_DISABLE",
            EventType::AccountActivated => "ACCOUNT_ACTIVATED",
        }
    }

    /// Account lifecycle events are not tied to any project.
    pub fn is_account_lifecycle(&self) -> bool {
        matches!(self, EventType::AccountDisable | EventType::AccountActivated)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit event row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredEvent {
    pub id: String,
    pub event_type: EventType,
    /// Identity of the user who performed the action. Serialized as `null`
    /// when unknown.
    pub operator_id: Option<String>,
    pub operator: Option<String>,
    /// Filled in after the fact for invitation events.
    pub target_user_id: Option<String>,
    pub target_user: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detail: Map<String, Value>,
}

impl StoredEvent {
    fn detail_str(&self, key: &str) -> Option<&str> {
        self.detail.get(key).and_then(Value::as_str)
    }
}

/// Fields supplied when recording an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: EventType,
    pub operator_id: Option<String>,
    pub operator: Option<String>,
    pub target_user_id: Option<String>,
    pub target_user: Option<String>,
    pub detail: Map<String, Value>,
}

impl NewEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            operator_id: None,
            operator: None,
            target_user_id: None,
            target_user: None,
            detail: Map::new(),
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_operator_id(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    pub fn with_target(mut self, user_id: impl Into<String>, username: impl Into<String>) -> Self {
        self.target_user_id = Some(user_id.into());
        self.target_user = Some(username.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.detail.insert(key.to_string(), value.into());
        self
    }
}

/// Event query filter.
///
/// `project_code` matches `detail.project_code` and additionally every
/// account lifecycle event, since those carry no project. `invitation_id`
/// matches `detail.invitation_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub target_user_id: Option<String>,
    pub operator: Option<String>,
    pub event_type: Option<EventType>,
    pub project_code: Option<String>,
    pub invitation_id: Option<String>,
}

impl EventFilter {
    pub fn by_invitation(invitation_id: impl Into<String>) -> Self {
        Self {
            invitation_id: Some(invitation_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, event: &StoredEvent) -> bool {
        let project_ok = self.project_code.as_deref().map_or(true, |code| {
            event.detail_str(DETAIL_PROJECT_CODE) == Some(code)
                || event.event_type.is_account_lifecycle()
        });

        project_ok
            && self.invitation_id.as_deref().map_or(true, |id| {
                event.detail_str(DETAIL_INVITATION_ID) == Some(id)
            })
            && self
                .target_user_id
                .as_deref()
                .map_or(true, |v| event.target_user_id.as_deref() == Some(v))
            && self
                .operator
                .as_deref()
                .map_or(true, |v| event.operator.as_deref() == Some(v))
            && self.event_type.map_or(true, |v| event.event_type == v)
    }
}

/// Sortable event columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventColumn {
    Id,
    TargetUser,
    Operator,
    EventType,
    #[default]
    Timestamp,
}

impl EventColumn {
    fn compare(self, a: &StoredEvent, b: &StoredEvent) -> Ordering {
        match self {
            EventColumn::Id => a.id.cmp(&b.id),
            EventColumn::TargetUser => cmp_opt(a.target_user.as_deref(), b.target_user.as_deref()),
            EventColumn::Operator => cmp_opt(a.operator.as_deref(), b.operator.as_deref()),
            EventColumn::EventType => a.event_type.as_str().cmp(b.event_type.as_str()),
            EventColumn::Timestamp => a.timestamp.cmp(&b.timestamp),
        }
    }
}

/// Back-fill of the invitee once registration completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub target_user_id: Option<String>,
    pub target_user: Option<String>,
}

/// Repository for audit events.
pub struct EventRepository<'a> {
    db: &'a Database,
}

impl<'a> EventRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record an event with a generated id and the current timestamp.
    pub fn create(&self, new: &NewEvent) -> StorageResult<StoredEvent> {
        let event = StoredEvent {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: new.event_type,
            operator_id: new.operator_id.clone(),
            operator: new.operator.clone(),
            target_user_id: new.target_user_id.clone(),
            target_user: new.target_user.clone(),
            timestamp: Utc::now(),
            detail: new.detail.clone(),
        };

        self.db.insert_new(self.db.events(), &event.id, &event)?;
        Ok(event)
    }

    pub fn get(&self, id: &str) -> StorageResult<StoredEvent> {
        self.db
            .get(self.db.events(), id)?
            .ok_or_else(|| StorageError::NotFound(format!("Event {id}")))
    }

    /// Filtered, ordered, paginated query. Returns `(page, total)`.
    pub fn query(
        &self,
        filter: &EventFilter,
        pagination: Pagination,
        order_by: EventColumn,
        order: SortOrder,
    ) -> StorageResult<(Vec<StoredEvent>, usize)> {
        let rows: Vec<StoredEvent> = self.db.scan(self.db.events())?;
        let rows: Vec<StoredEvent> = rows.into_iter().filter(|e| filter.matches(e)).collect();

        Ok(sort_and_page(rows, order, pagination, |a, b| {
            order_by.compare(a, b).then_with(|| a.id.cmp(&b.id))
        }))
    }

    /// Apply `patch` to the first event matching `filter`.
    pub fn update(&self, filter: &EventFilter, patch: &EventPatch) -> StorageResult<StoredEvent> {
        self.db
            .update_first(
                self.db.events(),
                |e: &StoredEvent| filter.matches(e),
                |e| {
                    if let Some(id) = &patch.target_user_id {
                        e.target_user_id = Some(id.clone());
                    }
                    if let Some(name) = &patch.target_user {
                        e.target_user = Some(name.clone());
                    }
                },
            )?
            .ok_or_else(|| StorageError::NotFound(format!("Event matching {filter:?}")))
    }
}
