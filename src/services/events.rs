// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit event workflow.

use tracing::info;

use super::{ServiceError, ServiceResult};
use crate::state::AppState;
use crate::storage::repository::{EventColumn, EventFilter, EventPatch, NewEvent};
use crate::storage::{EventRepository, Pagination, SortOrder, StoredEvent};

pub struct EventService<'a> {
    state: &'a AppState,
}

impl<'a> EventService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Record an event.
    ///
    /// Blank strings count as absent. A missing `operator_id` or
    /// `target_user_id` is resolved from the matching username; if that
    /// lookup fails or finds nobody, nothing is recorded.
    pub async fn record(&self, event: NewEvent) -> ServiceResult<StoredEvent> {
        let mut event = NewEvent {
            operator_id: non_blank(event.operator_id),
            operator: non_blank(event.operator),
            target_user_id: non_blank(event.target_user_id),
            target_user: non_blank(event.target_user),
            ..event
        };

        if event.operator_id.is_none() {
            if let Some(operator) = &event.operator {
                event.operator_id = Some(self.resolve_user_id(operator).await?);
            }
        }
        if event.target_user_id.is_none() {
            if let Some(target) = &event.target_user {
                event.target_user_id = Some(self.resolve_user_id(target).await?);
            }
        }

        let stored = EventRepository::new(&self.state.db).create(&event)?;
        info!(
            event_id = %stored.id,
            event_type = %stored.event_type,
            "Recorded user event"
        );
        Ok(stored)
    }

    pub fn list(
        &self,
        filter: &EventFilter,
        pagination: Pagination,
        order_by: EventColumn,
        order: SortOrder,
    ) -> ServiceResult<(Vec<StoredEvent>, usize)> {
        Ok(EventRepository::new(&self.state.db).query(filter, pagination, order_by, order)?)
    }

    /// Fill in the invitee on the event created for `invitation_id`.
    pub fn backfill_target(
        &self,
        invitation_id: &str,
        user_id: &str,
        username: &str,
    ) -> ServiceResult<StoredEvent> {
        let patch = EventPatch {
            target_user_id: Some(user_id.to_string()),
            target_user: Some(username.to_string()),
        };
        Ok(EventRepository::new(&self.state.db)
            .update(&EventFilter::by_invitation(invitation_id), &patch)?)
    }

    async fn resolve_user_id(&self, username: &str) -> ServiceResult<String> {
        self.state
            .identity
            .get_user_by_username(username)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| ServiceError::NotFound(format!("User {username} not found")))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
