// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response types for the REST API. Closed enums (roles,
//! statuses, event types, operations) are deserialized directly into their
//! domain types, so an unknown value is rejected before any handler runs.
//!
//! Every response is wrapped in [`ApiResponse`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::{AccountAction, GroupOperation};
use crate::storage::repository::{
    EventColumn, EventFilter, InvitationColumn, InvitationSearch, NewEvent,
};
use crate::storage::{EventType, InvitationStatus, Pagination, PlatformRole, SortOrder};

const DEFAULT_PAGE_SIZE: usize = 25;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

// =============================================================================
// Response envelope
// =============================================================================

/// Uniform response body: `{code, error_msg, page, total, num_of_pages, result}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub error_msg: String,
    pub page: usize,
    pub total: usize,
    pub num_of_pages: usize,
    pub result: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self::with_code(StatusCode::OK, result)
    }

    pub fn with_code(status: StatusCode, result: T) -> Self {
        Self {
            code: status.as_u16(),
            error_msg: String::new(),
            page: 0,
            total: 1,
            num_of_pages: 1,
            result,
        }
    }

    /// One page of a listing.
    pub fn paged(result: T, pagination: Pagination, total: usize) -> Self {
        Self {
            page: pagination.page,
            total,
            num_of_pages: total.div_ceil(pagination.page_size.max(1)),
            ..Self::ok(result)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

// =============================================================================
// Invitations
// =============================================================================

/// Project an invitee joins. The project is referenced by id or code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InvitationRelationship {
    #[serde(alias = "project_geid", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_role: Option<String>,
}

impl InvitationRelationship {
    /// Project reference, preferring the id over the code.
    pub fn project_ref(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| self.project_code.as_deref().filter(|v| !v.is_empty()))
    }

    pub fn is_empty(&self) -> bool {
        self.project_ref().is_none()
            && self.project_role.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub platform_role: PlatformRole,
    #[serde(default)]
    pub relationship: Option<InvitationRelationship>,
    pub invited_by: String,
}

impl CreateInvitationRequest {
    /// The relationship, unless it was sent as an empty object.
    pub fn relationship(&self) -> Option<&InvitationRelationship> {
        self.relationship.as_ref().filter(|r| !r.is_empty())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.email.contains('@') {
            return Err(format!("Invalid email: {}", self.email));
        }
        if self.invited_by.trim().is_empty() {
            return Err("invited_by is required".to_string());
        }
        if let Some(relationship) = self.relationship() {
            if relationship.project_ref().is_none() {
                return Err("relationship missing required value project_code".to_string());
            }
            if relationship.project_role.as_deref().map_or(true, str::is_empty) {
                return Err("relationship missing required value project_role".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckUserQuery {
    #[serde(default)]
    pub project_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationListRequest {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub order_by: InvitationColumn,
    #[serde(default)]
    pub order_type: SortOrder,
    #[serde(default)]
    pub filters: InvitationSearch,
}

impl InvitationListRequest {
    /// `None` when `page_size` is zero.
    pub fn pagination(&self) -> Option<Pagination> {
        (self.page_size > 0).then(|| Pagination::new(self.page, self.page_size))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInvitationRequest {
    pub status: InvitationStatus,
}

/// Account view returned by the user check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub name: String,
    pub email: String,
    /// Account status attribute, or `invited` for a pending invitee.
    pub status: String,
    pub role: PlatformRole,
    pub relationship: UserRelationship,
}

/// Serialized as `{}` when the user has no role in the requested project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRelationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_role: Option<String>,
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub operator: String,
    #[serde(default)]
    pub operator_id: Option<String>,
    #[serde(default)]
    pub target_user: Option<String>,
    #[serde(default)]
    pub target_user_id: Option<String>,
    pub event_type: EventType,
    #[serde(default)]
    pub detail: Map<String, Value>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(request: CreateEventRequest) -> Self {
        NewEvent {
            event_type: request.event_type,
            operator_id: request.operator_id,
            operator: Some(request.operator),
            target_user_id: request.target_user_id,
            target_user: request.target_user,
            detail: request.detail,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventListQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub order_by: EventColumn,
    #[serde(default)]
    pub order_type: SortOrder,
    #[serde(default)]
    pub project_code: Option<String>,
    /// Matches the event's target user id.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub invitation_id: Option<String>,
}

impl EventListQuery {
    pub fn pagination(&self) -> Option<Pagination> {
        (self.page_size > 0).then(|| Pagination::new(self.page, self.page_size))
    }

    pub fn filter(&self) -> EventFilter {
        let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        EventFilter {
            target_user_id: present(&self.user_id),
            project_code: present(&self.project_code),
            invitation_id: present(&self.invitation_id),
            ..EventFilter::default()
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AccountStatusRequest {
    pub operation_type: AccountAction,
    pub user_email: String,
    pub operator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryGroupRequest {
    pub operation_type: GroupOperation,
    pub user_email: String,
    pub group_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invitation_request_accepts_empty_relationship() {
        let request: CreateInvitationRequest = serde_json::from_value(json!({
            "email": "new@example.com",
            "platform_role": "admin",
            "relationship": {},
            "invited_by": "admin"
        }))
        .unwrap();
        assert!(request.relationship().is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn invitation_request_rejects_unknown_role() {
        let result: Result<CreateInvitationRequest, _> = serde_json::from_value(json!({
            "email": "new@example.com",
            "platform_role": "owner",
            "invited_by": "admin"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn relationship_requires_project_role() {
        let request: CreateInvitationRequest = serde_json::from_value(json!({
            "email": "new@example.com",
            "platform_role": "member",
            "relationship": { "project_geid": "p-1" },
            "invited_by": "admin"
        }))
        .unwrap();
        assert_eq!(request.relationship().unwrap().project_ref(), Some("p-1"));
        assert_eq!(
            request.validate().unwrap_err(),
            "relationship missing required value project_role"
        );
    }

    #[test]
    fn list_request_defaults() {
        let request: InvitationListRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.page, 0);
        assert_eq!(request.page_size, 25);
        assert_eq!(request.order_by, InvitationColumn::CreateTimestamp);
        assert_eq!(request.order_type, SortOrder::Asc);
        assert_eq!(request.filters, InvitationSearch::default());

        let zero: InvitationListRequest =
            serde_json::from_value(json!({ "page_size": 0 })).unwrap();
        assert!(zero.pagination().is_none());
    }

    #[test]
    fn event_request_rejects_unknown_type() {
        let result: Result<CreateEventRequest, _> = serde_json::from_value(json!({
            "operator": "admin",
            "event_type": "PASSWORD_RESET"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn event_query_maps_user_id_to_target() {
        let query: EventListQuery = serde_json::from_value(json!({
            "user_id": "u-1",
            "project_code": "",
            "order_by": "operator",
            "order_type": "desc"
        }))
        .unwrap();
        let filter = query.filter();
        assert_eq!(filter.target_user_id.as_deref(), Some("u-1"));
        assert!(filter.project_code.is_none());
        assert_eq!(query.order_by, EventColumn::Operator);
        assert_eq!(query.order_type, SortOrder::Desc);
    }

    #[test]
    fn paged_envelope_counts_pages() {
        let response = ApiResponse::paged(vec![1, 2], Pagination::new(1, 2), 5);
        assert_eq!(response.num_of_pages, 3);
        assert_eq!(response.page, 1);
        assert_eq!(response.total, 5);
        assert_eq!(response.code, 200);
    }

    #[test]
    fn empty_relationship_serializes_as_object() {
        let view = UserView {
            name: String::new(),
            email: "a@x.com".to_string(),
            status: "invited".to_string(),
            role: PlatformRole::Member,
            relationship: UserRelationship::default(),
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["relationship"], json!({}));
        assert_eq!(value["role"], "member");
    }
}
