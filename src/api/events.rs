// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::extract::State;

use super::extract::{ValidJson, ValidQuery};
use crate::{
    error::ApiError,
    models::{ApiResponse, CreateEventRequest, EventListQuery},
    services::EventService,
    state::AppState,
    storage::StoredEvent,
};

pub async fn create_event(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateEventRequest>,
) -> Result<ApiResponse<StoredEvent>, ApiError> {
    if request.operator.trim().is_empty() {
        return Err(ApiError::bad_request("operator is required"));
    }
    let event = EventService::new(&state).record(request.into()).await?;
    Ok(ApiResponse::ok(event))
}

pub async fn list_events(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<EventListQuery>,
) -> Result<ApiResponse<Vec<StoredEvent>>, ApiError> {
    let pagination = query
        .pagination()
        .ok_or_else(|| ApiError::bad_request("page_size must be greater than 0"))?;

    let (events, total) = EventService::new(&state).list(
        &query.filter(),
        pagination,
        query.order_by,
        query.order_type,
    )?;
    Ok(ApiResponse::paged(events, pagination, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::TestHarness;
    use crate::storage::repository::EventColumn;
    use crate::storage::{EventType, SortOrder};
    use axum::http::StatusCode;
    use serde_json::{json, Map};

    fn event(event_type: EventType, project_code: Option<&str>) -> CreateEventRequest {
        let mut detail = Map::new();
        if let Some(code) = project_code {
            detail.insert("project_code".to_string(), json!(code));
        }
        CreateEventRequest {
            operator: "admin".to_string(),
            operator_id: None,
            target_user: None,
            target_user_id: None,
            event_type,
            detail,
        }
    }

    fn query(project_code: Option<&str>) -> EventListQuery {
        EventListQuery {
            page: 0,
            page_size: 25,
            order_by: EventColumn::Timestamp,
            order_type: SortOrder::Asc,
            project_code: project_code.map(str::to_string),
            user_id: None,
            invitation_id: None,
        }
    }

    #[tokio::test]
    async fn create_event_resolves_operator() {
        let h = TestHarness::basic();
        let response = create_event(
            State(h.state.clone()),
            ValidJson(event(EventType::RoleChange, Some("fakecode"))),
        )
        .await
        .unwrap();
        assert_eq!(response.result.operator_id.as_deref(), Some("admin-id"));
        assert_eq!(response.result.detail["project_code"], "fakecode");
    }

    #[tokio::test]
    async fn create_event_with_unknown_operator_fails() {
        let h = TestHarness::basic();
        let mut request = event(EventType::RoleChange, None);
        request.operator = "ghost".to_string();
        let err = create_event(State(h.state.clone()), ValidJson(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_by_project_includes_account_events() {
        let h = TestHarness::basic();
        for request in [
            event(EventType::RoleChange, Some("fakecode")),
            event(EventType::InviteToProject, Some("fakecode")),
            event(EventType::RoleChange, Some("othercode")),
            event(EventType::AccountDisable, None),
            event(EventType::AccountActivated, None),
        ] {
            create_event(State(h.state.clone()), ValidJson(request))
                .await
                .unwrap();
        }

        let response = list_events(State(h.state.clone()), ValidQuery(query(Some("fakecode"))))
            .await
            .unwrap();
        assert_eq!(response.total, 4);
        assert!(response
            .result
            .iter()
            .all(|e| e.event_type.is_account_lifecycle() || e.detail["project_code"] == "fakecode"));

        let everything = list_events(State(h.state.clone()), ValidQuery(query(None)))
            .await
            .unwrap();
        assert_eq!(everything.total, 5);
    }

    #[tokio::test]
    async fn list_rejects_zero_page_size() {
        let h = TestHarness::basic();
        let mut q = query(None);
        q.page_size = 0;
        let err = list_events(State(h.state.clone()), ValidQuery(q))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
