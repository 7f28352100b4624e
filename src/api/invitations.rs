// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::extract::{ValidJson, ValidQuery};
use crate::{
    error::ApiError,
    models::{
        ApiResponse, CheckUserQuery, CreateInvitationRequest, InvitationListRequest,
        UpdateInvitationRequest, UserView,
    },
    services::{CreateInvitationOutcome, InvitationService},
    state::AppState,
    storage::{InvitationStatus, StoredInvitation},
};

pub const DUPLICATE_INVITATION_MSG: &str = "Invitation for this user already exists";
pub const EXISTING_USER_MSG: &str = "[ERROR] User already exists in platform";

pub async fn create_invitation(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateInvitationRequest>,
) -> Result<ApiResponse<String>, ApiError> {
    request.validate().map_err(ApiError::bad_request)?;

    let response = match InvitationService::new(&state).create(&request).await? {
        CreateInvitationOutcome::Created(_) => ApiResponse::ok("success".to_string()),
        CreateInvitationOutcome::Conflict => {
            ApiResponse::with_code(StatusCode::CONFLICT, DUPLICATE_INVITATION_MSG.to_string())
        }
        CreateInvitationOutcome::AlreadyExists => {
            ApiResponse::with_code(StatusCode::BAD_REQUEST, EXISTING_USER_MSG.to_string())
        }
    };
    Ok(response)
}

pub async fn check_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    ValidQuery(query): ValidQuery<CheckUserQuery>,
) -> Result<ApiResponse<UserView>, ApiError> {
    let view = InvitationService::new(&state)
        .check_user(&email, query.project_code.as_deref())
        .await?;
    Ok(ApiResponse::ok(view))
}

pub async fn list_invitations(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<InvitationListRequest>,
) -> Result<ApiResponse<Vec<StoredInvitation>>, ApiError> {
    let pagination = request
        .pagination()
        .ok_or_else(|| ApiError::bad_request("page_size must be greater than 0"))?;

    let (invitations, total) = InvitationService::new(&state).list(
        &request.filters,
        pagination,
        request.order_by,
        request.order_type,
    )?;
    Ok(ApiResponse::paged(invitations, pagination, total))
}

pub async fn update_invitation(
    State(state): State<AppState>,
    Path(invite_id): Path<String>,
    ValidJson(request): ValidJson<UpdateInvitationRequest>,
) -> Result<ApiResponse<String>, ApiError> {
    if request.status != InvitationStatus::Complete {
        return Err(ApiError::bad_request("Invalid status"));
    }
    InvitationService::new(&state)
        .finalize(&invite_id, request.status)
        .await?;
    Ok(ApiResponse::ok("success".to_string()))
}
