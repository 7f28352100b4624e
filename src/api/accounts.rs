// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::extract::State;

use super::extract::ValidJson;
use crate::{
    error::ApiError,
    models::{AccountStatusRequest, ApiResponse, DirectoryGroupRequest},
    services::AccountService,
    state::AppState,
};

pub async fn update_account_status(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AccountStatusRequest>,
) -> Result<ApiResponse<String>, ApiError> {
    AccountService::new(&state)
        .set_account_status(
            &request.user_email,
            request.operation_type,
            &request.operator,
        )
        .await?;
    Ok(ApiResponse::ok(format!(
        "{} user {}",
        request.operation_type.as_str(),
        request.user_email
    )))
}

pub async fn update_directory_group(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<DirectoryGroupRequest>,
) -> Result<ApiResponse<String>, ApiError> {
    AccountService::new(&state)
        .update_directory_group(
            request.operation_type,
            &request.user_email,
            &request.group_code,
        )
        .await?;
    Ok(ApiResponse::ok(format!(
        "{} user {} from ad group",
        request.operation_type.as_str(),
        request.user_email
    )))
}
