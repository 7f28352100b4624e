// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::services::ServiceError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    error_msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => {
                warn!(error = %message, "Rejected request");
                ApiError::bad_request(message)
            }
            ServiceError::NotFound(message) => {
                warn!(error = %message, "Resource not found");
                ApiError::not_found(message)
            }
            ServiceError::Persistence(e) => {
                error!(error = %e, "Storage failure");
                ApiError::internal(format!("[Internal error] {e}"))
            }
            upstream => {
                error!(error = %upstream, "Upstream service failure");
                ApiError::internal(format!("[Internal error] {upstream}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            code: self.status.as_u16(),
            error_msg: self.message,
        });
        (self.status, body).into_response()
    }
}
