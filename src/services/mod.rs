// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Workflows
//!
//! Orchestration of the stores and external collaborators. Each service
//! borrows the shared [`AppState`](crate::state::AppState) for the duration
//! of one call:
//!
//! - [`InvitationService`]: create, inspect, list and finalize invitations
//! - [`EventService`]: record and query user-account audit events
//! - [`AccountService`]: enable/disable accounts, directory group changes
//!
//! No step is retried and nothing is rolled back; the first failure is
//! returned to the caller.

use tracing::warn;

use crate::providers::{
    DirectoryError, DirectorySession, KeycloakError, NotifierError, ProjectLookupError,
};
use crate::storage::StorageError;

pub mod accounts;
pub mod events;
pub mod invitations;
pub mod notify;

pub use accounts::{AccountAction, AccountService, GroupOperation};
pub use events::EventService;
pub use invitations::{CreateInvitationOutcome, InvitationService};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(StorageError),

    #[error(transparent)]
    Identity(#[from] KeycloakError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Notification(#[from] NotifierError),

    #[error(transparent)]
    Project(ProjectLookupError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Close a directory session. Failures are logged, never returned, so the
/// caller's own result is preserved.
pub(crate) async fn close_directory(session: &mut dyn DirectorySession) {
    if let Err(e) = session.disconnect().await {
        warn!(error = %e, "Failed to close directory session");
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ServiceError::NotFound(format!("{what} not found")),
            other => ServiceError::Persistence(other),
        }
    }
}

impl From<ProjectLookupError> for ServiceError {
    fn from(err: ProjectLookupError) -> Self {
        match err {
            ProjectLookupError::NotFound(code) => {
                ServiceError::NotFound(format!("Project not found: {code}"))
            }
            other => ServiceError::Project(other),
        }
    }
}
