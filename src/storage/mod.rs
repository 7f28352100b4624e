// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for invitations and user-account audit events, backed
//! by an embedded redb database.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/auth.redb
//!   <prefix>_invitation.invitation   # one row per invitation
//!   <prefix>_event.user_event        # one row per audit event
//! ```
//!
//! ## Important Notes
//!
//! - The [`Database`] handle is opened once in `main` and injected through
//!   `AppState`; nothing in this module holds global state.
//! - Uniqueness of pending invitations is checked by the workflow before
//!   insert, not enforced here.

pub mod database;
pub mod repository;

pub use database::{Database, StorageError, StorageResult};
pub use repository::{
    EventRepository, EventType, InvitationRepository, InvitationStatus, Pagination, PlatformRole,
    SortOrder, StoredEvent, StoredInvitation,
};
