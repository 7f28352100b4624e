// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External collaborators.
//!
//! Each collaborator is a trait with one production implementation talking
//! to the real service. Workflows only ever see the traits, held as
//! `Arc<dyn ...>` in `AppState`.

pub mod keycloak;
pub mod ldap;
pub mod notifier;
pub mod projects;

#[cfg(test)]
pub mod fakes;

pub use keycloak::{IdentityAdmin, IdentityUser, KeycloakAdminClient, KeycloakError, RealmRole};
pub use ldap::{
    DirectoryConnector, DirectoryError, DirectorySession, DirectoryUser, GroupChange,
    LdapDirectory,
};
pub use notifier::{EmailAttachment, EmailMessage, NotificationClient, Notifier, NotifierError};
pub use projects::{Project, ProjectClient, ProjectLookup, ProjectLookupError};
