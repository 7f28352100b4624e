// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth Service - Invitation & Account Lifecycle Broker
//!
//! Brokers between the identity provider (Keycloak), the directory service
//! (LDAP / Active Directory), an embedded invitation/event store and the
//! notification service.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `config` - Environment-driven configuration
//! - `providers` - Keycloak, LDAP, notification and project clients
//! - `services` - Invitation, event and account workflows
//! - `storage` - Embedded database (redb)

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod services;
pub mod state;
pub mod storage;
