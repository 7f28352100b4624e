// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub mod accounts;
pub mod events;
pub mod extract;
pub mod invitations;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/invitations", post(invitations::create_invitation))
        .route("/invitation/check/{email}", get(invitations::check_user))
        .route("/invitation-list", post(invitations::list_invitations))
        .route("/invitation/{invite_id}", put(invitations::update_invitation))
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route("/user/account", put(accounts::update_account_status))
        .route("/user/ad-group", put(accounts::update_directory_group))
        .with_state(state);

    Router::new().nest("/v1", v1_routes)
}
