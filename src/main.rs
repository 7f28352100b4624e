// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use auth_service::{
    api::router,
    config::{Config, LOG_FORMAT_ENV},
    providers::{KeycloakAdminClient, LdapDirectory, NotificationClient, ProjectClient},
    state::{AppState, Settings},
    storage::Database,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env().expect("Invalid configuration");

    let db = Database::open(
        &config.storage.database_path(),
        &config.storage.schema_prefix,
    )
    .expect("Failed to open database");

    let identity = KeycloakAdminClient::new(&config.keycloak, config.http_timeout)
        .expect("Failed to build Keycloak client");
    let directory = LdapDirectory::new(config.directory.clone(), config.http_timeout);
    let notifier = NotificationClient::new(&config.notification.service_url, config.http_timeout)
        .expect("Failed to build notification client");
    let projects = ProjectClient::new(config.project_service_url.clone(), config.http_timeout)
        .expect("Failed to build project client");

    let state = AppState::new(
        Arc::new(db),
        Arc::new(identity),
        Arc::new(directory),
        Arc::new(notifier),
        Arc::new(projects),
        Settings::from_config(&config),
    );
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("Failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(
        %addr,
        directory_enabled = config.directory.enabled,
        "Auth service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    info!("Server shutdown complete");
}

/// `RUST_LOG` filter (default `info`), `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received");
}
