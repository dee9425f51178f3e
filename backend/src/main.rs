//! Backend entry-point: loads settings, prepares storage, and serves the API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use std::io;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use commissioning_backend::inbound::http::health::HealthState;
use commissioning_backend::inbound::http::session_config::{
    BuildMode, session_settings_from_env,
};
use commissioning_backend::outbound::persistence::{DbPool, run_pending_migrations};
use server::settings::ServerSettings;
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|error| io::Error::other(format!("load server settings: {error}")))?;
    info!(?settings, "server settings loaded");

    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(|error| io::Error::other(format!("session configuration: {error}")))?;
    let bind_addr = settings.bind_addr().map_err(|error| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid bind address: {error}"),
        )
    })?;

    let mut config = ServerConfig::new(session, bind_addr)
        .with_draft_config(settings.draft_service_config())
        .with_string_notes_mirror(settings.mirror_string_notes);

    if let Some(database_url) = settings.database_url() {
        if settings.run_migrations {
            run_pending_migrations(database_url)
                .await
                .map_err(|error| io::Error::other(format!("run migrations: {error}")))?;
        }
        let pool = DbPool::new(settings.pool_config(database_url))
            .await
            .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;
        config = config.with_db_pool(pool);
    } else if settings.mirror_string_notes {
        warn!("string notes mirror requested without a database; ignoring");
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    server.await
}
