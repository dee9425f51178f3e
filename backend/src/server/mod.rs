//! Server construction and middleware wiring.

mod config;
pub mod settings;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use commissioning_backend::Trace;
#[cfg(debug_assertions)]
use commissioning_backend::doc::ApiDoc;
use commissioning_backend::domain::ports::{DisabledStringNotesProjection, StringNotesProjection};
use commissioning_backend::inbound::http::drafts::{load_draft, save_draft};
use commissioning_backend::inbound::http::error::{json_config, query_config};
use commissioning_backend::inbound::http::health::{HealthState, live, ready};
use commissioning_backend::inbound::http::measurements::{
    replace_measurement_batch, update_measurement_field,
};
use commissioning_backend::inbound::http::session_config::SessionSettings;
use commissioning_backend::inbound::http::state::HttpState;
use commissioning_backend::outbound::memory::InMemoryDraftRepository;
use commissioning_backend::outbound::persistence::{
    DieselDraftRepository, DieselStringNotesProjection,
};

/// Wire domain services to the PostgreSQL adapters when a pool is present,
/// otherwise to the in-memory store.
fn build_http_state(config: &ServerConfig) -> HttpState {
    let clock = Arc::new(DefaultClock);
    match &config.db_pool {
        Some(pool) => {
            let string_notes: Arc<dyn StringNotesProjection> = if config.mirror_string_notes {
                Arc::new(DieselStringNotesProjection::new(pool.clone()))
            } else {
                Arc::new(DisabledStringNotesProjection)
            };
            HttpState::from_repository(
                Arc::new(DieselDraftRepository::new(pool.clone())),
                string_notes,
                clock,
                config.drafts,
            )
        }
        None => {
            info!("no database configured; drafts are kept in memory");
            HttpState::from_repository(
                Arc::new(InMemoryDraftRepository::new()),
                Arc::new(DisabledStringNotesProjection),
                clock,
                config.drafts,
            )
        }
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    session: SessionSettings,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        session,
    } = deps;

    let api = web::scope("/api/v1")
        .wrap(session.middleware())
        .service(save_draft)
        .service(load_draft)
        .service(update_measurement_field)
        .service(replace_measurement_batch);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(query_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is bound.
/// - `config`: pre-built [`ServerConfig`] with session, binding and storage settings.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = web::Data::new(build_http_state(&config));
    let session = config.session.clone();
    let bind_addr = config.bind_addr();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            session: session.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    info!(%bind_addr, "listening");
    health_state.mark_ready();
    Ok(server)
}
