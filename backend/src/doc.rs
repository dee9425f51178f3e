//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the draft and measurement endpoints, the health
//! probes, and the error envelope schema. The document backs Swagger UI in
//! debug builds and is exported by the `openapi-dump` binary.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie shared with the portal login layer.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Commissioning portal backend API",
        description = "Draft autosave and per-string measurement updates for commissioning and site-survey reports."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::drafts::save_draft,
        crate::inbound::http::drafts::load_draft,
        crate::inbound::http::measurements::update_measurement_field,
        crate::inbound::http::measurements::replace_measurement_batch,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "drafts", description = "Autosaved report form state"),
        (name = "measurements", description = "Per-string measurement entries inside a report draft"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
