//! Draft autosave endpoints.
//!
//! ```text
//! POST /api/v1/drafts {"report_id":42,"current_tab":"strings","site_name":"Plant 4"}
//! GET  /api/v1/drafts?report_id=42
//! ```
//!
//! Both endpoints accept anonymous callers: the draft session token minted
//! into the cookie is enough to own a floating draft.

use actix_web::{get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{LoadDraftRequest, SaveDraftRequest, SaveDraftResponse, SaveOutcome};
use crate::domain::{Draft, DraftPayload};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::optional_report_id;

const NO_DRAFT_MESSAGE: &str = "No draft found";

/// Autosave body: optional identity fields plus every form field.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveDraftRequestBody {
    /// Report the draft belongs to; a number or numeric string. Omit while
    /// the report has not been created yet.
    #[serde(default)]
    #[schema(value_type = Option<i64>, example = 42)]
    pub report_id: Option<Value>,
    /// UI tab the user was on.
    #[serde(default)]
    #[schema(example = "strings")]
    pub current_tab: Option<String>,
    /// Remaining form fields, stored verbatim.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

/// Response body for a successful autosave.
#[derive(Debug, Serialize, ToSchema)]
pub struct SaveDraftResponseBody {
    /// Always `true`.
    pub success: bool,
    /// Stored draft id.
    pub draft_id: i64,
    /// 64-character hex key assigned at creation.
    pub draft_key: String,
    /// Report the draft is attached to, if any.
    pub report_id: Option<i64>,
    /// When the write was stored.
    pub timestamp: DateTime<Utc>,
    /// Byte length of the stored payload.
    pub data_size: usize,
    /// Revision after the write, starting at 1.
    pub version: u32,
    /// `created`, `updated` or `attached`.
    #[schema(value_type = String, example = "updated")]
    pub outcome: &'static str,
}

fn outcome_label(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Created => "created",
        SaveOutcome::Updated => "updated",
        SaveOutcome::Attached => "attached",
    }
}

impl From<SaveDraftResponse> for SaveDraftResponseBody {
    fn from(value: SaveDraftResponse) -> Self {
        Self {
            success: true,
            draft_id: value.draft_id.get(),
            draft_key: value.draft_key.as_ref().to_owned(),
            report_id: value.report_id.map(|id| id.get()),
            timestamp: value.saved_at,
            data_size: value.data_size,
            version: value.revision,
            outcome: outcome_label(value.outcome),
        }
    }
}

/// Query for loading a draft.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LoadDraftQuery {
    /// Report whose draft to load; omit for this session's floating draft.
    #[param(example = "42")]
    pub report_id: Option<String>,
}

/// Stored draft returned by a load.
#[derive(Debug, Serialize, ToSchema)]
pub struct DraftBody {
    /// Always `true`.
    pub success: bool,
    /// The saved form fields.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Time of the latest write.
    pub last_updated: DateTime<Utc>,
    /// Stored draft id.
    pub draft_id: i64,
    /// 64-character hex key assigned at creation.
    pub draft_key: String,
    /// Report the draft is attached to, if any.
    pub report_id: Option<i64>,
    /// Current revision.
    pub version: u32,
    /// UI tab recorded by the latest write that named one.
    pub current_tab: Option<String>,
    /// Advisory expiry, fixed at creation.
    pub expires_at: DateTime<Utc>,
}

impl From<Draft> for DraftBody {
    fn from(draft: Draft) -> Self {
        Self {
            success: true,
            last_updated: draft.last_updated(),
            draft_id: draft.id().get(),
            draft_key: draft.key().as_ref().to_owned(),
            report_id: draft.report_id().map(|id| id.get()),
            version: draft.revision(),
            current_tab: draft.current_tab().map(str::to_owned),
            expires_at: draft.expires_at(),
            data: draft.payload().clone().into_value(),
        }
    }
}

/// Load outcome when nothing has been saved yet.
#[derive(Debug, Serialize, ToSchema)]
pub struct MissingDraftBody {
    /// Always `false`.
    pub success: bool,
    /// Why nothing was returned.
    #[schema(value_type = String, example = "No draft found")]
    pub error: &'static str,
}

/// Response body for a draft load.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum LoadDraftResponseBody {
    Found(DraftBody),
    Missing(MissingDraftBody),
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Autosave the caller's form state.
#[utoipa::path(
    post,
    path = "/api/v1/drafts",
    request_body = SaveDraftRequestBody,
    responses(
        (status = 200, description = "Draft stored", body = SaveDraftResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 500, description = "Storage failure", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["drafts"],
    operation_id = "saveDraft"
)]
#[post("/drafts")]
pub async fn save_draft(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SaveDraftRequestBody>,
) -> ApiResult<web::Json<SaveDraftResponseBody>> {
    let SaveDraftRequestBody {
        report_id,
        current_tab,
        fields,
    } = payload.into_inner();
    let request = SaveDraftRequest {
        report_id: optional_report_id(report_id.as_ref())?,
        owner: session.draft_owner()?,
        current_tab: blank_to_none(current_tab),
        payload: DraftPayload::from(fields),
    };

    let response = state.drafts.save(request).await?;
    Ok(web::Json(SaveDraftResponseBody::from(response)))
}

/// Load the draft the caller would autosave into.
#[utoipa::path(
    get,
    path = "/api/v1/drafts",
    params(LoadDraftQuery),
    responses(
        (status = 200, description = "Draft, or `success: false` when none exists", body = LoadDraftResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 500, description = "Storage failure", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["drafts"],
    operation_id = "loadDraft"
)]
#[get("/drafts")]
pub async fn load_draft(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<LoadDraftQuery>,
) -> ApiResult<web::Json<LoadDraftResponseBody>> {
    let raw_report_id = query.into_inner().report_id.map(Value::String);
    let request = LoadDraftRequest {
        report_id: optional_report_id(raw_report_id.as_ref())?,
        owner: session.draft_owner()?,
    };

    let response = state.drafts_query.load(request).await?;
    let body = match response.draft {
        Some(draft) => LoadDraftResponseBody::Found(DraftBody::from(draft)),
        None => LoadDraftResponseBody::Missing(MissingDraftBody {
            success: false,
            error: NO_DRAFT_MESSAGE,
        }),
    };
    Ok(web::Json(body))
}

#[cfg(test)]
#[path = "drafts_tests.rs"]
mod tests;
