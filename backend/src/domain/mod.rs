//! Domain primitives, aggregates and services.
//!
//! Purpose: hold the draft autosave rules independent of HTTP and SQL.
//! Adapters talk to this layer only through [`ports`].
//!
//! Public surface:
//! - `Error`, `ErrorCode`: API error payload and its stable identifier.
//! - `Draft`, `NewDraft`, `DraftPayload`: the autosaved form state.
//! - `DraftService`, `MeasurementService`: driving port implementations.

pub mod draft;
pub mod draft_service;
pub mod error;
pub mod ids;
pub mod measurement_service;
pub mod measurements;
pub mod ports;
pub mod trace_id;

pub use self::draft::{
    ANONYMOUS_OWNER, CURRENT_TAB_MAX, DRAFT_KEY_LEN, DRAFT_TTL_HOURS, Draft, DraftIdentity,
    DraftKey, DraftKeyError, DraftOwner, DraftPayload, DraftRecord, DraftValidationError,
    DraftWrite, NONCE_LEN, NewDraft,
};
pub use self::draft_service::{DraftService, DraftServiceConfig};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ids::{DraftId, IdValidationError, ReportId, SESSION_TOKEN_MAX, SessionToken, UserId};
pub use self::measurement_service::MeasurementService;
pub use self::measurements::{
    FieldUpdate, MEASUREMENTS_FIELD, MeasurementField, MeasurementKey, PipeRecord,
    UnknownMeasurementField, apply_batch, apply_field, blank_entry,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use commissioning_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("login required"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
