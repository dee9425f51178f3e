//! Per-string measurement endpoints.
//!
//! ```text
//! POST /api/v1/measurements/field {"report_id":42,"inverter_index":0,"mppt":1,"string_num":2,"field":"voc","value":"799.5"}
//! POST /api/v1/measurements/batch {"report_id":42,"mppt_data":[...]}
//! ```
//!
//! Both write into the report's draft and need a logged-in user.

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::ports::{
    ReplaceMeasurementBatchRequest, ReplaceMeasurementBatchResponse,
    UpdateMeasurementFieldRequest, UpdateMeasurementFieldResponse,
};
use crate::domain::{FieldUpdate, MeasurementKey};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    INVERTER_INDEX, MPPT, STRING_NUM, key_part, measurement_entries, measurement_field,
    measurement_value, required_report_id,
};

/// Single-field update addressed by inverter, MPPT and string.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMeasurementFieldRequestBody {
    /// Report whose draft holds the entry; a number or numeric string.
    #[schema(value_type = i64, example = 42)]
    pub report_id: Option<Value>,
    /// Zero-based inverter position.
    #[schema(value_type = u32, example = 0)]
    pub inverter_index: Option<Value>,
    /// MPPT tracker number on the inverter.
    #[schema(value_type = u32, example = 1)]
    pub mppt: Option<Value>,
    /// String number on the tracker.
    #[schema(value_type = u32, example = 2)]
    pub string_num: Option<Value>,
    /// One of `voc`, `isc`, `vmp`, `imp`, `insulation_pos`,
    /// `insulation_neg`, `polarity`, `irradiance`, `module_temp`, `notes`.
    #[schema(example = "voc")]
    pub field: String,
    /// Stored verbatim; `null` clears the field.
    #[serde(default)]
    #[schema(value_type = String, example = "799.5")]
    pub value: Value,
}

/// Response body for a single-field update.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateMeasurementFieldResponseBody {
    /// Always `true`.
    pub success: bool,
    /// Always `field`.
    #[schema(value_type = String, example = "field")]
    pub update_type: &'static str,
    /// Field that was written.
    #[schema(value_type = String, example = "voc")]
    pub field: &'static str,
    /// Stored value.
    pub value: String,
    /// Draft holding the entry.
    pub draft_id: i64,
    /// Draft revision after the write.
    pub version: u32,
    /// True when no entry existed for the string and one was created.
    pub synthesized: bool,
}

impl From<UpdateMeasurementFieldResponse> for UpdateMeasurementFieldResponseBody {
    fn from(value: UpdateMeasurementFieldResponse) -> Self {
        Self {
            success: true,
            update_type: "field",
            field: value.field.as_str(),
            value: value.value,
            draft_id: value.draft_id.get(),
            version: value.revision,
            synthesized: value.update == FieldUpdate::Synthesized,
        }
    }
}

/// Full replacement of the report's measurement entries.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceMeasurementBatchRequestBody {
    /// Report whose draft holds the entries; a number or numeric string.
    #[schema(value_type = i64, example = 42)]
    pub report_id: Option<Value>,
    /// Entries as edited in the measurement grid; required, `[]` clears them.
    #[schema(value_type = Vec<Object>)]
    pub mppt_data: Option<Vec<Value>>,
}

/// Response body for a batch replacement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReplaceMeasurementBatchResponseBody {
    /// Always `true`.
    pub success: bool,
    /// Always `batch`.
    #[schema(value_type = String, example = "batch")]
    pub update_type: &'static str,
    /// Draft holding the entries.
    pub draft_id: i64,
    /// Draft revision after the write.
    pub version: u32,
    /// Number of entries now stored.
    pub entry_count: usize,
}

impl From<ReplaceMeasurementBatchResponse> for ReplaceMeasurementBatchResponseBody {
    fn from(value: ReplaceMeasurementBatchResponse) -> Self {
        Self {
            success: true,
            update_type: "batch",
            draft_id: value.draft_id.get(),
            version: value.revision,
            entry_count: value.entry_count,
        }
    }
}

fn parse_key(body: &UpdateMeasurementFieldRequestBody) -> ApiResult<MeasurementKey> {
    Ok(MeasurementKey::new(
        key_part(INVERTER_INDEX, body.inverter_index.as_ref())?,
        key_part(MPPT, body.mppt.as_ref())?,
        key_part(STRING_NUM, body.string_num.as_ref())?,
    ))
}

/// Update one field of one string's measurement entry.
#[utoipa::path(
    post,
    path = "/api/v1/measurements/field",
    request_body = UpdateMeasurementFieldRequestBody,
    responses(
        (status = 200, description = "Field stored", body = UpdateMeasurementFieldResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 500, description = "Storage failure", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["measurements"],
    operation_id = "updateMeasurementField",
    security(("SessionCookie" = []))
)]
#[post("/measurements/field")]
pub async fn update_measurement_field(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<UpdateMeasurementFieldRequestBody>,
) -> ApiResult<web::Json<UpdateMeasurementFieldResponseBody>> {
    let owner = session.require_draft_owner()?;
    let body = payload.into_inner();
    let request = UpdateMeasurementFieldRequest {
        report_id: required_report_id(body.report_id.as_ref())?,
        key: parse_key(&body)?,
        field: measurement_field(&body.field)?,
        value: measurement_value(&body.value)?,
        owner,
    };

    let response = state.measurements.update_field(request).await?;
    Ok(web::Json(UpdateMeasurementFieldResponseBody::from(response)))
}

/// Replace every measurement entry of a report.
#[utoipa::path(
    post,
    path = "/api/v1/measurements/batch",
    request_body = ReplaceMeasurementBatchRequestBody,
    responses(
        (status = 200, description = "Entries replaced", body = ReplaceMeasurementBatchResponseBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorized", body = ErrorSchema),
        (status = 500, description = "Storage failure", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["measurements"],
    operation_id = "replaceMeasurementBatch",
    security(("SessionCookie" = []))
)]
#[post("/measurements/batch")]
pub async fn replace_measurement_batch(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ReplaceMeasurementBatchRequestBody>,
) -> ApiResult<web::Json<ReplaceMeasurementBatchResponseBody>> {
    let owner = session.require_draft_owner()?;
    let ReplaceMeasurementBatchRequestBody {
        report_id,
        mppt_data,
    } = payload.into_inner();
    let request = ReplaceMeasurementBatchRequest {
        report_id: required_report_id(report_id.as_ref())?,
        entries: measurement_entries(mppt_data)?,
        owner,
    };

    let response = state.measurements.replace_batch(request).await?;
    Ok(web::Json(ReplaceMeasurementBatchResponseBody::from(response)))
}

#[cfg(test)]
#[path = "measurements_tests.rs"]
mod tests;
