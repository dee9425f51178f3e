//! Driving port for measurement updates inside a report's draft.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{
    DraftId, DraftOwner, Error, FieldUpdate, MeasurementField, MeasurementKey, ReportId,
};

/// Request to set one field of one string's measurement entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateMeasurementFieldRequest {
    pub report_id: ReportId,
    pub owner: DraftOwner,
    pub key: MeasurementKey,
    pub field: MeasurementField,
    /// Stored verbatim; no numeric parsing happens.
    pub value: String,
}

/// Result of a single-field update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateMeasurementFieldResponse {
    pub draft_id: DraftId,
    pub revision: u32,
    pub field: MeasurementField,
    pub value: String,
    pub update: FieldUpdate,
}

/// Request to replace the whole measurement collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceMeasurementBatchRequest {
    pub report_id: ReportId,
    pub owner: DraftOwner,
    pub entries: Vec<Value>,
}

/// Result of a batch replace.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceMeasurementBatchResponse {
    pub draft_id: DraftId,
    pub revision: u32,
    pub entry_count: usize,
}

/// Driving port for measurement writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeasurementCommand: Send + Sync {
    /// Update one field, synthesising the entry when no string matches.
    async fn update_field(
        &self,
        request: UpdateMeasurementFieldRequest,
    ) -> Result<UpdateMeasurementFieldResponse, Error>;

    /// Replace the measurement collection; other payload fields survive.
    async fn replace_batch(
        &self,
        request: ReplaceMeasurementBatchRequest,
    ) -> Result<ReplaceMeasurementBatchResponse, Error>;
}
