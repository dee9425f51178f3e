//! Port for the legacy string-notes projection.
//!
//! Older reporting screens read measurements from a pipe-delimited `notes`
//! column on the report's string equipment rows. When enabled, measurement
//! updates are mirrored there after the draft write succeeds.

use async_trait::async_trait;

use crate::domain::{MeasurementField, MeasurementKey, ReportId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by string-notes projection adapters.
    pub enum StringNotesProjectionError {
        /// Projection store connection could not be established.
        Connection { message: String } =>
            "string notes connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "string notes query failed: {message}",
    }
}

/// Mirror of measurement values into string equipment notes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StringNotesProjection: Send + Sync {
    /// Upsert `field: value` into the notes of every matching string row.
    ///
    /// Returns the number of rows rewritten.
    async fn mirror(
        &self,
        report_id: ReportId,
        key: MeasurementKey,
        field: MeasurementField,
        value: &str,
    ) -> Result<usize, StringNotesProjectionError>;
}

/// Projection used when mirroring is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStringNotesProjection;

#[async_trait]
impl StringNotesProjection for DisabledStringNotesProjection {
    async fn mirror(
        &self,
        _report_id: ReportId,
        _key: MeasurementKey,
        _field: MeasurementField,
        _value: &str,
    ) -> Result<usize, StringNotesProjectionError> {
        Ok(0)
    }
}
