//! Measurement updates on top of draft reconciliation.
//!
//! Measurements live in the report draft's `mppt_data` array. Every update
//! goes through [`DraftService`] so it obeys the same identity rules and
//! revision accounting as a plain autosave.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{
    DraftRepository, MeasurementCommand, ReplaceMeasurementBatchRequest,
    ReplaceMeasurementBatchResponse, StringNotesProjection, UpdateMeasurementFieldRequest,
    UpdateMeasurementFieldResponse,
};
use crate::domain::{
    DraftOwner, DraftPayload, DraftService, DraftWrite, Error, ReportId, apply_batch, apply_field,
};

/// Service implementing [`MeasurementCommand`].
pub struct MeasurementService<R> {
    drafts: DraftService<R>,
    string_notes: Arc<dyn StringNotesProjection>,
}

impl<R> Clone for MeasurementService<R> {
    fn clone(&self) -> Self {
        Self {
            drafts: self.drafts.clone(),
            string_notes: Arc::clone(&self.string_notes),
        }
    }
}

impl<R> MeasurementService<R> {
    /// Create a service writing through `drafts` and mirroring into
    /// `string_notes`.
    pub fn new(drafts: DraftService<R>, string_notes: Arc<dyn StringNotesProjection>) -> Self {
        Self {
            drafts,
            string_notes,
        }
    }
}

impl<R> MeasurementService<R>
where
    R: DraftRepository,
{
    async fn current_payload(
        &self,
        report_id: ReportId,
        owner: &DraftOwner,
    ) -> Result<DraftPayload, Error> {
        Ok(self
            .drafts
            .locate(Some(report_id), owner)
            .await?
            .map(|draft| draft.payload().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl<R> MeasurementCommand for MeasurementService<R>
where
    R: DraftRepository,
{
    async fn update_field(
        &self,
        request: UpdateMeasurementFieldRequest,
    ) -> Result<UpdateMeasurementFieldResponse, Error> {
        let UpdateMeasurementFieldRequest {
            report_id,
            owner,
            key,
            field,
            value,
        } = request;

        let mut merged = self.current_payload(report_id, &owner).await?;
        let update = apply_field(&mut merged, key, field, &value);
        let (draft, _) = self
            .drafts
            .write(
                Some(report_id),
                DraftWrite {
                    owner,
                    payload: merged,
                    current_tab: None,
                },
            )
            .await?;

        if let Err(err) = self.string_notes.mirror(report_id, key, field, &value).await {
            warn!(
                error = %err,
                report_id = %report_id,
                string = %key,
                "string notes mirror failed; draft write kept"
            );
        }

        Ok(UpdateMeasurementFieldResponse {
            draft_id: draft.id(),
            revision: draft.revision(),
            field,
            value,
            update,
        })
    }

    async fn replace_batch(
        &self,
        request: ReplaceMeasurementBatchRequest,
    ) -> Result<ReplaceMeasurementBatchResponse, Error> {
        let ReplaceMeasurementBatchRequest {
            report_id,
            owner,
            entries,
        } = request;

        let entry_count = entries.len();
        let mut merged = self.current_payload(report_id, &owner).await?;
        apply_batch(&mut merged, entries);
        let (draft, _) = self
            .drafts
            .write(
                Some(report_id),
                DraftWrite {
                    owner,
                    payload: merged,
                    current_tab: None,
                },
            )
            .await?;

        Ok(ReplaceMeasurementBatchResponse {
            draft_id: draft.id(),
            revision: draft.revision(),
            entry_count,
        })
    }
}

#[cfg(test)]
#[path = "measurement_service_tests.rs"]
mod tests;
