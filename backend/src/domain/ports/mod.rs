//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod draft_command;
mod draft_query;
mod draft_repository;
mod measurement_command;
mod string_notes_projection;

#[cfg(test)]
pub use draft_command::MockDraftCommand;
pub use draft_command::{DraftCommand, SaveDraftRequest, SaveDraftResponse, SaveOutcome};
#[cfg(test)]
pub use draft_query::MockDraftQuery;
pub use draft_query::{DraftQuery, LoadDraftRequest, LoadDraftResponse};
#[cfg(test)]
pub use draft_repository::MockDraftRepository;
pub use draft_repository::{DraftRepository, DraftRepositoryError};
#[cfg(test)]
pub use measurement_command::MockMeasurementCommand;
pub use measurement_command::{
    MeasurementCommand, ReplaceMeasurementBatchRequest, ReplaceMeasurementBatchResponse,
    UpdateMeasurementFieldRequest, UpdateMeasurementFieldResponse,
};
#[cfg(test)]
pub use string_notes_projection::MockStringNotesProjection;
pub use string_notes_projection::{
    DisabledStringNotesProjection, StringNotesProjection, StringNotesProjectionError,
};
