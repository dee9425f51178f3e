//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    DraftCommand, DraftQuery, DraftRepository, MeasurementCommand, StringNotesProjection,
};
use crate::domain::{DraftService, DraftServiceConfig, MeasurementService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub drafts: Arc<dyn DraftCommand>,
    pub drafts_query: Arc<dyn DraftQuery>,
    pub measurements: Arc<dyn MeasurementCommand>,
}

impl HttpState {
    /// Construct state from individual port implementations.
    pub fn new(
        drafts: Arc<dyn DraftCommand>,
        drafts_query: Arc<dyn DraftQuery>,
        measurements: Arc<dyn MeasurementCommand>,
    ) -> Self {
        Self {
            drafts,
            drafts_query,
            measurements,
        }
    }

    /// Wire every port to domain services sharing one draft repository.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use commissioning_backend::domain::DraftServiceConfig;
    /// use commissioning_backend::domain::ports::DisabledStringNotesProjection;
    /// use commissioning_backend::inbound::http::state::HttpState;
    /// use commissioning_backend::outbound::memory::InMemoryDraftRepository;
    /// use mockable::DefaultClock;
    ///
    /// let state = HttpState::from_repository(
    ///     Arc::new(InMemoryDraftRepository::new()),
    ///     Arc::new(DisabledStringNotesProjection),
    ///     Arc::new(DefaultClock),
    ///     DraftServiceConfig::default(),
    /// );
    /// let _drafts = state.drafts.clone();
    /// ```
    pub fn from_repository<R>(
        draft_repo: Arc<R>,
        string_notes: Arc<dyn StringNotesProjection>,
        clock: Arc<dyn Clock>,
        config: DraftServiceConfig,
    ) -> Self
    where
        R: DraftRepository + 'static,
    {
        let drafts = DraftService::new(draft_repo, clock).with_config(config);
        let measurements = MeasurementService::new(drafts.clone(), string_notes);
        let drafts = Arc::new(drafts);
        Self {
            drafts: drafts.clone(),
            drafts_query: drafts,
            measurements: Arc::new(measurements),
        }
    }
}
