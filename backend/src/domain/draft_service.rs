//! Draft reconciliation service.
//!
//! Decides, for every autosave, which stored draft the write lands in:
//! the report's attached draft, the caller's floating draft (attached on the
//! way when a report id is supplied), or a freshly inserted one.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    DraftCommand, DraftQuery, DraftRepository, DraftRepositoryError, LoadDraftRequest,
    LoadDraftResponse, SaveDraftRequest, SaveDraftResponse, SaveOutcome,
};
use crate::domain::{Draft, DraftOwner, DraftValidationError, DraftWrite, Error, NewDraft, ReportId};

fn map_repository_error(error: DraftRepositoryError) -> Error {
    match error {
        DraftRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("draft repository unavailable: {message}"))
        }
        other => Error::internal(format!("draft repository error: {other}")),
    }
}

fn map_validation_error(error: DraftValidationError) -> Error {
    Error::invalid_request(format!("invalid draft: {error}"))
}

/// Tunables for [`DraftService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftServiceConfig {
    /// Retry an insert once with `max(id) + 1` after a collision on id 0.
    pub zero_key_recovery: bool,
}

impl Default for DraftServiceConfig {
    fn default() -> Self {
        Self {
            zero_key_recovery: true,
        }
    }
}

/// Draft service implementing the draft driving ports.
pub struct DraftService<R> {
    draft_repo: Arc<R>,
    clock: Arc<dyn Clock>,
    config: DraftServiceConfig,
}

// Manual impl: the repository sits behind an `Arc`, so `R` need not be `Clone`.
impl<R> Clone for DraftService<R> {
    fn clone(&self) -> Self {
        Self {
            draft_repo: Arc::clone(&self.draft_repo),
            clock: Arc::clone(&self.clock),
            config: self.config,
        }
    }
}

impl<R> DraftService<R> {
    /// Create a service with default settings.
    pub fn new(draft_repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            draft_repo,
            clock,
            config: DraftServiceConfig::default(),
        }
    }

    /// Replace the service settings.
    #[must_use]
    pub fn with_config(mut self, config: DraftServiceConfig) -> Self {
        self.config = config;
        self
    }
}

impl<R> DraftService<R>
where
    R: DraftRepository,
{
    /// Find the draft a write from `owner` would land in.
    pub(crate) async fn locate(
        &self,
        report_id: Option<ReportId>,
        owner: &DraftOwner,
    ) -> Result<Option<Draft>, Error> {
        if let Some(report_id) = report_id {
            let attached = self
                .draft_repo
                .find_attached(report_id)
                .await
                .map_err(map_repository_error)?;
            if attached.is_some() {
                return Ok(attached);
            }
        }
        self.draft_repo
            .find_floating(owner)
            .await
            .map_err(map_repository_error)
    }

    /// Apply one write, returning the stored draft and what happened to it.
    pub(crate) async fn write(
        &self,
        report_id: Option<ReportId>,
        write: DraftWrite,
    ) -> Result<(Draft, SaveOutcome), Error> {
        let now = self.clock.utc();
        match self.locate(report_id, &write.owner).await? {
            Some(draft) => self.update_existing(draft, report_id, write, now).await,
            None => self.create(report_id, write, now).await,
        }
    }

    async fn update_existing(
        &self,
        draft: Draft,
        report_id: Option<ReportId>,
        write: DraftWrite,
        now: DateTime<Utc>,
    ) -> Result<(Draft, SaveOutcome), Error> {
        match self.try_update(draft, report_id, write.clone(), now).await? {
            Err(DraftRepositoryError::DuplicateFloating) => {
                warn!("floating draft claim collided with the caller's own draft; updating it");
                let own = self
                    .draft_repo
                    .find_floating(&write.owner)
                    .await
                    .map_err(map_repository_error)?
                    .ok_or_else(|| Error::internal("floating draft vanished after a claim collision"))?;
                self.try_update(own, report_id, write, now)
                    .await?
                    .map_err(map_repository_error)
            }
            done => done.map_err(map_repository_error),
        }
    }

    /// Validation failures are the outer error; storage failures the inner
    /// one, so callers can react to a slot collision.
    async fn try_update(
        &self,
        mut draft: Draft,
        report_id: Option<ReportId>,
        write: DraftWrite,
        now: DateTime<Utc>,
    ) -> Result<Result<(Draft, SaveOutcome), DraftRepositoryError>, Error> {
        let outcome = match report_id {
            Some(report_id) if draft.report_id().is_none() => {
                draft.attach(report_id).map_err(map_validation_error)?;
                SaveOutcome::Attached
            }
            _ => SaveOutcome::Updated,
        };
        draft
            .record_write(write, now)
            .map_err(map_validation_error)?;
        if let Err(err) = self.draft_repo.update(&draft).await {
            return Ok(Err(err));
        }

        if outcome == SaveOutcome::Attached {
            info!(draft_id = %draft.id(), report_id = ?draft.report_id(), "floating draft attached to report");
        } else {
            debug!(draft_id = %draft.id(), revision = draft.revision(), "draft updated");
        }
        Ok(Ok((draft, outcome)))
    }

    async fn create(
        &self,
        report_id: Option<ReportId>,
        write: DraftWrite,
        now: DateTime<Utc>,
    ) -> Result<(Draft, SaveOutcome), Error> {
        let new_draft =
            NewDraft::create(write.clone(), report_id, now).map_err(map_validation_error)?;
        match self.insert_with_recovery(&new_draft).await {
            Ok(draft) => {
                info!(draft_id = %draft.id(), report_id = ?draft.report_id(), "draft created");
                Ok((draft, SaveOutcome::Created))
            }
            Err(DraftRepositoryError::DuplicateFloating) if report_id.is_none() => {
                warn!("concurrent floating draft insert detected; updating the winner");
                let winner = self
                    .draft_repo
                    .find_floating(&write.owner)
                    .await
                    .map_err(map_repository_error)?
                    .ok_or_else(|| {
                        Error::internal("floating draft vanished after a duplicate insert")
                    })?;
                self.update_existing(winner, None, write, now).await
            }
            Err(err) => Err(map_repository_error(err)),
        }
    }

    async fn insert_with_recovery(&self, new_draft: &NewDraft) -> Result<Draft, DraftRepositoryError> {
        match self.draft_repo.insert(new_draft, None).await {
            Err(DraftRepositoryError::ZeroKeyCollision) if self.config.zero_key_recovery => {
                let id = self.draft_repo.next_free_id().await?;
                warn!(draft_id = %id, "draft insert collided on id 0; retrying with explicit id");
                self.draft_repo.insert(new_draft, Some(id)).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl<R> DraftCommand for DraftService<R>
where
    R: DraftRepository,
{
    async fn save(&self, request: SaveDraftRequest) -> Result<SaveDraftResponse, Error> {
        let SaveDraftRequest {
            report_id,
            owner,
            current_tab,
            payload,
        } = request;
        let (draft, outcome) = self
            .write(
                report_id,
                DraftWrite {
                    owner,
                    payload,
                    current_tab,
                },
            )
            .await?;

        Ok(SaveDraftResponse {
            draft_id: draft.id(),
            draft_key: draft.key().clone(),
            report_id: draft.report_id(),
            revision: draft.revision(),
            saved_at: draft.last_updated(),
            data_size: draft.payload().serialized_len(),
            outcome,
        })
    }
}

#[async_trait]
impl<R> DraftQuery for DraftService<R>
where
    R: DraftRepository,
{
    async fn load(&self, request: LoadDraftRequest) -> Result<LoadDraftResponse, Error> {
        let draft = self.locate(request.report_id, &request.owner).await?;
        Ok(LoadDraftResponse { draft })
    }
}

#[cfg(test)]
#[path = "draft_service_tests.rs"]
mod tests;
