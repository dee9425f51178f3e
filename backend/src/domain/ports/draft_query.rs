//! Driving port for draft reads.

use async_trait::async_trait;

use crate::domain::{Draft, DraftOwner, Error, ReportId};

/// Request to load the draft the caller would write to.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadDraftRequest {
    pub report_id: Option<ReportId>,
    pub owner: DraftOwner,
}

/// Draft found for the caller, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadDraftResponse {
    pub draft: Option<Draft>,
}

/// Driving port for draft reads.
///
/// Loading never creates a draft.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DraftQuery: Send + Sync {
    /// Resolve the caller's draft with the same identity rules as a save.
    async fn load(&self, request: LoadDraftRequest) -> Result<LoadDraftResponse, Error>;
}
