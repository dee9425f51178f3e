//! Driving port for draft autosave writes.
//!
//! One call persists the caller's current form state, creating, attaching or
//! updating a draft as the reconciliation rules dictate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DraftId, DraftKey, DraftOwner, DraftPayload, Error, ReportId};

/// Request to autosave a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDraftRequest {
    /// Finalized report the form belongs to, when the caller knows it.
    pub report_id: Option<ReportId>,
    /// Caller session and user.
    pub owner: DraftOwner,
    /// UI section the caller was on.
    pub current_tab: Option<String>,
    /// Form state to persist.
    pub payload: DraftPayload,
}

/// What a save did to the stored drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new draft row was inserted.
    Created,
    /// An existing draft was updated in place.
    Updated,
    /// The caller's floating draft was bound to the report and updated.
    Attached,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDraftResponse {
    pub draft_id: DraftId,
    pub draft_key: DraftKey,
    pub report_id: Option<ReportId>,
    pub revision: u32,
    pub saved_at: DateTime<Utc>,
    /// Byte length of the serialised payload after the write.
    pub data_size: usize,
    pub outcome: SaveOutcome,
}

/// Driving port for draft writes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DraftCommand: Send + Sync {
    /// Persist the caller's form state.
    ///
    /// Attached drafts are resolved by report id alone; otherwise the
    /// caller's floating draft is used. Exactly one draft is written per
    /// call and its revision grows by one (or starts at 1 when created).
    async fn save(&self, request: SaveDraftRequest) -> Result<SaveDraftResponse, Error>;
}
