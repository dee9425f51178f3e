//! Port for draft persistence.
//!
//! Adapters own the lookup predicates: attached drafts are found by report
//! id alone, floating drafts by session token plus a user that is either the
//! caller or unset. Both lookups return the most recently updated row.

use async_trait::async_trait;

use crate::domain::{Draft, DraftId, DraftOwner, NewDraft, ReportId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by draft repository adapters.
    pub enum DraftRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "draft repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "draft repository query failed: {message}",
        /// The store assigned id 0 and the row collided with an existing one.
        ZeroKeyCollision =>
            "draft insert collided on primary key 0",
        /// The session and user already hold a floating draft; raised by a
        /// racing insert or by an update claiming an anonymous row.
        DuplicateFloating =>
            "a floating draft already exists for this session",
    }
}

/// Port for reading and writing drafts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Find the draft attached to a report.
    async fn find_attached(
        &self,
        report_id: ReportId,
    ) -> Result<Option<Draft>, DraftRepositoryError>;

    /// Find the caller's floating draft.
    async fn find_floating(
        &self,
        owner: &DraftOwner,
    ) -> Result<Option<Draft>, DraftRepositoryError>;

    /// Insert a new draft.
    ///
    /// `explicit_id` bypasses the store's id sequence; it is only set when
    /// recovering from [`DraftRepositoryError::ZeroKeyCollision`].
    async fn insert(
        &self,
        draft: &NewDraft,
        explicit_id: Option<DraftId>,
    ) -> Result<Draft, DraftRepositoryError>;

    /// Id one past the highest stored id.
    async fn next_free_id(&self) -> Result<DraftId, DraftRepositoryError>;

    /// Persist the mutable fields of an existing draft.
    ///
    /// Moving a floating draft into an occupied slot fails with
    /// [`DraftRepositoryError::DuplicateFloating`].
    async fn update(&self, draft: &Draft) -> Result<(), DraftRepositoryError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn connection_errors_carry_the_adapter_message() {
        let err = DraftRepositoryError::connection("pool timed out");
        assert_eq!(
            err.to_string(),
            "draft repository connection failed: pool timed out"
        );
    }

    #[rstest]
    fn recovery_variants_have_unit_constructors() {
        assert_eq!(
            DraftRepositoryError::zero_key_collision(),
            DraftRepositoryError::ZeroKeyCollision
        );
        assert_eq!(
            DraftRepositoryError::duplicate_floating(),
            DraftRepositoryError::DuplicateFloating
        );
    }
}
