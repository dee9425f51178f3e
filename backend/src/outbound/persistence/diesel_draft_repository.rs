//! PostgreSQL-backed `DraftRepository` implementation using Diesel ORM.
//!
//! Rows are rebuilt through [`Draft::from_record`], so corrupt payload text
//! or an out-of-range revision surfaces as a query error instead of a
//! half-valid aggregate.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{DraftRepository, DraftRepositoryError};
use crate::domain::{
    Draft, DraftId, DraftKey, DraftOwner, DraftPayload, DraftRecord, NewDraft, ReportId,
    SessionToken, UserId,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation_constraint,
    unique_violation_details,
};
use super::models::{NewReportDraftRow, ReportDraftChangeset, ReportDraftRow};
use super::pool::{DbPool, PoolError};
use super::schema::report_drafts;

const PRIMARY_KEY_CONSTRAINT: &str = "report_drafts_pkey";
const FLOATING_SESSION_CONSTRAINT: &str = "report_drafts_floating_session_uidx";

/// Diesel-backed implementation of the draft repository port.
#[derive(Clone)]
pub struct DieselDraftRepository {
    pool: DbPool,
}

impl DieselDraftRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> DraftRepositoryError {
    map_basic_pool_error(error, DraftRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> DraftRepositoryError {
    map_basic_diesel_error(
        error,
        DraftRepositoryError::query,
        DraftRepositoryError::connection,
    )
}

/// Whether a primary key violation names id 0 as the clashing key.
fn collided_on_zero(details: Option<&str>) -> bool {
    details.is_some_and(|text| text.contains("(id)=(0)"))
}

/// Classify insert failures; `sequence_assigned` is false on the explicit-id
/// retry, where a primary key clash is an ordinary query error. Only a
/// sequence that handed out 0 counts as a zero-key collision.
fn map_insert_error(error: diesel::result::Error, sequence_assigned: bool) -> DraftRepositoryError {
    match unique_violation_constraint(&error) {
        Some(PRIMARY_KEY_CONSTRAINT)
            if sequence_assigned && collided_on_zero(unique_violation_details(&error)) =>
        {
            DraftRepositoryError::zero_key_collision()
        }
        Some(FLOATING_SESSION_CONSTRAINT) => DraftRepositoryError::duplicate_floating(),
        _ => map_diesel_error(error),
    }
}

/// A claim that moves a floating row into an occupied slot trips the
/// floating index just like a racing insert.
fn map_update_error(error: diesel::result::Error) -> DraftRepositoryError {
    match unique_violation_constraint(&error) {
        Some(FLOATING_SESSION_CONSTRAINT) => DraftRepositoryError::duplicate_floating(),
        _ => map_diesel_error(error),
    }
}

fn corrupt(field: &str, err: impl std::fmt::Display) -> DraftRepositoryError {
    DraftRepositoryError::query(format!("stored draft has invalid {field}: {err}"))
}

fn row_to_draft(row: ReportDraftRow) -> Result<Draft, DraftRepositoryError> {
    let ReportDraftRow {
        id,
        draft_key,
        report_id,
        session_token,
        user_id,
        payload,
        revision,
        current_tab,
        created_at,
        last_updated,
        expires_at,
    } = row;

    let owner = DraftOwner::new(
        SessionToken::new(session_token).map_err(|err| corrupt("session_token", err))?,
        user_id
            .map(UserId::new)
            .transpose()
            .map_err(|err| corrupt("user_id", err))?,
    );
    let record = DraftRecord {
        id: DraftId::new(id),
        key: DraftKey::parse(draft_key.trim()).map_err(|err| corrupt("draft_key", err))?,
        report_id: report_id
            .map(ReportId::new)
            .transpose()
            .map_err(|err| corrupt("report_id", err))?,
        owner,
        payload: DraftPayload::from_text(&payload).map_err(|err| corrupt("payload", err))?,
        revision: i64::from(revision),
        current_tab,
        created_at,
        last_updated,
        expires_at,
    };
    Draft::from_record(record).map_err(|err| corrupt("state", err))
}

fn revision_column(revision: u32) -> Result<i32, DraftRepositoryError> {
    i32::try_from(revision)
        .map_err(|_| DraftRepositoryError::query(format!("revision {revision} exceeds column range")))
}

#[async_trait]
impl DraftRepository for DieselDraftRepository {
    async fn find_attached(
        &self,
        report_id: ReportId,
    ) -> Result<Option<Draft>, DraftRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = report_drafts::table
            .filter(report_drafts::report_id.eq(report_id.get()))
            .order((report_drafts::last_updated.desc(), report_drafts::id.desc()))
            .select(ReportDraftRow::as_select())
            .first::<ReportDraftRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_draft).transpose()
    }

    async fn find_floating(
        &self,
        owner: &DraftOwner,
    ) -> Result<Option<Draft>, DraftRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = report_drafts::table
            .filter(report_drafts::report_id.is_null())
            .filter(report_drafts::session_token.eq(owner.session_token().as_ref()))
            .into_boxed();
        query = match owner.user_id() {
            Some(user_id) => query.filter(
                report_drafts::user_id
                    .eq(user_id.get())
                    .or(report_drafts::user_id.is_null()),
            ),
            None => query.filter(report_drafts::user_id.is_null()),
        };

        // The caller's own row sorts ahead of an anonymous row it could claim.
        let row = query
            .order((
                report_drafts::user_id.is_null().asc(),
                report_drafts::last_updated.desc(),
                report_drafts::id.desc(),
            ))
            .select(ReportDraftRow::as_select())
            .first::<ReportDraftRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_draft).transpose()
    }

    async fn insert(
        &self,
        draft: &NewDraft,
        explicit_id: Option<DraftId>,
    ) -> Result<Draft, DraftRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let payload = draft.payload().to_text();

        let row = NewReportDraftRow {
            id: explicit_id.map(DraftId::get),
            draft_key: draft.key().as_ref(),
            report_id: draft.report_id().map(ReportId::get),
            session_token: draft.owner().session_token().as_ref(),
            user_id: draft.owner().user_id().map(UserId::get),
            payload: &payload,
            revision: 1,
            current_tab: draft.current_tab(),
            created_at: draft.created_at(),
            last_updated: draft.created_at(),
            expires_at: draft.expires_at(),
        };

        let id: i64 = diesel::insert_into(report_drafts::table)
            .values(&row)
            .returning(report_drafts::id)
            .get_result(&mut conn)
            .await
            .map_err(|err| map_insert_error(err, explicit_id.is_none()))?;

        Ok(draft.clone().into_draft(DraftId::new(id)))
    }

    async fn next_free_id(&self) -> Result<DraftId, DraftRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let max: Option<i64> = report_drafts::table
            .select(diesel::dsl::max(report_drafts::id))
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(DraftId::new(max.unwrap_or(0)).next())
    }

    async fn update(&self, draft: &Draft) -> Result<(), DraftRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let payload = draft.payload().to_text();

        let changes = ReportDraftChangeset {
            report_id: draft.report_id().map(ReportId::get),
            session_token: draft.owner().session_token().as_ref(),
            user_id: draft.owner().user_id().map(UserId::get),
            payload: &payload,
            revision: revision_column(draft.revision())?,
            current_tab: draft.current_tab(),
            last_updated: draft.last_updated(),
        };

        let updated = diesel::update(report_drafts::table.find(draft.id().get()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_update_error)?;

        if updated == 0 {
            return Err(DraftRepositoryError::query(format!(
                "draft {} no longer exists",
                draft.id()
            )));
        }
        Ok(())
    }
}
