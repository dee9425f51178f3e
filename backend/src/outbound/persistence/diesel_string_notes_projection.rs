//! PostgreSQL-backed `StringNotesProjection` using Diesel ORM.
//!
//! Rows are matched by case-insensitive substring on the free-text
//! description (`MPPT 2` and `String 3`), so `MPPT 1` also matches
//! `MPPT 10`. Older reporting screens rely on exactly this matching. Each
//! mirror runs in one transaction holding row locks on the matched rows.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{StringNotesProjection, StringNotesProjectionError};
use crate::domain::{MeasurementField, MeasurementKey, PipeRecord, ReportId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::StringEquipmentRow;
use super::pool::{DbPool, PoolError};
use super::schema::string_equipment;

/// Diesel-backed implementation of the string-notes projection port.
#[derive(Clone)]
pub struct DieselStringNotesProjection {
    pool: DbPool,
}

impl DieselStringNotesProjection {
    /// Create a projection writing through the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> StringNotesProjectionError {
    map_basic_pool_error(error, StringNotesProjectionError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> StringNotesProjectionError {
    map_basic_diesel_error(
        error,
        StringNotesProjectionError::query,
        StringNotesProjectionError::connection,
    )
}

fn description_patterns(key: MeasurementKey) -> (String, String) {
    (
        format!("%MPPT {}%", key.mppt),
        format!("%String {}%", key.string_num),
    )
}

fn rewrite_notes(notes: &str, field: MeasurementField, value: &str) -> String {
    let mut record = PipeRecord::parse(notes);
    record.upsert(field.as_str(), value);
    record.to_string()
}

#[async_trait]
impl StringNotesProjection for DieselStringNotesProjection {
    async fn mirror(
        &self,
        report_id: ReportId,
        key: MeasurementKey,
        field: MeasurementField,
        value: &str,
    ) -> Result<usize, StringNotesProjectionError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let (mppt_pattern, string_pattern) = description_patterns(key);

        // Rows stay locked until every rewrite lands, so concurrent edits to
        // one string cannot drop each other's pairs.
        conn.transaction(|conn| {
            async move {
                let rows: Vec<StringEquipmentRow> = string_equipment::table
                    .filter(string_equipment::report_id.eq(report_id.get()))
                    .filter(string_equipment::description.ilike(mppt_pattern))
                    .filter(string_equipment::description.ilike(string_pattern))
                    .select(StringEquipmentRow::as_select())
                    .for_update()
                    .load(conn)
                    .await?;

                let mut rewritten = 0;
                for row in rows {
                    let notes = rewrite_notes(&row.notes, field, value);
                    if notes == row.notes {
                        continue;
                    }
                    rewritten += diesel::update(string_equipment::table.find(row.id))
                        .set(string_equipment::notes.eq(notes))
                        .execute(conn)
                        .await?;
                }
                Ok::<_, diesel::result::Error>(rewritten)
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }
}
