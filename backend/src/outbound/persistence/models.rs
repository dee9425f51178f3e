//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{report_drafts, string_equipment};

/// Row struct for reading from the report_drafts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = report_drafts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReportDraftRow {
    pub id: i64,
    pub draft_key: String,
    pub report_id: Option<i64>,
    pub session_token: String,
    pub user_id: Option<i64>,
    pub payload: String,
    pub revision: i32,
    pub current_tab: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Insertable struct for new drafts.
///
/// A `None` id inserts `DEFAULT`, letting the sequence assign it.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = report_drafts)]
pub(crate) struct NewReportDraftRow<'a> {
    pub id: Option<i64>,
    pub draft_key: &'a str,
    pub report_id: Option<i64>,
    pub session_token: &'a str,
    pub user_id: Option<i64>,
    pub payload: &'a str,
    pub revision: i32,
    pub current_tab: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Changeset written on every draft update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = report_drafts)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ReportDraftChangeset<'a> {
    pub report_id: Option<i64>,
    pub session_token: &'a str,
    pub user_id: Option<i64>,
    pub payload: &'a str,
    pub revision: i32,
    pub current_tab: Option<&'a str>,
    pub last_updated: DateTime<Utc>,
}

/// Row struct for reading string equipment notes.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = string_equipment)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StringEquipmentRow {
    pub id: i64,
    pub description: String,
    pub notes: String,
}
