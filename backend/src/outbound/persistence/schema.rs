//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Autosaved report drafts.
    ///
    /// `report_id` is NULL while the draft is floating. A partial unique
    /// index keeps one floating row per session and user.
    report_drafts (id) {
        /// Primary key; normally assigned by the `BIGSERIAL` sequence.
        id -> Int8,
        /// 64-character hex key exposed to clients.
        draft_key -> Varchar,
        /// Finalized report the draft is attached to.
        report_id -> Nullable<Int8>,
        /// Opaque browser session token.
        session_token -> Varchar,
        /// Authenticated owner, NULL for anonymous drafts.
        user_id -> Nullable<Int8>,
        /// JSON object text of the form state.
        payload -> Text,
        /// Write counter starting at 1.
        revision -> Int4,
        /// UI section tag.
        current_tab -> Nullable<Varchar>,
        created_at -> Timestamptz,
        last_updated -> Timestamptz,
        /// Advisory expiry; nothing purges expired rows.
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    /// Legacy string equipment rows mirrored by the notes projection.
    string_equipment (id) {
        id -> Int8,
        report_id -> Int8,
        /// Free text such as `Inverter 1 MPPT 2 String 3`.
        description -> Text,
        /// Pipe-delimited `key: value` segments.
        notes -> Text,
    }
}
