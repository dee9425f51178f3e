//! Draft aggregate: unpublished form state saved by the autosave endpoints.
//!
//! A draft is either *attached* to a finalized report (looked up by report
//! id alone, from any session) or *floating* (looked up by the owning
//! session token plus user id). The payload is an untyped JSON object; typed
//! views such as the measurement entries live in
//! [`crate::domain::measurements`].
//!
//! Invariants:
//! - `revision` starts at 1 and grows by exactly one per write.
//! - `expires_at` is fixed at creation (`created_at` + [`DRAFT_TTL_HOURS`]).
//! - Attaching is one-way; an attached draft keeps its report id.

mod key;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

pub use key::{ANONYMOUS_OWNER, DRAFT_KEY_LEN, DraftKey, DraftKeyError, NONCE_LEN};

use super::measurements::MEASUREMENTS_FIELD;
use super::{DraftId, ReportId, SessionToken, UserId};

/// Advisory lifetime of a draft.
pub const DRAFT_TTL_HOURS: i64 = 24;
/// Maximum stored length of the `current_tab` tag.
pub const CURRENT_TAB_MAX: usize = 64;

/// Validation errors raised by draft constructors and mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftValidationError {
    /// The payload was valid JSON but not an object.
    #[error("draft payload must be a JSON object")]
    PayloadNotObject,
    /// Stored payload text could not be parsed.
    #[error("draft payload is not valid JSON: {message}")]
    PayloadUnreadable {
        /// Parser diagnostic.
        message: String,
    },
    /// The UI tab tag was too long.
    #[error("current_tab must be at most {max} characters")]
    CurrentTabTooLong {
        /// Maximum permitted length.
        max: usize,
    },
    /// A stored revision was below 1.
    #[error("draft revision must be at least 1, got {revision}")]
    InvalidRevision {
        /// Revision read back from storage.
        revision: i64,
    },
    /// The draft is already attached to another report.
    #[error("draft is already attached to report {attached}")]
    AlreadyAttached {
        /// Report the draft belongs to.
        attached: ReportId,
    },
}

/// Free-form JSON object holding the form state.
///
/// # Examples
/// ```
/// use commissioning_backend::domain::DraftPayload;
/// use serde_json::json;
///
/// let payload = DraftPayload::try_from(json!({ "notes": "hello" })).expect("object payload");
/// assert_eq!(payload.get("notes"), Some(&json!("hello")));
/// assert!(DraftPayload::try_from(json!([1, 2])).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPayload(Map<String, Value>);

impl DraftPayload {
    /// Empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse payload text read from storage.
    pub fn from_text(text: &str) -> Result<Self, DraftValidationError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value =
            serde_json::from_str(text).map_err(|err| DraftValidationError::PayloadUnreadable {
                message: err.to_string(),
            })?;
        Self::try_from(value)
    }

    /// Serialise for storage.
    pub fn to_text(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Byte length of the serialised payload.
    pub fn serialized_len(&self) -> usize {
        self.to_text().len()
    }

    /// Look up a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a top-level field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Replace this payload with `incoming`.
    ///
    /// Fields named in `carried` keep their stored value when `incoming`
    /// leaves them out; every other absent field is dropped.
    pub fn replace_with(&mut self, mut incoming: Self, carried: &[&str]) {
        for field in carried {
            if !incoming.0.contains_key(*field)
                && let Some(value) = self.0.remove(*field)
            {
                incoming.0.insert((*field).to_owned(), value);
            }
        }
        *self = incoming;
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for DraftPayload {
    type Error = DraftValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            _ => Err(DraftValidationError::PayloadNotObject),
        }
    }
}

impl From<Map<String, Value>> for DraftPayload {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Session and user that own a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOwner {
    session_token: SessionToken,
    user_id: Option<UserId>,
}

impl DraftOwner {
    /// Build an owner from the caller's session and optional user.
    pub fn new(session_token: SessionToken, user_id: Option<UserId>) -> Self {
        Self {
            session_token,
            user_id,
        }
    }

    /// Owning session token.
    pub fn session_token(&self) -> &SessionToken {
        &self.session_token
    }

    /// Owning user, when the draft was saved by an authenticated caller.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

/// How a draft is identified for lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftIdentity<'a> {
    /// Bound to a finalized report; session and user are ignored.
    Attached(ReportId),
    /// Not yet bound; identified by the owning session and user.
    Floating(&'a DraftOwner),
}

fn validate_tab(tab: Option<String>) -> Result<Option<String>, DraftValidationError> {
    match tab {
        Some(value) if value.chars().count() > CURRENT_TAB_MAX => {
            Err(DraftValidationError::CurrentTabTooLong {
                max: CURRENT_TAB_MAX,
            })
        }
        Some(value) if value.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Values written by one autosave call.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftWrite {
    /// Caller that performed the write.
    pub owner: DraftOwner,
    /// Form state sent by the caller.
    pub payload: DraftPayload,
    /// UI section active when the caller saved.
    pub current_tab: Option<String>,
}

/// Draft that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDraft {
    key: DraftKey,
    report_id: Option<ReportId>,
    owner: DraftOwner,
    payload: DraftPayload,
    current_tab: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl NewDraft {
    /// Prepare a first write for insertion, generating a fresh key.
    pub fn create(
        write: DraftWrite,
        report_id: Option<ReportId>,
        now: DateTime<Utc>,
    ) -> Result<Self, DraftValidationError> {
        let DraftWrite {
            owner,
            payload,
            current_tab,
        } = write;
        Ok(Self {
            key: DraftKey::generate(&owner, now),
            report_id,
            owner,
            payload,
            current_tab: validate_tab(current_tab)?,
            created_at: now,
            expires_at: now + Duration::hours(DRAFT_TTL_HOURS),
        })
    }

    /// External key generated for the draft.
    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    /// Report the draft is attached to, if any.
    pub fn report_id(&self) -> Option<ReportId> {
        self.report_id
    }

    /// Session and user saving the draft.
    pub fn owner(&self) -> &DraftOwner {
        &self.owner
    }

    /// Initial form state.
    pub fn payload(&self) -> &DraftPayload {
        &self.payload
    }

    /// Initial UI tab tag.
    pub fn current_tab(&self) -> Option<&str> {
        self.current_tab.as_deref()
    }

    /// Creation instant.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Advisory expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Materialise the stored draft once the store assigned an id.
    pub fn into_draft(self, id: DraftId) -> Draft {
        Draft {
            id,
            key: self.key,
            report_id: self.report_id,
            owner: self.owner,
            payload: self.payload,
            revision: 1,
            current_tab: self.current_tab,
            created_at: self.created_at,
            last_updated: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Raw field values used to rebuild a stored draft.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRecord {
    /// Storage row id.
    pub id: DraftId,
    /// External key.
    pub key: DraftKey,
    /// Attached report, if any.
    pub report_id: Option<ReportId>,
    /// Owning session and user.
    pub owner: DraftOwner,
    /// Stored form state.
    pub payload: DraftPayload,
    /// Stored write counter.
    pub revision: i64,
    /// Stored UI tab tag.
    pub current_tab: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last write instant.
    pub last_updated: DateTime<Utc>,
    /// Advisory expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// Stored draft.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    id: DraftId,
    key: DraftKey,
    report_id: Option<ReportId>,
    owner: DraftOwner,
    payload: DraftPayload,
    revision: u32,
    current_tab: Option<String>,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Draft {
    /// Rebuild a draft from stored values, validating its invariants.
    pub fn from_record(record: DraftRecord) -> Result<Self, DraftValidationError> {
        let DraftRecord {
            id,
            key,
            report_id,
            owner,
            payload,
            revision,
            current_tab,
            created_at,
            last_updated,
            expires_at,
        } = record;
        let revision = u32::try_from(revision)
            .ok()
            .filter(|value| *value >= 1)
            .ok_or(DraftValidationError::InvalidRevision { revision })?;
        Ok(Self {
            id,
            key,
            report_id,
            owner,
            payload,
            revision,
            current_tab: validate_tab(current_tab)?,
            created_at,
            last_updated,
            expires_at,
        })
    }

    /// Storage row id.
    pub fn id(&self) -> DraftId {
        self.id
    }

    /// External key.
    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    /// Attached report, if any.
    pub fn report_id(&self) -> Option<ReportId> {
        self.report_id
    }

    /// Lookup identity of this draft.
    pub fn identity(&self) -> DraftIdentity<'_> {
        match self.report_id {
            Some(report_id) => DraftIdentity::Attached(report_id),
            None => DraftIdentity::Floating(&self.owner),
        }
    }

    /// Owning session and user.
    pub fn owner(&self) -> &DraftOwner {
        &self.owner
    }

    /// Stored form state.
    pub fn payload(&self) -> &DraftPayload {
        &self.payload
    }

    /// Write counter.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// UI tab tag recorded by the last write that supplied one.
    pub fn current_tab(&self) -> Option<&str> {
        self.current_tab.as_deref()
    }

    /// Creation instant.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last write instant.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Advisory expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the draft is past its advisory lifetime.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Bind a floating draft to a finalized report.
    ///
    /// Re-attaching to the same report is a no-op.
    pub fn attach(&mut self, report_id: ReportId) -> Result<(), DraftValidationError> {
        match self.report_id {
            Some(attached) if attached != report_id => {
                Err(DraftValidationError::AlreadyAttached { attached })
            }
            _ => {
                self.report_id = Some(report_id);
                Ok(())
            }
        }
    }

    /// Apply one autosave write.
    ///
    /// The payload becomes the written form state; only the measurement
    /// collection survives a write that omits it. Bumps the revision by one
    /// and stamps `last_updated`. An anonymous floating draft is claimed by an
    /// authenticated writer; attached drafts keep their original session
    /// affiliation.
    pub fn record_write(
        &mut self,
        write: DraftWrite,
        now: DateTime<Utc>,
    ) -> Result<(), DraftValidationError> {
        let DraftWrite {
            owner,
            payload,
            current_tab,
        } = write;
        if let Some(tab) = validate_tab(current_tab)? {
            self.current_tab = Some(tab);
        }
        if self.owner.user_id.is_none() && self.report_id.is_none() {
            self.owner.user_id = owner.user_id;
        }
        self.payload.replace_with(payload, &[MEASUREMENTS_FIELD]);
        self.revision = self.revision.saturating_add(1);
        self.last_updated = now;
        Ok(())
    }
}
