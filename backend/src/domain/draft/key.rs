//! External draft identifiers.
//!
//! A draft key is derived before the row exists, so it cannot depend on the
//! storage id. It hashes the owning session, the user (or an anonymous
//! sentinel), the creation instant and a random nonce; keys are never
//! reused.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::DraftOwner;

/// Sentinel hashed in place of a missing user id.
pub const ANONYMOUS_OWNER: &str = "anonymous";
/// Length of a hex-encoded SHA-256 digest.
pub const DRAFT_KEY_LEN: usize = 64;
/// Bytes of randomness mixed into every key.
pub const NONCE_LEN: usize = 16;

/// Errors raised when parsing a stored draft key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("draft key must be 64 lowercase hex characters")]
pub struct DraftKeyError;

/// Globally unique external identifier of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DraftKey(String);

impl DraftKey {
    /// Derive a key from its inputs.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use commissioning_backend::domain::{DraftKey, DraftOwner, SessionToken};
    ///
    /// let owner = DraftOwner::new(SessionToken::new("abc").expect("token"), None);
    /// let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("instant");
    /// let first = DraftKey::derive(&owner, at, &[0; 16]);
    /// let second = DraftKey::derive(&owner, at, &[1; 16]);
    /// assert_ne!(first, second);
    /// assert_eq!(first.as_ref().len(), 64);
    /// ```
    pub fn derive(owner: &DraftOwner, now: DateTime<Utc>, nonce: &[u8; NONCE_LEN]) -> Self {
        let user = owner
            .user_id()
            .map_or_else(|| ANONYMOUS_OWNER.to_owned(), |id| id.to_string());
        let mut hasher = Sha256::new();
        hasher.update(owner.session_token().as_ref().as_bytes());
        hasher.update(b"|");
        hasher.update(user.as_bytes());
        hasher.update(b"|");
        hasher.update(now.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
        hasher.update(b"|");
        hasher.update(hex::encode(nonce).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Derive a key using a fresh random nonce.
    pub fn generate(owner: &DraftOwner, now: DateTime<Utc>) -> Self {
        let nonce: [u8; NONCE_LEN] = rand::random();
        Self::derive(owner, now, &nonce)
    }

    /// Validate a key read back from storage.
    pub fn parse(raw: impl Into<String>) -> Result<Self, DraftKeyError> {
        let raw = raw.into();
        let well_formed = raw.len() == DRAFT_KEY_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if well_formed { Ok(Self(raw)) } else { Err(DraftKeyError) }
    }
}

impl AsRef<str> for DraftKey {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DraftKey {
    type Error = DraftKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DraftKey> for String {
    fn from(value: DraftKey) -> Self {
        value.0
    }
}
