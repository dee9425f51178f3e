//! Strongly typed identifiers shared by the draft and measurement modules.
//!
//! User, report and draft ids are integers issued by the relational store.
//! The session token is opaque: it is compared for equality and never
//! parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum accepted length of a session token.
pub const SESSION_TOKEN_MAX: usize = 128;

/// Validation errors raised by identifier constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// Integer ids issued by the store start at 1.
    #[error("{field} must be a positive integer, got {value}")]
    NotPositive {
        /// Name of the rejected identifier.
        field: &'static str,
        /// Value supplied by the caller.
        value: i64,
    },
    /// The session token was empty or padded with whitespace.
    #[error("session token must be a non-empty, trimmed string")]
    BlankSessionToken,
    /// The session token exceeded [`SESSION_TOKEN_MAX`].
    #[error("session token must be at most {max} characters")]
    SessionTokenTooLong {
        /// Maximum permitted length.
        max: usize,
    },
}

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Validate and wrap a raw integer id.
            pub fn new(value: i64) -> Result<Self, IdValidationError> {
                if value <= 0 {
                    return Err(IdValidationError::NotPositive {
                        field: $field,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Raw integer value as stored.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Authenticated user id, supplied by the external session layer.
    UserId,
    "user_id"
);

positive_id!(
    /// Id of the finalized report a draft is attached to.
    ///
    /// # Examples
    /// ```
    /// use commissioning_backend::domain::ReportId;
    ///
    /// assert_eq!(ReportId::new(42).map(ReportId::get), Ok(42));
    /// assert!(ReportId::new(0).is_err());
    /// ```
    ReportId,
    "report_id"
);

/// Storage row id of a draft.
///
/// Unlike the other ids this accepts zero: a misconfigured autoincrement can
/// hand out id 0, which the reconciliation service recovers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(i64);

impl DraftId {
    /// Wrap a raw row id.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw integer value as stored.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Id immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token identifying the browser session that owns a floating draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Validate and construct a token.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdValidationError> {
        let raw = raw.into();
        if raw.is_empty() || raw.trim() != raw {
            return Err(IdValidationError::BlankSessionToken);
        }
        if raw.chars().count() > SESSION_TOKEN_MAX {
            return Err(IdValidationError::SessionTokenTooLong {
                max: SESSION_TOKEN_MAX,
            });
        }
        Ok(Self(raw))
    }

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionToken {
    type Error = IdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionToken> for String {
    fn from(value: SessionToken) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0)]
    #[case(-7)]
    fn user_id_rejects_non_positive(#[case] raw: i64) {
        let err = UserId::new(raw).expect_err("non-positive id");
        assert_eq!(
            err,
            IdValidationError::NotPositive {
                field: "user_id",
                value: raw
            }
        );
    }

    #[rstest]
    fn report_id_deserialises_from_integer() {
        let id: ReportId = serde_json::from_str("17").expect("valid report id");
        assert_eq!(id.get(), 17);
        assert!(serde_json::from_str::<ReportId>("0").is_err());
    }

    #[rstest]
    #[case("")]
    #[case(" padded ")]
    fn session_token_rejects_blank(#[case] raw: &str) {
        assert_eq!(
            SessionToken::new(raw),
            Err(IdValidationError::BlankSessionToken)
        );
    }

    #[rstest]
    fn session_token_rejects_overlong() {
        let raw = "a".repeat(SESSION_TOKEN_MAX + 1);
        assert!(matches!(
            SessionToken::new(raw),
            Err(IdValidationError::SessionTokenTooLong { .. })
        ));
    }

    #[rstest]
    fn generated_session_tokens_are_distinct() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }

    #[rstest]
    fn draft_id_next_increments() {
        assert_eq!(DraftId::new(0).next(), DraftId::new(1));
    }
}
