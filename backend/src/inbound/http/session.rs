//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! The external login layer writes the authenticated user's integer id under
//! `user_id`. The draft endpoints add their own opaque token under
//! `draft_session`, minted on first use, which identifies floating drafts.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::domain::{DraftOwner, Error, SessionToken, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const DRAFT_SESSION_KEY: &str = "draft_session";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

fn session_failure(action: &str, error: impl std::fmt::Display) -> Error {
    Error::internal(format!("failed to {action} session: {error}"))
}

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user's id in the session cookie.
    pub fn persist_user(&self, user_id: UserId) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user_id.get())
            .map_err(|error| session_failure("persist", error))
    }

    /// Fetch the current user id, if present and well formed.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let raw = match self.0.get::<i64>(USER_ID_KEY) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "unreadable user id in session cookie");
                return Ok(None);
            }
        };
        Ok(raw.and_then(|value| match UserId::new(value) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "invalid user id in session cookie");
                None
            }
        }))
    }

    /// Require an authenticated user id or return `401 Unauthorized`.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Token identifying this browser session's floating drafts.
    ///
    /// Minted and stored on first call; a tampered value is replaced.
    pub fn draft_session_token(&self) -> Result<SessionToken, Error> {
        let stored = self
            .0
            .get::<String>(DRAFT_SESSION_KEY)
            .map_err(|error| session_failure("read", error))?;
        if let Some(token) = stored.and_then(|raw| SessionToken::new(raw).ok()) {
            return Ok(token);
        }

        let token = SessionToken::generate();
        self.0
            .insert(DRAFT_SESSION_KEY, token.as_ref())
            .map_err(|error| session_failure("persist", error))?;
        debug!("minted draft session token");
        Ok(token)
    }

    /// Caller identity for draft operations; anonymous callers are allowed.
    pub fn draft_owner(&self) -> Result<DraftOwner, Error> {
        Ok(DraftOwner::new(self.draft_session_token()?, self.user_id()?))
    }

    /// Caller identity for operations that need a logged-in user.
    pub fn require_draft_owner(&self) -> Result<DraftOwner, Error> {
        let user_id = self.require_user_id()?;
        Ok(DraftOwner::new(self.draft_session_token()?, Some(user_id)))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
