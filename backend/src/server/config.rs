//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use commissioning_backend::domain::DraftServiceConfig;
use commissioning_backend::inbound::http::session_config::SessionSettings;
use commissioning_backend::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) mirror_string_notes: bool,
    pub(crate) drafts: DraftServiceConfig,
}

impl ServerConfig {
    /// Construct a configuration that keeps drafts in process memory.
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr) -> Self {
        Self {
            session,
            bind_addr,
            db_pool: None,
            mirror_string_notes: false,
            drafts: DraftServiceConfig::default(),
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// When provided, drafts are stored in PostgreSQL and the string-notes
    /// mirror becomes available.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Mirror measurement edits into the string equipment table.
    ///
    /// Ignored without a database pool.
    #[must_use]
    pub fn with_string_notes_mirror(mut self, enabled: bool) -> Self {
        self.mirror_string_notes = enabled;
        self
    }

    #[must_use]
    pub fn with_draft_config(mut self, drafts: DraftServiceConfig) -> Self {
        self.drafts = drafts;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
