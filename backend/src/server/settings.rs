//! Server settings loaded via OrthoConfig.
//!
//! Every field can be set on the command line, in a config file, or through
//! `PORTAL_*` environment variables (`PORTAL_DATABASE_URL`,
//! `PORTAL_MIRROR_STRING_NOTES`, ...).

use std::net::{AddrParseError, SocketAddr};

use ortho_config::OrthoConfig;
use serde::Deserialize;

use commissioning_backend::domain::DraftServiceConfig;
use commissioning_backend::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);

/// Runtime configuration for the portal backend.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PORTAL")]
pub struct ServerSettings {
    /// Listen address such as `127.0.0.1:9090`; defaults to `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without one, drafts live in process memory.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Retry once with `max(id) + 1` when the id sequence hands out 0.
    #[ortho_config(default = true)]
    pub zero_key_recovery: bool,
    /// Mirror measurement edits into `string_equipment.notes`.
    #[ortho_config(default = false)]
    pub mirror_string_notes: bool,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        match self.bind_addr.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse(),
            _ => Ok(SocketAddr::from(DEFAULT_BIND_ADDR)),
        }
    }

    /// Database URL, ignoring blank values.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn pool_config(&self, database_url: &str) -> PoolConfig {
        let config = PoolConfig::new(database_url);
        match self.pool_max_size {
            Some(size) => config.with_max_size(size),
            None => config,
        }
    }

    pub fn draft_service_config(&self) -> DraftServiceConfig {
        DraftServiceConfig {
            zero_key_recovery: self.zero_key_recovery,
        }
    }
}

// Hand-written so the database password never reaches the logs.
impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url().map(|_| "<redacted>"))
            .field("pool_max_size", &self.pool_max_size)
            .field("zero_key_recovery", &self.zero_key_recovery)
            .field("mirror_string_notes", &self.mirror_string_notes)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}
