//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations translate between Diesel rows and domain
//! types; reconciliation logic stays in the domain services. Connections are
//! pooled with `bb8` through `diesel-async`.
//!
//! # Example
//!
//! ```ignore
//! use commissioning_backend::outbound::persistence::{DbPool, DieselDraftRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/portal")).await?;
//! let drafts = DieselDraftRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_draft_repository;
mod diesel_string_notes_projection;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_draft_repository::DieselDraftRepository;
pub use diesel_string_notes_projection::DieselStringNotesProjection;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
