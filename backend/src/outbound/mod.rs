//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed draft repository and string-notes
//!   projection using Diesel ORM
//! - **memory**: in-process draft store used without a database
//!
//! Adapters translate between domain types and storage representations and
//! hold no reconciliation logic.

pub mod memory;
pub mod persistence;
