//! HTTP inbound adapter exposing REST endpoints.

pub mod drafts;
pub mod error;
pub mod health;
pub mod measurements;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub(crate) mod validation;

pub use error::ApiResult;
