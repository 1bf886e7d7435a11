//! Contribution Engine library crate.
//!
//! This crate prices social-security contributions (health, pension,
//! occupational risk, family compensation) and administrative procedure
//! fees for a quote.  External applications may depend on the
//! `contribution_engine` crate and call into `engine::compute` directly
//! or embed the API via `api::build_router`.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;
pub mod profile;
pub mod rates;

pub use engine::compute;
pub use error::{EngineError, EngineResult};
