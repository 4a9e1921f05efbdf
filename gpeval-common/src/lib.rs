//! # GP Evaluation Common Library
//!
//! Shared code for the gpeval services including:
//! - Error type and result alias
//! - Ownership scopes
//! - Database models and schema initialization
//! - Configuration loading and root folder resolution

pub mod config;
pub mod db;
pub mod error;
pub mod scope;

pub use error::{Error, Result};
pub use scope::Scope;
