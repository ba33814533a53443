//! # Ingradient Common Library
//!
//! Shared code for the annotation backend:
//! - Error taxonomy (validation, not found, asset, storage)
//! - Configuration resolution (CLI → ENV → TOML → defaults)
//! - SQLite schema initialization and entity models
//! - Identifier and timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod time;

pub use error::{Error, Result};
