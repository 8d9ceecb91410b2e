//! # Cinescope Common Library
//!
//! Shared code for the Cinescope movie-discovery service:
//! - Error and result types
//! - Configuration loading and data directory resolution
//! - Local SQLite database (sessions, settings, catalog cache)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
