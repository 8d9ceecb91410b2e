//! Local database layer
//!
//! The SQLite database holds server-side state only: login sessions,
//! settings, and the catalog response cache. Movie ratings live in the
//! hosted document store, not here.

pub mod init;
pub mod models;
pub mod settings;

pub use init::init_database;
pub use models::Session;
