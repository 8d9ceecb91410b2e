//! HTTP API handlers for cinescope-web

pub mod auth;
pub mod health;
pub mod movies;
pub mod ratings;
pub mod ui;

pub use auth::{session_middleware, CurrentUser};
pub use health::health_routes;
