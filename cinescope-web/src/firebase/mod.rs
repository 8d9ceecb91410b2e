//! Clients for the hosted Firebase services
//!
//! Both the authentication provider and the document store are
//! external collaborators; these modules speak their REST interfaces
//! and implement nothing locally.

pub mod auth;
pub mod firestore;
