//! Vamika personal-safety companion.
//!
//! The daemon serves a small HTTP API over a set of collaborators (session,
//! contacts, incidents, resources) and owns the SOS alert controller for the
//! signed-in user. See [`sos`] for the alert state machine.

pub mod api;
pub mod api_client;
pub mod config;
pub mod contacts;
pub mod error;
pub mod incidents;
pub mod notify;
pub mod resources;
pub mod session;
pub mod shell;
pub mod sos;
pub mod tracing;
