//! Error type shared by the collaborator modules.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No user is signed in.
    #[error("not signed in")]
    Unauthenticated,

    /// Request rejected by input validation.
    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state (e.g., email already
    /// registered).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The signed-in user's alert controller has stopped.
    #[error(transparent)]
    Alert(#[from] crate::sos::AlertError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
