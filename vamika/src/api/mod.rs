//! HTTP API served by the daemon.

mod error;
pub mod server;
mod v0;

pub use error::{ApiError, ErrorBody};
pub use server::{SharedState, build_router, serve};
