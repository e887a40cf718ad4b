//! Logging setup.
//!
//! Modules log through the re-exported macros in [`prelude`] so the
//! backing crate stays a single import away from every call site.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod prelude {
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// Logs go to the systemd journal when the process was started by
/// systemd (`JOURNAL_STREAM` is set and the journal socket is
/// reachable), otherwise to stderr.
pub fn init_journald_or_stdout() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if std::env::var_os("JOURNAL_STREAM").is_some() {
        match tracing_journald::layer() {
            Ok(journald) => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(journald)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("journald unavailable, logging to stderr: {e}");
            }
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
