//! Vamika daemon.
//!
//! Serves the HTTP API and runs the SOS alert controller for the
//! signed-in user until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use vamika::api::{self, SharedState};
use vamika::config::DaemonConfig;
use vamika::contacts::{ContactStore, InMemoryContactStore};
use vamika::notify::WebhookNotifier;
use vamika::shell::{Collaborators, Shell};
use vamika::tracing::{self, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stdout();

    let config = DaemonConfig::from_env()?;
    info!(
        addr = %config.api_addr,
        countdown = config.alert.initial_count,
        auto_expiry = ?config.alert.auto_expiry,
        "Starting vamikad"
    );

    let contacts: Arc<dyn ContactStore> = match config.contacts_file() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            info!(path = %path.display(), "Mirroring contacts to disk");
            Arc::new(InMemoryContactStore::with_mirror(path)?)
        }
        None => Arc::new(InMemoryContactStore::new()),
    };

    let mut collaborators = Collaborators::in_memory(Arc::clone(&contacts));
    match &config.notify_webhook {
        Some(endpoint) => {
            info!(%endpoint, "Emergency contacts will be notified via webhook");
            collaborators.notifier = Arc::new(WebhookNotifier::new(endpoint.clone(), contacts));
        }
        None => {
            warn!("VAMIKA_NOTIFY_WEBHOOK not set; SOS dispatches will only be logged");
        }
    }

    let shutdown = CancellationToken::new();
    let shell = Arc::new(Shell::new(collaborators, config.alert.clone(), shutdown.clone()));

    let mut server = tokio::spawn(api::serve(
        config.api_addr,
        SharedState {
            shell: Arc::clone(&shell),
        },
        shutdown.clone(),
    ));

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = sigterm.recv() => info!("Terminated"),
        result = &mut server => {
            shell.shutdown().await;
            return result?;
        }
    }

    shell.shutdown().await;
    server.await??;

    info!("vamikad stopped");
    Ok(())
}
