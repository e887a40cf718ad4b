//! API server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use super::v0;
use crate::shell::Shell;
use crate::tracing::prelude::*;

#[derive(OpenApi)]
#[openapi(info(
    title = "Vamika API",
    description = "Personal-safety companion daemon"
))]
struct ApiDoc;

/// State shared by every handler.
#[derive(Clone)]
pub struct SharedState {
    pub shell: Arc<Shell>,
}

/// All routes, with the OpenAPI document at `/api-docs/openapi.json`
/// and Swagger UI at `/swagger-ui`.
pub fn build_router(state: SharedState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/v0", v0::routes(state.clone()))
        .split_for_parts();

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until `cancellation` fires.
pub async fn serve(
    addr: SocketAddr,
    state: SharedState,
    cancellation: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind API server to {addr}"))?;
    info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancellation.cancelled().await })
        .await
        .context("API server failed")?;

    info!("API server stopped");
    Ok(())
}
