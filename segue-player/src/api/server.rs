//! HTTP server setup and routing
//!
//! Sets up the Axum router for the control endpoints and the SSE stream.
//! Every command re-enters the engine through its [`EngineHandle`].

use crate::error::{Error, Result};
use crate::playback::EngineHandle;
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{handlers, sse};

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub engine: EngineHandle,
}

/// Build the router with all routes
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Status
        .route("/playback/status", get(handlers::get_status))
        .route("/playback/queue", get(handlers::get_queue))
        .route("/playback/snapshot", get(handlers::get_snapshot))
        // Transport
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/toggle", post(handlers::toggle_pause))
        .route("/playback/stop", post(handlers::stop))
        .route("/playback/next", post(handlers::skip_next))
        .route("/playback/previous", post(handlers::skip_previous))
        .route(
            "/playback/restart_or_previous",
            post(handlers::restart_or_previous),
        )
        .route("/playback/seek", post(handlers::seek))
        .route("/playback/repeat", post(handlers::set_repeat_mode))
        // Queue management
        .route("/playback/enqueue", post(handlers::enqueue))
        .route("/playback/load", post(handlers::load))
        .route("/playback/queue/remove", post(handlers::remove_range))
        .route("/playback/queue/track/:track_id", delete(handlers::remove_track))
        .route("/playback/queue/move", post(handlers::move_queue_item))
        .route("/playback/queue/shuffle", post(handlers::shuffle))
        .route("/playback/queue/uniqueify", post(handlers::uniqueify))
        .route("/playback/queue/interleave", post(handlers::interleave))
        // Platform signals
        .route("/playback/focus", post(handlers::focus_changed))
        .route("/storage/eject", post(handlers::storage_ejected))
        .route("/storage/mount", post(handlers::storage_mounted))
        // Settings
        .route("/settings/fade", post(handlers::set_fade))
        // SSE event stream
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Serve the control API on `port` until `shutdown` resolves
pub async fn run<F>(port: u16, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
