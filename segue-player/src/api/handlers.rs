//! HTTP request handlers
//!
//! Thin adapters from JSON requests to [`EngineHandle`] calls.
//!
//! [`EngineHandle`]: crate::playback::EngineHandle

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playback::{EngineStatus, QueueSnapshot};
use crate::state::PlayerSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use segue_common::events::{EnqueueMode, FocusChange, RepeatMode, TrackId};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub position_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeekResponse {
    /// Position applied, -1 when nothing is loaded
    pub position_ms: i64,
}

#[derive(Debug, Deserialize)]
pub struct RepeatRequest {
    pub mode: RepeatMode,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub ids: Vec<TrackId>,
    #[serde(default = "default_enqueue_mode")]
    pub mode: EnqueueMode,
}

fn default_enqueue_mode() -> EnqueueMode {
    EnqueueMode::Last
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub ids: Vec<TrackId>,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRangeRequest {
    pub first: usize,
    pub last: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct InterleaveRequest {
    pub ids: Vec<TrackId>,
    pub current_count: usize,
    pub new_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct FocusRequest {
    pub change: FocusChange,
}

#[derive(Debug, Deserialize)]
pub struct FadeRequest {
    pub fade_seconds: i64,
    #[serde(default)]
    pub crossfade_enabled: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(operation: &str, err: Error) -> ApiError {
    let status = match &err {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::EngineStopped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{} failed: {}", operation, err);
    } else {
        warn!("{} rejected: {}", operation, err);
    }
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

fn acknowledge(operation: &str, result: crate::error::Result<()>) -> ApiResult<StatusResponse> {
    match result {
        Ok(()) => {
            info!("{} command succeeded", operation);
            Ok(StatusResponse::ok())
        }
        Err(e) => Err(api_error(operation, e)),
    }
}

// ============================================================================
// Health & Status
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "segue_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /playback/status - engine status, answered by the engine task
pub async fn get_status(State(ctx): State<AppContext>) -> ApiResult<EngineStatus> {
    ctx.engine
        .status()
        .await
        .map(Json)
        .map_err(|e| api_error("Status", e))
}

/// GET /playback/queue
pub async fn get_queue(State(ctx): State<AppContext>) -> ApiResult<QueueSnapshot> {
    ctx.engine
        .queue()
        .await
        .map(Json)
        .map_err(|e| api_error("Queue", e))
}

/// GET /playback/snapshot - last published presenter state
pub async fn get_snapshot(State(ctx): State<AppContext>) -> Json<PlayerSnapshot> {
    Json(ctx.state.snapshot())
}

// ============================================================================
// Transport
// ============================================================================

pub async fn play(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Play", ctx.engine.play().await)
}

pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Pause", ctx.engine.pause().await)
}

pub async fn toggle_pause(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Toggle", ctx.engine.toggle_pause().await)
}

pub async fn stop(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Stop", ctx.engine.stop().await)
}

pub async fn skip_next(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Next", ctx.engine.next().await)
}

pub async fn skip_previous(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Previous", ctx.engine.previous().await)
}

pub async fn restart_or_previous(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Restart or previous", ctx.engine.previous_or_restart().await)
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<SeekResponse> {
    ctx.engine
        .seek(req.position_ms)
        .await
        .map(|position_ms| Json(SeekResponse { position_ms }))
        .map_err(|e| api_error("Seek", e))
}

pub async fn set_repeat_mode(
    State(ctx): State<AppContext>,
    Json(req): Json<RepeatRequest>,
) -> ApiResult<StatusResponse> {
    acknowledge("Repeat mode", ctx.engine.set_repeat_mode(req.mode).await)
}

// ============================================================================
// Queue
// ============================================================================

/// POST /playback/enqueue - `mode` defaults to `last`
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<StatusResponse> {
    acknowledge("Enqueue", ctx.engine.enqueue(req.ids, req.mode).await)
}

/// POST /playback/load - replace the queue and play from `position`
pub async fn load(
    State(ctx): State<AppContext>,
    Json(req): Json<LoadRequest>,
) -> ApiResult<StatusResponse> {
    acknowledge("Load", ctx.engine.load(req.ids, req.position).await)
}

/// POST /playback/queue/remove - remove entries `first..=last`
pub async fn remove_range(
    State(ctx): State<AppContext>,
    Json(req): Json<RemoveRangeRequest>,
) -> ApiResult<RemovedResponse> {
    ctx.engine
        .remove_tracks(req.first, req.last)
        .await
        .map(|removed| Json(RemovedResponse { removed }))
        .map_err(|e| api_error("Remove", e))
}

/// DELETE /playback/queue/track/:track_id - remove every occurrence
pub async fn remove_track(
    State(ctx): State<AppContext>,
    Path(track_id): Path<i64>,
) -> ApiResult<RemovedResponse> {
    ctx.engine
        .remove_track(TrackId(track_id))
        .await
        .map(|removed| Json(RemovedResponse { removed }))
        .map_err(|e| api_error("Remove track", e))
}

pub async fn move_queue_item(
    State(ctx): State<AppContext>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<StatusResponse> {
    acknowledge("Move", ctx.engine.move_queue_item(req.from, req.to).await)
}

pub async fn shuffle(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Shuffle", ctx.engine.shuffle().await)
}

pub async fn uniqueify(State(ctx): State<AppContext>) -> ApiResult<RemovedResponse> {
    ctx.engine
        .uniqueify()
        .await
        .map(|removed| Json(RemovedResponse { removed }))
        .map_err(|e| api_error("Uniqueify", e))
}

pub async fn interleave(
    State(ctx): State<AppContext>,
    Json(req): Json<InterleaveRequest>,
) -> ApiResult<StatusResponse> {
    acknowledge(
        "Interleave",
        ctx.engine
            .interleave(req.ids, req.current_count, req.new_count)
            .await,
    )
}

// ============================================================================
// Platform signals & settings
// ============================================================================

/// POST /playback/focus - audio focus change from the platform
pub async fn focus_changed(
    State(ctx): State<AppContext>,
    Json(req): Json<FocusRequest>,
) -> ApiResult<StatusResponse> {
    acknowledge("Focus change", ctx.engine.focus_changed(req.change).await)
}

pub async fn storage_ejected(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Storage eject", ctx.engine.storage_ejected().await)
}

pub async fn storage_mounted(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    acknowledge("Storage mount", ctx.engine.storage_mounted().await)
}

/// POST /settings/fade
pub async fn set_fade(
    State(ctx): State<AppContext>,
    Json(req): Json<FadeRequest>,
) -> ApiResult<StatusResponse> {
    if req.fade_seconds < 0 {
        return Err(api_error(
            "Fade",
            Error::BadRequest("fade_seconds must not be negative".to_string()),
        ));
    }
    acknowledge(
        "Fade",
        ctx.engine
            .set_fade(req.fade_seconds, req.crossfade_enabled)
            .await,
    )
}
