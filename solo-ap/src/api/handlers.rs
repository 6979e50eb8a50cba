//! HTTP request handlers

use crate::api::AppContext;
use crate::error::Error;
use crate::playback::PlaybackSnapshot;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use solo_common::{PlaybackState, TrackId};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    build: String,
    backend: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Body of play/toggle requests, and query of playing requests
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    track: String,
}

/// What a toggle control for a track should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    /// Track is not playing; show the play icon
    Play,
    /// Track is playing; show the pause icon
    Pause,
}

impl Control {
    pub fn for_playing(playing: bool) -> Self {
        if playing {
            Control::Pause
        } else {
            Control::Play
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackStatusResponse {
    track: TrackId,
    playing: bool,
    state: PlaybackState,
    control: Control,
}

impl TrackStatusResponse {
    fn new(track: TrackId, state: PlaybackState) -> Self {
        let playing = state == PlaybackState::Playing;
        Self {
            track,
            playing,
            state,
            control: Control::for_playing(playing),
        }
    }
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidTrack(_) => StatusCode::BAD_REQUEST,
        Error::TrackNotFound(_) => StatusCode::NOT_FOUND,
        Error::ServiceStopped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

fn track_id(raw: String) -> Result<TrackId, ApiError> {
    if raw.trim().is_empty() {
        return Err(error_response(Error::InvalidTrack(
            "track must not be empty".to_string(),
        )));
    }
    Ok(TrackId::from(raw))
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "solo-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: format!("{} {}", env!("GIT_HASH"), env!("BUILD_TIMESTAMP")),
        backend: ctx.backend.to_string(),
    })
}

// ============================================================================
// Playback Endpoints
// ============================================================================

/// POST /playback/play - Play a track, resuming it if it is current
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<TrackRequest>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    let track = track_id(req.track)?;
    info!("Play request: {}", track);

    ctx.player.play(track).await.map(Json).map_err(error_response)
}

/// POST /playback/pause - Pause whatever is playing
pub async fn pause(State(ctx): State<AppContext>) -> Result<Json<PlaybackSnapshot>, ApiError> {
    info!("Pause request");
    ctx.player.pause().await.map(Json).map_err(error_response)
}

/// POST /playback/toggle - Toggle a track the way its control does
pub async fn toggle(
    State(ctx): State<AppContext>,
    Json(req): Json<TrackRequest>,
) -> Result<Json<TrackStatusResponse>, ApiError> {
    let track = track_id(req.track)?;
    info!("Toggle request: {}", track);

    let state = ctx
        .player
        .toggle(track.clone())
        .await
        .map_err(error_response)?;

    Ok(Json(TrackStatusResponse::new(track, state)))
}

/// GET /playback/state - Coordinator snapshot
pub async fn get_state(
    State(ctx): State<AppContext>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    ctx.player.snapshot().await.map(Json).map_err(error_response)
}

/// GET /playback/playing?track=... - Whether one track is playing
pub async fn get_playing(
    State(ctx): State<AppContext>,
    Query(query): Query<TrackRequest>,
) -> Result<Json<TrackStatusResponse>, ApiError> {
    let track = track_id(query.track)?;
    let state = ctx
        .player
        .state_of(track.clone())
        .await
        .map_err(error_response)?;

    Ok(Json(TrackStatusResponse::new(track, state)))
}
