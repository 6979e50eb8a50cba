//! HTTP control surface
//!
//! One toggle per track id: clients call play/pause/toggle on interaction and
//! query the playing state to choose the icon they render. Track ids are
//! arbitrary strings (often URLs), so they travel in JSON bodies and query
//! strings rather than path segments.

pub mod handlers;
pub mod sse;

use crate::playback::PlayerHandle;
use axum::{
    routing::{get, post},
    Router,
};
use solo_common::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub player: PlayerHandle,
    pub events: EventBus,
    /// Backend name reported by /health
    pub backend: &'static str,
}

/// Build the router with all routes
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Playback control
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/toggle", post(handlers::toggle))
        .route("/playback/state", get(handlers::get_state))
        .route("/playback/playing", get(handlers::get_playing))
        // SSE event stream
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Pages of the site embedding the toggles are served from elsewhere
        .layer(CorsLayer::permissive())
}
