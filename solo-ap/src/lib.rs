//! # Solo Audio Player Library (solo-ap)
//!
//! Plays at most one track at a time. Starting a track releases whatever was
//! playing before; pausing and resuming keep the same underlying handle.
//!
//! **Architecture:** a [`PlaybackCoordinator`](playback::PlaybackCoordinator)
//! owns the single active handle and runs on its own thread behind
//! [`PlayerService`]. Media backends (cpal output fed by symphonia + rubato, or
//! a silent timer) sit behind the [`MediaBackend`](backend::MediaBackend)
//! trait. An axum router exposes play/pause/toggle and an SSE event stream.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod playback;

pub use api::{build_router, AppContext};
pub use error::{Error, Result};
pub use playback::{PlayerHandle, PlayerService};
