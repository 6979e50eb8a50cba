//! Playback coordination

pub mod coordinator;
pub mod service;

pub use coordinator::{PlaybackCoordinator, PlaybackSnapshot};
pub use service::{PlayerCommand, PlayerHandle, PlayerService};
