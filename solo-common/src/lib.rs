//! # Solo Common Library
//!
//! Shared code for the Solo playback service and its clients:
//! - Track and handle identifiers
//! - Event types (SoloEvent enum) and the broadcast EventBus
//! - Bootstrap configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod track;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, SoloEvent};
pub use track::{HandleId, TrackId};
