//! Event types for the Solo event system
//!
//! Provides the shared event definitions and the EventBus used to broadcast
//! playback transitions to SSE clients and other listeners.

use crate::track::{HandleId, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Playback state of a single track, relative to the coordinator
///
/// Only the current track can be `Playing` or `Paused`; every other track is
/// implicitly `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Solo event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SoloEvent {
    /// A new handle was constructed and started for a track
    TrackStarted {
        track: TrackId,
        handle_id: HandleId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The paused current track was resumed on its existing handle
    TrackResumed {
        track: TrackId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current track was paused
    TrackPaused {
        track: TrackId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current track was released because another track was played
    TrackSuperseded {
        track: TrackId,
        by: TrackId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current track finished naturally
    TrackEnded {
        track: TrackId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Per-track state changed (what a toggle control renders)
    PlaybackStateChanged {
        track: TrackId,
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SoloEvent {
    /// Variant name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SoloEvent::TrackStarted { .. } => "TrackStarted",
            SoloEvent::TrackResumed { .. } => "TrackResumed",
            SoloEvent::TrackPaused { .. } => "TrackPaused",
            SoloEvent::TrackSuperseded { .. } => "TrackSuperseded",
            SoloEvent::TrackEnded { .. } => "TrackEnded",
            SoloEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
        }
    }

    pub fn state_changed(track: TrackId, state: PlaybackState) -> Self {
        SoloEvent::PlaybackStateChanged {
            track,
            state,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// One-to-many event broadcaster
///
/// Thin wrapper over `tokio::sync::broadcast`. Cloning yields another sender
/// onto the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SoloEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Slow subscribers that fall more than `capacity` events behind lose the
    /// oldest events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SoloEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SoloEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<SoloEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SoloEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            tracing::trace!("No subscribers for {} event", event.event_type());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(10);
        let event = SoloEvent::state_changed(TrackId::from("a.mp3"), PlaybackState::Playing);
        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_eventbus_clone_shares_channel() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let sender = bus.clone();

        sender.emit_lossy(SoloEvent::TrackEnded {
            track: TrackId::from("a.mp3"),
            timestamp: chrono::Utc::now(),
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "TrackEnded");
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SoloEvent::state_changed(TrackId::from("song1.mp3"), PlaybackState::Paused);
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "PlaybackStateChanged");
        assert_eq!(json["track"], "song1.mp3");
        assert_eq!(json["state"], "paused");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::Idle.to_string(), "idle");
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
        assert_eq!(PlaybackState::Paused.to_string(), "paused");
    }
}
