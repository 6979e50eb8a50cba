//! Single-active-track playback coordinator
//!
//! Owns at most one media handle. Playing a track stops whatever was
//! playing first; playing a different track releases the old handle before
//! the new one is started, so two handles never produce sound at once.
//!
//! The coordinator is a plain `&mut self` state machine. It is meant to live
//! on one thread (see [`super::service`]) and is never shared directly.

use crate::backend::{EndedCallback, EndedSignal, MediaBackend, MediaHandle};
use crate::error::{Error, Result};
use serde::Serialize;
use solo_common::{EventBus, HandleId, PlaybackState, SoloEvent, TrackId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The current track and the handle playing it
struct ActiveTrack {
    track: TrackId,
    handle_id: HandleId,
    media: Box<dyn MediaHandle>,
}

/// Point-in-time view of coordinator state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub current: Option<TrackId>,
    pub paused: bool,
    pub playing: bool,
    pub handle_id: Option<HandleId>,
}

pub struct PlaybackCoordinator<B: MediaBackend> {
    backend: B,
    events: EventBus,
    on_ended: EndedCallback,
    /// Holding the track and its handle together keeps "handle present iff
    /// current track present" true by construction
    active: Option<ActiveTrack>,
    paused: bool,
}

impl<B: MediaBackend> PlaybackCoordinator<B> {
    /// `on_ended` receives the handle id of every naturally finished handle;
    /// the owner must route it back into [`Self::media_ended`]
    pub fn new<F>(backend: B, events: EventBus, on_ended: F) -> Self
    where
        F: Fn(HandleId) + Send + Sync + 'static,
    {
        Self {
            backend,
            events,
            on_ended: Arc::new(on_ended),
            active: None,
            paused: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Play `track`, resuming it if it is already the current track
    ///
    /// On a failed start the previous handle is already gone and no track is
    /// current. On a failed resume the track stays current but paused. A
    /// current track whose handle already ran out is started afresh.
    pub fn play(&mut self, track: TrackId) -> Result<()> {
        // Always silence whatever is active before switching or resuming
        if let Some(active) = self.active.as_mut() {
            active.media.stop();
        }

        if let Some(active) = self.active.as_mut().filter(|active| active.track == track) {
            match active.media.resume() {
                Ok(()) => {
                    if std::mem::replace(&mut self.paused, false) {
                        info!("Resumed {}", track);
                        self.events.emit_lossy(SoloEvent::TrackResumed {
                            track: track.clone(),
                            timestamp: chrono::Utc::now(),
                        });
                        self.emit_state(&track, PlaybackState::Playing);
                    } else {
                        debug!("{} already playing", track);
                    }
                    return Ok(());
                }
                // Ended ahead of its notification; that notification is now stale
                Err(Error::HandleFinished) => self.finish_active(),
                Err(e) => {
                    warn!("Failed to resume {}: {}", track, e);
                    if !self.paused {
                        self.paused = true;
                        self.emit_state(&track, PlaybackState::Paused);
                    }
                    return Err(e);
                }
            }
        }

        if let Some(previous) = self.active.take() {
            info!("Superseding {} with {}", previous.track, track);
            drop(previous.media);
            self.events.emit_lossy(SoloEvent::TrackSuperseded {
                track: previous.track.clone(),
                by: track.clone(),
                timestamp: chrono::Utc::now(),
            });
            self.emit_state(&previous.track, PlaybackState::Idle);
        }
        self.paused = false;

        let handle_id = HandleId::new();
        let signal = EndedSignal::new(handle_id, Arc::clone(&self.on_ended));
        let media = match self.backend.start(&track, signal) {
            Ok(media) => media,
            Err(e) => {
                warn!("Failed to start {}: {}", track, e);
                return Err(e);
            }
        };

        info!("Started {} (handle {})", track, handle_id);
        self.active = Some(ActiveTrack {
            track: track.clone(),
            handle_id,
            media,
        });
        self.events.emit_lossy(SoloEvent::TrackStarted {
            track: track.clone(),
            handle_id,
            timestamp: chrono::Utc::now(),
        });
        self.emit_state(&track, PlaybackState::Playing);
        Ok(())
    }

    /// Stop the active handle, keeping it for a cheap resume
    pub fn pause(&mut self) {
        let was_paused = std::mem::replace(&mut self.paused, true);

        let Some(active) = self.active.as_mut() else {
            debug!("Pause with no active track");
            return;
        };
        active.media.stop();

        if !was_paused {
            info!("Paused {}", active.track);
            let track = active.track.clone();
            self.events.emit_lossy(SoloEvent::TrackPaused {
                track: track.clone(),
                timestamp: chrono::Utc::now(),
            });
            self.emit_state(&track, PlaybackState::Paused);
        }
    }

    /// True iff `track` is the current track and it is not paused
    pub fn is_playing(&self, track: &TrackId) -> bool {
        !self.paused && self.current() == Some(track)
    }

    /// `pause()` if `track` is playing, otherwise `play(track)`
    ///
    /// Returns whether `track` is playing afterwards.
    pub fn toggle(&mut self, track: TrackId) -> Result<bool> {
        if self.is_playing(&track) {
            self.pause();
            Ok(false)
        } else {
            self.play(track.clone())?;
            Ok(self.is_playing(&track))
        }
    }

    /// Apply an end-of-media notification
    ///
    /// Returns false (and changes nothing) when `handle_id` is not the active
    /// handle, e.g. a late notification from a superseded handle.
    pub fn media_ended(&mut self, handle_id: HandleId) -> bool {
        match self.active.as_ref() {
            Some(active) if active.handle_id == handle_id => {}
            _ => {
                debug!("Ignoring end notification for inactive handle {}", handle_id);
                return false;
            }
        }

        self.finish_active();
        true
    }

    /// Release the active handle as having played to its end
    fn finish_active(&mut self) {
        let Some(finished) = self.active.take() else {
            return;
        };
        drop(finished.media);
        self.paused = false;

        info!("{} finished", finished.track);
        self.events.emit_lossy(SoloEvent::TrackEnded {
            track: finished.track.clone(),
            timestamp: chrono::Utc::now(),
        });
        self.emit_state(&finished.track, PlaybackState::Idle);
    }

    /// Release the active handle and forget all state
    pub fn stop_all(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Releasing {}", active.track);
            drop(active.media);
            self.emit_state(&active.track, PlaybackState::Idle);
        }
        self.paused = false;
    }

    pub fn current(&self) -> Option<&TrackId> {
        self.active.as_ref().map(|active| &active.track)
    }

    /// State of `track` as a toggle control would render it
    pub fn state_of(&self, track: &TrackId) -> PlaybackState {
        match self.current() {
            Some(current) if current == track && self.paused => PlaybackState::Paused,
            Some(current) if current == track => PlaybackState::Playing,
            _ => PlaybackState::Idle,
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current: self.current().cloned(),
            paused: self.paused,
            playing: self.active.is_some() && !self.paused,
            handle_id: self.active.as_ref().map(|active| active.handle_id),
        }
    }

    fn emit_state(&self, track: &TrackId, state: PlaybackState) {
        self.events
            .emit_lossy(SoloEvent::state_changed(track.clone(), state));
    }
}
