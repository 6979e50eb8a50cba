//! Scripted media backend
//!
//! Handles make no sound; they only record calls and track whether they
//! would be sounding. Track ids starting with `missing` fail to start, ids
//! starting with `fragile` start but fail to resume.
//!
//! End-of-media signals are held until a test fires them with
//! [`FakeMonitor::finish`]. A finished handle refuses to resume, like a worker
//! that has exited.

use solo_ap::backend::{EndedSignal, MediaBackend, MediaHandle};
use solo_ap::{Error, Result};
use solo_common::{HandleId, TrackId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Start(String),
    Stop(String),
    Resume(String),
    Release(String),
}

#[derive(Default)]
struct Shared {
    calls: Vec<BackendCall>,
    /// Live handles and whether each is sounding
    sounding: HashMap<HandleId, bool>,
    max_sounding: usize,
    /// Unfired end signals, oldest first
    pending_ends: Vec<(TrackId, EndedSignal)>,
    finished: HashSet<HandleId>,
}

impl Shared {
    fn set_sounding(&mut self, handle_id: HandleId, sounding: bool) {
        self.sounding.insert(handle_id, sounding);
        let now = self.sounding.values().filter(|s| **s).count();
        self.max_sounding = self.max_sounding.max(now);
    }
}

pub struct FakeBackend {
    shared: Arc<Mutex<Shared>>,
}

impl FakeBackend {
    pub fn new() -> (Self, FakeMonitor) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            FakeMonitor { shared },
        )
    }
}

impl MediaBackend for FakeBackend {
    fn start(&mut self, track: &TrackId, on_ended: EndedSignal) -> Result<Box<dyn MediaHandle>> {
        let mut shared = lock(&self.shared);
        shared.calls.push(BackendCall::Start(track.to_string()));

        if track.as_str().starts_with("missing") {
            return Err(Error::TrackNotFound(track.to_string()));
        }

        let handle_id = on_ended.handle_id();
        shared.set_sounding(handle_id, true);
        shared.pending_ends.push((track.clone(), on_ended));

        Ok(Box::new(FakeHandle {
            track: track.to_string(),
            handle_id,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeHandle {
    track: String,
    handle_id: HandleId,
    shared: Arc<Mutex<Shared>>,
}

impl MediaHandle for FakeHandle {
    fn resume(&mut self) -> Result<()> {
        let mut shared = lock(&self.shared);
        shared.calls.push(BackendCall::Resume(self.track.clone()));
        if shared.finished.contains(&self.handle_id) {
            return Err(Error::HandleFinished);
        }
        if self.track.starts_with("fragile") {
            return Err(Error::AudioOutput("device went away".to_string()));
        }
        shared.set_sounding(self.handle_id, true);
        Ok(())
    }

    fn stop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.calls.push(BackendCall::Stop(self.track.clone()));
        shared.set_sounding(self.handle_id, false);
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.calls.push(BackendCall::Release(self.track.clone()));
        shared.sounding.remove(&self.handle_id);
    }
}

/// Inspection side of a [`FakeBackend`]
#[derive(Clone)]
pub struct FakeMonitor {
    shared: Arc<Mutex<Shared>>,
}

impl FakeMonitor {
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.shared).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.shared).calls.clear();
    }

    /// Number of handles ever constructed for `track`
    pub fn starts_of(&self, track: &str) -> usize {
        lock(&self.shared)
            .calls
            .iter()
            .filter(|call| **call == BackendCall::Start(track.to_string()))
            .count()
    }

    pub fn live_handles(&self) -> usize {
        lock(&self.shared).sounding.len()
    }

    pub fn sounding_now(&self) -> usize {
        lock(&self.shared).sounding.values().filter(|s| **s).count()
    }

    /// Most handles ever sounding at the same moment
    pub fn max_sounding(&self) -> usize {
        lock(&self.shared).max_sounding
    }

    /// Fire the most recent end signal for `track`, as if its media ran out
    ///
    /// Returns the id of the handle that "finished", or None if no signal is
    /// pending for `track`.
    pub fn finish(&self, track: &str) -> Option<HandleId> {
        let signal = {
            let mut shared = lock(&self.shared);
            let index = shared
                .pending_ends
                .iter()
                .rposition(|(t, _)| t.as_str() == track)?;
            let signal = shared.pending_ends.remove(index).1;
            shared.finished.insert(signal.handle_id());
            if let Some(sounding) = shared.sounding.get_mut(&signal.handle_id()) {
                *sounding = false;
            }
            signal
        };
        // Fired outside the lock: the callback may re-enter the backend
        let handle_id = signal.handle_id();
        signal.fire();
        Some(handle_id)
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
