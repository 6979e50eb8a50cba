//! Headless backend
//!
//! Produces no audio. Each handle counts down the track's duration while
//! playing and fires its end signal when the countdown reaches zero, so the
//! service behaves like a real player on machines without an output device.

use super::decode::probe_duration;
use super::{Control, EndedSignal, Library, MediaBackend, MediaHandle, WorkerHandle};
use crate::error::Result;
use solo_common::TrackId;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Backend that times playback instead of producing sound
pub struct SilentBackend {
    library: Library,
    fallback: Duration,
}

impl SilentBackend {
    /// `fallback` is used when a track's duration cannot be probed
    pub fn new(library: Library, fallback: Duration) -> Self {
        Self { library, fallback }
    }

    fn duration_of(&self, track: &TrackId) -> Result<Duration> {
        let path = self.library.resolve(track)?;
        match probe_duration(&path) {
            Ok(Some(duration)) => Ok(duration),
            Ok(None) => {
                debug!("{} has no recorded duration, using fallback", track);
                Ok(self.fallback)
            }
            Err(e) => {
                debug!("Could not probe {} ({}), using fallback", track, e);
                Ok(self.fallback)
            }
        }
    }
}

impl MediaBackend for SilentBackend {
    fn start(&mut self, track: &TrackId, on_ended: EndedSignal) -> Result<Box<dyn MediaHandle>> {
        let duration = self.duration_of(track)?;
        let (ctl_tx, ctl_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name(format!("solo-silent-{}", on_ended.handle_id()))
            .spawn(move || countdown(duration, ctl_rx, on_ended))?;

        info!("Started {} silently ({:.1}s)", track, duration.as_secs_f64());
        Ok(Box::new(WorkerHandle::new(track.to_string(), ctl_tx, worker)))
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// Count down playing time; paused time does not count
fn countdown(duration: Duration, ctl_rx: mpsc::Receiver<Control>, on_ended: EndedSignal) {
    let mut remaining = duration;
    let mut playing = true;

    loop {
        if !playing {
            match ctl_rx.recv() {
                Ok(Control::Resume) => playing = true,
                Ok(Control::Stop(ack)) => {
                    let _ = ack.send(());
                }
                Ok(Control::Release) | Err(_) => return,
            }
            continue;
        }

        let started = Instant::now();
        match ctl_rx.recv_timeout(remaining) {
            Ok(Control::Resume) => {
                remaining = remaining.saturating_sub(started.elapsed());
            }
            Ok(Control::Stop(ack)) => {
                remaining = remaining.saturating_sub(started.elapsed());
                playing = false;
                let _ = ack.send(());
            }
            Ok(Control::Release) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                on_ended.fire();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use solo_common::HandleId;
    use std::sync::Arc;

    fn signal() -> (EndedSignal, mpsc::Receiver<HandleId>) {
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let notify = Arc::new(move |id: HandleId| {
            let _ = tx.lock().unwrap().send(id);
        });
        (EndedSignal::new(HandleId::new(), notify), rx)
    }

    #[test]
    fn test_countdown_fires_after_duration() {
        let (on_ended, ended_rx) = signal();
        let expected = on_ended.handle_id();
        let (_ctl_tx, ctl_rx) = mpsc::channel();

        let worker = thread::spawn(move || countdown(Duration::from_millis(20), ctl_rx, on_ended));

        let fired = ended_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, expected);
        worker.join().unwrap();
    }

    #[test]
    fn test_paused_countdown_does_not_fire() {
        let (on_ended, ended_rx) = signal();
        let (ctl_tx, ctl_rx) = mpsc::channel();

        let worker = thread::spawn(move || countdown(Duration::from_millis(100), ctl_rx, on_ended));

        let (ack_tx, ack_rx) = mpsc::channel();
        ctl_tx.send(Control::Stop(ack_tx)).unwrap();
        ack_rx.recv().unwrap();

        assert!(ended_rx.recv_timeout(Duration::from_millis(250)).is_err());

        ctl_tx.send(Control::Resume).unwrap();
        assert!(ended_rx.recv_timeout(Duration::from_secs(2)).is_ok());
        worker.join().unwrap();
    }

    #[test]
    fn test_released_countdown_never_fires() {
        let (on_ended, ended_rx) = signal();
        let (ctl_tx, ctl_rx) = mpsc::channel();

        let worker = thread::spawn(move || countdown(Duration::from_millis(50), ctl_rx, on_ended));
        ctl_tx.send(Control::Release).unwrap();
        worker.join().unwrap();

        assert!(ended_rx.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn test_start_uses_fallback_for_unprobeable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp3"), b"not audio").unwrap();

        let mut backend = SilentBackend::new(Library::new(dir.path()), Duration::from_millis(30));
        let (on_ended, ended_rx) = signal();

        let _handle = backend.start(&TrackId::from("clip.mp3"), on_ended).unwrap();
        assert!(ended_rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_resume_after_end_reports_finished() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp3"), b"not audio").unwrap();

        let mut backend = SilentBackend::new(Library::new(dir.path()), Duration::from_millis(20));
        let (on_ended, ended_rx) = signal();
        let mut handle = backend.start(&TrackId::from("clip.mp3"), on_ended).unwrap();
        ended_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        // The worker exits just after firing
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match handle.resume() {
                Err(Error::HandleFinished) => break,
                Ok(()) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                other => panic!("expected HandleFinished, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_start_missing_track_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = SilentBackend::new(Library::new(dir.path()), Duration::from_secs(1));
        let (on_ended, _ended_rx) = signal();

        assert!(backend.start(&TrackId::from("missing.mp3"), on_ended).is_err());
    }
}
