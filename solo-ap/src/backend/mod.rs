//! Media backends
//!
//! The coordinator never decodes or touches an output device itself. It asks a
//! [`MediaBackend`] to start a track and receives an owned [`MediaHandle`]
//! back; dropping the handle releases it.
//!
//! Construct, start and end-of-media registration happen in one call
//! ([`MediaBackend::start`]) so there is no window where a handle is playing
//! without its completion signal wired up.

pub mod decode;
pub mod device;
pub mod library;
pub mod resample;
pub mod silent;

use crate::config::Config;
use crate::error::{Error, Result};
use solo_common::config::BackendKind;
use solo_common::{HandleId, TrackId};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

pub use device::DeviceBackend;
pub use library::Library;
pub use silent::SilentBackend;

/// Callback invoked with the id of a handle that finished naturally
pub type EndedCallback = Arc<dyn Fn(HandleId) + Send + Sync>;

/// One-shot end-of-media notifier handed to a backend with each start
pub struct EndedSignal {
    handle_id: HandleId,
    notify: EndedCallback,
}

impl EndedSignal {
    pub fn new(handle_id: HandleId, notify: EndedCallback) -> Self {
        Self { handle_id, notify }
    }

    pub fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    /// Report that the media finished playing
    pub fn fire(self) {
        debug!("Media ended for handle {}", self.handle_id);
        (self.notify)(self.handle_id);
    }
}

impl std::fmt::Debug for EndedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndedSignal")
            .field("handle_id", &self.handle_id)
            .finish()
    }
}

/// An owned, started playable resource
///
/// Dropping the handle releases it; a released handle never produces sound
/// and never fires its end signal.
pub trait MediaHandle: Send {
    /// Continue playback from where `stop` left it
    ///
    /// Returns [`Error::HandleFinished`] once the media has played to its
    /// end, even if the end notification has not been applied yet.
    fn resume(&mut self) -> Result<()>;

    /// Halt output; returns once the handle is silent
    fn stop(&mut self);
}

/// Capability to construct playable handles
pub trait MediaBackend: Send {
    /// Construct a handle for `track`, start it, and arrange for `on_ended` to
    /// fire when it finishes naturally
    fn start(&mut self, track: &TrackId, on_ended: EndedSignal) -> Result<Box<dyn MediaHandle>>;

    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn start(&mut self, track: &TrackId, on_ended: EndedSignal) -> Result<Box<dyn MediaHandle>> {
        (**self).start(track, on_ended)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Build the backend selected by configuration
pub fn build_backend(config: &Config) -> Box<dyn MediaBackend> {
    let library = Library::new(config.library_root.clone());
    match config.backend {
        BackendKind::Device => Box::new(DeviceBackend::new(library, config.device.clone())),
        BackendKind::Silent => Box::new(SilentBackend::new(library, config.silent_fallback)),
    }
}

/// Control messages from a handle to its playback worker thread
#[derive(Debug)]
pub(crate) enum Control {
    Resume,
    /// Pause output, then acknowledge
    Stop(mpsc::Sender<()>),
    Release,
}

/// Handle backed by a dedicated playback worker thread
///
/// Shared by the device and silent backends: the worker owns the media state
/// and this side only sends [`Control`] messages.
pub(crate) struct WorkerHandle {
    label: String,
    ctl_tx: mpsc::Sender<Control>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(label: String, ctl_tx: mpsc::Sender<Control>, worker: JoinHandle<()>) -> Self {
        Self {
            label,
            ctl_tx,
            worker: Some(worker),
        }
    }
}

impl MediaHandle for WorkerHandle {
    fn resume(&mut self) -> Result<()> {
        // Workers only exit on their own after firing the end signal
        self.ctl_tx.send(Control::Resume).map_err(|_| {
            debug!("Playback worker for {} has already finished", self.label);
            Error::HandleFinished
        })
    }

    fn stop(&mut self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.ctl_tx.send(Control::Stop(ack_tx)).is_ok() {
            // Err means the worker finished on its own, which is silent too
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.ctl_tx.send(Control::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Playback worker for {} panicked", self.label);
            }
        }
        debug!("Released handle for {}", self.label);
    }
}
