//! Playback service: the coordinator's single thread of control
//!
//! The coordinator lives on a dedicated thread and is driven by commands from
//! one unbounded channel. Caller requests and end-of-media notifications from
//! backend workers share that channel, so every state transition is applied
//! in the order its trigger arrived. Backend calls may block (file probing,
//! device setup) without stalling the async runtime.
//!
//! [`PlayerHandle`] is the cloneable async client handed to the HTTP layer.

use super::coordinator::{PlaybackCoordinator, PlaybackSnapshot};
use crate::backend::MediaBackend;
use crate::error::{Error, Result};
use solo_common::{EventBus, HandleId, PlaybackState, TrackId};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Requests processed by the service thread
#[derive(Debug)]
pub enum PlayerCommand {
    Play {
        track: TrackId,
        reply: oneshot::Sender<Result<PlaybackSnapshot>>,
    },
    Pause {
        reply: oneshot::Sender<PlaybackSnapshot>,
    },
    Toggle {
        track: TrackId,
        reply: oneshot::Sender<Result<PlaybackState>>,
    },
    IsPlaying {
        track: TrackId,
        reply: oneshot::Sender<bool>,
    },
    StateOf {
        track: TrackId,
        reply: oneshot::Sender<PlaybackState>,
    },
    Snapshot {
        reply: oneshot::Sender<PlaybackSnapshot>,
    },
    /// A backend handle finished playing naturally
    MediaEnded(HandleId),
    Shutdown,
}

pub struct PlayerService;

impl PlayerService {
    /// Start the service thread around a new coordinator
    ///
    /// The thread exits on [`PlayerHandle::shutdown`] or once every
    /// `PlayerHandle` is dropped, releasing any active handle.
    pub fn spawn<B>(backend: B, events: EventBus) -> Result<(PlayerHandle, JoinHandle<()>)>
    where
        B: MediaBackend + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        // Weak so pending end notifications do not keep the service alive
        let ended_tx = tx.downgrade();
        let on_ended = move |handle_id: HandleId| {
            if let Some(tx) = ended_tx.upgrade() {
                let _ = tx.send(PlayerCommand::MediaEnded(handle_id));
            }
        };

        let coordinator = PlaybackCoordinator::new(backend, events, on_ended);
        let thread = std::thread::Builder::new()
            .name("solo-coordinator".to_string())
            .spawn(move || run(coordinator, rx))?;

        Ok((PlayerHandle { tx }, thread))
    }
}

fn run<B: MediaBackend>(
    mut coordinator: PlaybackCoordinator<B>,
    mut rx: mpsc::UnboundedReceiver<PlayerCommand>,
) {
    info!(
        "Playback service started ({} backend)",
        coordinator.backend().name()
    );

    while let Some(command) = rx.blocking_recv() {
        // Dropped reply receivers mean the caller gave up; nothing to do
        match command {
            PlayerCommand::Play { track, reply } => {
                let result = coordinator.play(track).map(|_| coordinator.snapshot());
                let _ = reply.send(result);
            }
            PlayerCommand::Pause { reply } => {
                coordinator.pause();
                let _ = reply.send(coordinator.snapshot());
            }
            PlayerCommand::Toggle { track, reply } => {
                let result = coordinator
                    .toggle(track.clone())
                    .map(|_| coordinator.state_of(&track));
                let _ = reply.send(result);
            }
            PlayerCommand::IsPlaying { track, reply } => {
                let _ = reply.send(coordinator.is_playing(&track));
            }
            PlayerCommand::StateOf { track, reply } => {
                let _ = reply.send(coordinator.state_of(&track));
            }
            PlayerCommand::Snapshot { reply } => {
                let _ = reply.send(coordinator.snapshot());
            }
            PlayerCommand::MediaEnded(handle_id) => {
                coordinator.media_ended(handle_id);
            }
            PlayerCommand::Shutdown => {
                debug!("Shutdown requested");
                break;
            }
        }
    }

    coordinator.stop_all();
    info!("Playback service stopped");
}

/// Async client for the playback service
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    pub async fn play(&self, track: TrackId) -> Result<PlaybackSnapshot> {
        self.request(|reply| PlayerCommand::Play { track, reply })
            .await?
    }

    pub async fn pause(&self) -> Result<PlaybackSnapshot> {
        self.request(|reply| PlayerCommand::Pause { reply }).await
    }

    /// Pause `track` if it is playing, play it otherwise, as one step
    ///
    /// Returns the state of `track` afterwards.
    pub async fn toggle(&self, track: TrackId) -> Result<PlaybackState> {
        self.request(|reply| PlayerCommand::Toggle { track, reply })
            .await?
    }

    pub async fn is_playing(&self, track: TrackId) -> Result<bool> {
        self.request(|reply| PlayerCommand::IsPlaying { track, reply })
            .await
    }

    pub async fn state_of(&self, track: TrackId) -> Result<PlaybackState> {
        self.request(|reply| PlayerCommand::StateOf { track, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
        self.request(|reply| PlayerCommand::Snapshot { reply }).await
    }

    /// Ask the service thread to release playback and exit
    pub fn shutdown(&self) {
        let _ = self.tx.send(PlayerCommand::Shutdown);
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> PlayerCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| Error::ServiceStopped)?;
        response.await.map_err(|_| Error::ServiceStopped)
    }
}
