//! End-to-end playback with the silent backend
//!
//! Files here are not real audio, so every track runs for the fallback
//! duration.

use solo_ap::backend::{Library, SilentBackend};
use solo_ap::playback::PlaybackCoordinator;
use solo_ap::{Error, PlayerService};
use solo_common::{EventBus, PlaybackState, SoloEvent, TrackId};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::time::timeout;

fn library_with(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in files {
        std::fs::write(dir.path().join(name), b"not audio").unwrap();
    }
    dir
}

async fn next_ended(rx: &mut broadcast::Receiver<SoloEvent>) -> TrackId {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SoloEvent::TrackEnded { track, .. }) = rx.recv().await {
                break track;
            }
        }
    })
    .await
    .expect("track should end")
}

#[tokio::test]
async fn test_track_plays_to_end() {
    let dir = library_with(&["a.mp3"]);
    let backend = SilentBackend::new(Library::new(dir.path()), Duration::from_millis(100));
    let events = EventBus::new(32);
    let mut rx = events.subscribe();
    let (player, _thread) = PlayerService::spawn(backend, events).unwrap();

    player.play(TrackId::from("a.mp3")).await.unwrap();
    assert!(player.is_playing(TrackId::from("a.mp3")).await.unwrap());

    assert_eq!(next_ended(&mut rx).await, TrackId::from("a.mp3"));
    assert_eq!(
        player.state_of(TrackId::from("a.mp3")).await.unwrap(),
        PlaybackState::Idle
    );
}

#[tokio::test]
async fn test_superseded_track_never_ends() {
    let dir = library_with(&["a.mp3", "b.mp3"]);
    let backend = SilentBackend::new(Library::new(dir.path()), Duration::from_millis(150));
    let events = EventBus::new(32);
    let mut rx = events.subscribe();
    let (player, _thread) = PlayerService::spawn(backend, events).unwrap();

    player.play(TrackId::from("a.mp3")).await.unwrap();
    player.play(TrackId::from("b.mp3")).await.unwrap();

    // Only the track that was left playing finishes
    assert_eq!(next_ended(&mut rx).await, TrackId::from("b.mp3"));
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = library_with(&[]);
    let backend = SilentBackend::new(Library::new(dir.path()), Duration::from_millis(100));
    let (player, _thread) = PlayerService::spawn(backend, EventBus::new(8)).unwrap();

    assert!(matches!(
        player.play(TrackId::from("nope.mp3")).await,
        Err(Error::TrackNotFound(_))
    ));
    assert_eq!(player.snapshot().await.unwrap().current, None);
}

#[test]
fn test_replay_right_after_track_ran_out() {
    let dir = library_with(&["a.mp3"]);
    let backend = SilentBackend::new(Library::new(dir.path()), Duration::from_millis(30));
    // End notifications are dropped, as if still queued behind the replay
    let mut coordinator = PlaybackCoordinator::new(backend, EventBus::new(8), |_| {});
    let a = TrackId::from("a.mp3");

    coordinator.play(a.clone()).unwrap();
    let first = coordinator.snapshot().handle_id;
    std::thread::sleep(Duration::from_millis(200));

    coordinator.play(a.clone()).unwrap();
    assert!(coordinator.is_playing(&a));
    assert_ne!(coordinator.snapshot().handle_id, first);
}
