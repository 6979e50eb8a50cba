//! Server-Sent Events stream of coordinator transitions
//!
//! A new client first receives a `Snapshot` frame describing the current
//! track, so toggles can render correctly before any transition happens.
//! After that every [`SoloEvent`] becomes one frame named after its variant.

use crate::api::AppContext;
use crate::playback::PlaybackSnapshot;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use solo_common::SoloEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before the snapshot so no transition falls between the two
    let live = BroadcastStream::new(ctx.events.subscribe());
    let snapshot = match ctx.player.snapshot().await {
        Ok(snapshot) => snapshot_frame(&snapshot),
        Err(e) => {
            warn!("No snapshot for new SSE client: {}", e);
            None
        }
    };
    debug!(
        "SSE client connected ({} subscribers)",
        ctx.events.subscriber_count()
    );

    let live = live.filter_map(|received| {
        std::future::ready(match received {
            Ok(event) => event_frame(&event),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("SSE client fell behind, {} events dropped", missed);
                None
            }
        })
    });

    let frames = stream::iter(snapshot)
        .chain(live)
        .map(Ok::<Event, Infallible>);

    Sse::new(frames).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

fn event_frame(event: &SoloEvent) -> Option<Event> {
    Event::default()
        .event(event.event_type())
        .json_data(event)
        .map_err(|e| warn!("Failed to serialize {} event: {}", event.event_type(), e))
        .ok()
}

fn snapshot_frame(snapshot: &PlaybackSnapshot) -> Option<Event> {
    Event::default()
        .event("Snapshot")
        .json_data(snapshot)
        .map_err(|e| warn!("Failed to serialize snapshot: {}", e))
        .ok()
}
