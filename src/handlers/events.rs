use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::services::projection;
use crate::services::refresh::lock_store;
use crate::state::AppState;

fn json_event<T: serde::Serialize>(name: &str, value: &T) -> Event {
    let data = serde_json::to_string(value).unwrap_or_default();
    Event::default().data(data).event(name)
}

// GET /api/events — SSE stream of notifications and view refreshes
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before snapshotting so nothing published in between is lost.
    let notifications_rx = state.notifications_tx.subscribe();
    let view_rx = state.view_tx.subscribe();

    let (initial, load_notification) = {
        let store = lock_store(&state);
        (
            projection::current_view(&store),
            store.load_notification().cloned(),
        )
    };
    // A failed startup load was announced before anyone could be listening.
    let mut initial_events = vec![Ok::<_, Infallible>(json_event("view", &initial))];
    if let Some(n) = load_notification {
        initial_events.push(Ok(json_event("notification", &n)));
    }
    let initial_stream = tokio_stream::iter(initial_events);

    let notification_stream =
        BroadcastStream::new(notifications_rx).filter_map(|result| match result {
            Ok(n) => Some(Ok(json_event("notification", &n))),
            Err(BroadcastStreamRecvError::Lagged(_)) => None,
        });

    let view_stream = BroadcastStream::new(view_rx).filter_map(|result| match result {
        Ok(view) => Some(Ok(json_event("view", &view))),
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive_stream = StreamExt::map(
        IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let live = StreamExt::merge(notification_stream, view_stream);
    let combined = initial_stream.chain(live);
    Sse::new(StreamExt::merge(combined, keepalive_stream))
}
