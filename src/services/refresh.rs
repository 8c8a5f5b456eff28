use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::models::Projection;
use crate::services::appointments::AppointmentStore;
use crate::services::projection;
use crate::state::AppState;

pub fn lock_store(state: &AppState) -> MutexGuard<'_, AppointmentStore> {
    state.store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Recompute the view and hand it to render subscribers.
pub fn publish_view(state: &AppState, store: &AppointmentStore) -> Projection {
    let view = projection::current_view(store);
    // Broadcast to SSE subscribers; ignore if no receivers
    let _ = state.view_tx.send(view.clone());
    view
}

/// One periodic tick: sweep expired records, then refresh the view.
pub fn tick(state: &AppState) -> usize {
    let mut store = lock_store(state);
    let now = store.now();
    let removed = store.sweep_expired(now);
    publish_view(state, &store);
    removed
}

pub fn spawn_sweeper(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // A late tick is dropped rather than replayed in a burst.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let removed = tick(&state);
            if removed > 0 {
                tracing::debug!(removed, "sweeper tick removed appointments");
            }
        }
    })
}
