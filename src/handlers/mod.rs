pub mod appointments;
pub mod calendar;
pub mod events;
pub mod health;
pub mod view;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route(
            "/api/appointments/:id/toggle",
            post(appointments::toggle_appointment),
        )
        .route(
            "/api/appointments/:id/google-calendar",
            get(calendar::google_calendar_link),
        )
        .route("/api/view", get(view::get_view))
        .route(
            "/api/profile",
            get(view::get_profile).post(view::update_profile),
        )
        .route("/api/events", get(events::events_stream))
        .route("/calendar/:id", get(calendar::download_ics))
        .with_state(state)
}
