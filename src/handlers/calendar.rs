use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::AppError;
use crate::services::calendar::{generate_ics, google_calendar_url};
use crate::services::refresh::lock_store;
use crate::state::AppState;

fn parse_id(raw: &str) -> Option<i64> {
    // Strip .ics suffix if present
    raw.strip_suffix(".ics").unwrap_or(raw).parse().ok()
}

// GET /calendar/:id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&raw_id) else {
        return (StatusCode::NOT_FOUND, "Appointment not found").into_response();
    };

    let appointment = match lock_store(&state).get(id) {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(error = %e, "calendar export for unknown appointment");
            return (StatusCode::NOT_FOUND, "Appointment not found").into_response();
        }
    };

    let ics = generate_ics(&appointment);
    let disposition = format!("attachment; filename=\"appointment-{id}.ics\"");

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, disposition.as_str()),
        ],
        ics,
    )
        .into_response()
}

// GET /api/appointments/:id/google-calendar
pub async fn google_calendar_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let appointment = lock_store(&state).get(id)?;
    Ok(Json(serde_json::json!({ "url": google_calendar_url(&appointment) })))
}
