use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::errors::AppError;
use crate::models::{Appointment, AppointmentDraft};
use crate::services::refresh::{lock_store, publish_view};
use crate::state::AppState;

// GET /api/appointments
pub async fn list_appointments(State(state): State<Arc<AppState>>) -> Json<Vec<Appointment>> {
    let store = lock_store(&state);
    Json(store.list().to_vec())
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Appointment>, AppError> {
    let store = lock_store(&state);
    Ok(Json(store.get(id)?))
}

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let mut store = lock_store(&state);
    let created = store.create(&draft)?;
    publish_view(&state, &store);
    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /api/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<Json<Appointment>, AppError> {
    let mut store = lock_store(&state);
    let updated = store.update(id, &draft)?;
    publish_view(&state, &store);
    Ok(Json(updated))
}

// POST /api/appointments/:id/toggle
pub async fn toggle_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Appointment>, AppError> {
    let mut store = lock_store(&state);
    let toggled = store.toggle_complete(id)?;
    publish_view(&state, &store);
    Ok(Json(toggled))
}

// DELETE /api/appointments/:id
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let mut store = lock_store(&state);
    store.delete(id)?;
    publish_view(&state, &store);
    Ok(StatusCode::NO_CONTENT)
}
