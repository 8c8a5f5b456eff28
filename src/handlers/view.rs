use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Greeting, Notification, Projection};
use crate::services::projection;
use crate::services::refresh::lock_store;
use crate::state::AppState;

// GET /api/view
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    greeting: Greeting,
    display_name: Option<String>,
    /// Set when the saved appointments could not be loaded at startup.
    load_notification: Option<Notification>,
    #[serde(flatten)]
    view: Projection,
}

pub async fn get_view(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    let store = lock_store(&state);
    let now = store.now().with_timezone(&Local);

    Json(ViewResponse {
        greeting: projection::greeting(&now),
        display_name: store.display_name(),
        load_notification: store.load_notification().cloned(),
        view: projection::project(store.list(), &now),
    })
}

// GET /api/profile
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub display_name: Option<String>,
}

pub async fn get_profile(State(state): State<Arc<AppState>>) -> Json<Profile> {
    let store = lock_store(&state);
    Json(Profile {
        display_name: store.display_name(),
    })
}

// POST /api/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Profile>,
) -> Result<Json<Profile>, AppError> {
    let mut store = lock_store(&state);
    let name = store.set_display_name(body.display_name.as_deref().unwrap_or(""))?;
    Ok(Json(Profile {
        display_name: Some(name),
    }))
}
