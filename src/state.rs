use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::models::{Notification, Projection};
use crate::services::appointments::AppointmentStore;

pub struct AppState {
    pub store: Mutex<AppointmentStore>,
    pub notifications_tx: broadcast::Sender<Notification>,
    pub view_tx: broadcast::Sender<Projection>,
}

impl AppState {
    pub fn new(
        store: AppointmentStore,
        notifications_tx: broadcast::Sender<Notification>,
        view_tx: broadcast::Sender<Projection>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            notifications_tx,
            view_tx,
        }
    }
}
