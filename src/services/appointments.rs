use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::errors::{PersistenceError, StoreError};
use crate::models::{Appointment, AppointmentDraft, Notification};
use crate::services::clock::Clock;
use crate::services::storage::KeyValueStore;

pub const APPOINTMENTS_KEY: &str = "nokeys_appointments";
pub const USERNAME_KEY: &str = "nokeys_username";
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// Completed appointments are swept once they have been completed this long.
pub const RETENTION_WINDOW_MS: i64 = 5 * 60 * 60 * 1000;

/// Owns the appointment list and every transition on it. Each successful
/// mutation writes the full list back to the key-value store; a failed write
/// is reported but the in-memory list stays authoritative.
pub struct AppointmentStore {
    appointments: Vec<Appointment>,
    backend: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    notifications: broadcast::Sender<Notification>,
    load_error: Option<PersistenceError>,
    load_notification: Option<Notification>,
}

impl AppointmentStore {
    /// Load the stored list, falling back to an empty store if it cannot be
    /// read, then sweep anything that expired while we were away.
    pub fn open(
        backend: Box<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notifications: broadcast::Sender<Notification>,
    ) -> Self {
        let mut store = Self {
            appointments: Vec::new(),
            backend,
            clock,
            notifications,
            load_error: None,
            load_notification: None,
        };

        match store.backend.get(APPOINTMENTS_KEY) {
            Ok(None) => {}
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Appointment>>(&raw) {
                Ok(loaded) => store.appointments = dedup_ids(loaded),
                Err(e) => {
                    tracing::error!(error = %e, "stored appointments are corrupt, starting empty");
                    store.report_load_failure(Notification::error(
                        "Failed to load saved appointments",
                    ));
                    store.load_error = Some(PersistenceError::Parse(e));
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored appointments, starting empty");
                store.report_load_failure(Notification::warning(
                    "Failed to load saved appointments",
                ));
                store.load_error = Some(e);
            }
        }

        tracing::info!(count = store.appointments.len(), "appointment store opened");

        let now = store.clock.now();
        store.sweep_expired(now);
        store
    }

    /// Why the initial load came up empty, if it failed.
    pub fn load_error(&self) -> Option<&PersistenceError> {
        self.load_error.as_ref()
    }

    /// The notification raised by a failed initial load. Kept so clients
    /// that connect after startup still learn the saved data was lost.
    pub fn load_notification(&self) -> Option<&Notification> {
        self.load_notification.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn list(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn get(&self, id: i64) -> Result<Appointment, StoreError> {
        self.appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub fn create(&mut self, draft: &AppointmentDraft) -> Result<Appointment, StoreError> {
        let valid = draft.validate().inspect_err(|_| self.notify_invalid())?;
        let now = self.clock.now();

        let appointment = Appointment {
            id: self.next_id(now),
            customer_name: valid.customer_name,
            phone: valid.phone,
            email: valid.email,
            service: valid.service,
            date: valid.date,
            time: valid.time,
            address: valid.address,
            notes: valid.notes,
            completed: false,
            completed_at: None,
            created_at: now,
        };

        self.appointments.push(appointment.clone());
        tracing::info!(id = appointment.id, "appointment created");
        self.persist();
        self.notify(Notification::success("New appointment created"));
        Ok(appointment)
    }

    /// Replace the editable fields. Completion state and `created_at` are
    /// carried over from the stored record.
    pub fn update(&mut self, id: i64, draft: &AppointmentDraft) -> Result<Appointment, StoreError> {
        let valid = draft.validate().inspect_err(|_| self.notify_invalid())?;
        let index = self.position(id)?;

        let existing = &mut self.appointments[index];
        existing.customer_name = valid.customer_name;
        existing.phone = valid.phone;
        existing.email = valid.email;
        existing.service = valid.service;
        existing.date = valid.date;
        existing.time = valid.time;
        existing.address = valid.address;
        existing.notes = valid.notes;
        let updated = existing.clone();

        tracing::info!(id, "appointment updated");
        self.persist();
        self.notify(Notification::success("Appointment updated"));
        Ok(updated)
    }

    pub fn toggle_complete(&mut self, id: i64) -> Result<Appointment, StoreError> {
        let index = self.position(id)?;
        let now = self.clock.now();

        let apt = &mut self.appointments[index];
        apt.completed = !apt.completed;
        apt.completed_at = apt.completed.then_some(now);
        let toggled = apt.clone();

        tracing::info!(id, completed = toggled.completed, "appointment completion toggled");
        self.persist();
        self.notify(if toggled.completed {
            Notification::success(format!(
                "Appointment with {} marked as done",
                toggled.customer_name
            ))
        } else {
            Notification::info(format!(
                "Appointment with {} marked as active",
                toggled.customer_name
            ))
        });
        Ok(toggled)
    }

    pub fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        let index = self.position(id)?;
        let removed = self.appointments.remove(index);

        tracing::info!(id = removed.id, "appointment deleted");
        self.persist();
        self.notify(Notification::info("Appointment deleted"));
        Ok(())
    }

    /// Drop completed appointments whose retention window has run out.
    /// Records marked completed without a timestamp are kept indefinitely.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.appointments.len();
        self.appointments.retain(|apt| !is_expired(apt, now));
        let removed = before - self.appointments.len();

        if removed > 0 {
            tracing::info!(removed, "swept expired completed appointments");
            self.persist();
        }
        removed
    }

    pub fn display_name(&self) -> Option<String> {
        match self.backend.get(USERNAME_KEY) {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read display name");
                None
            }
        }
    }

    /// Remember the name shown in the greeting. Blank input falls back to
    /// the default name.
    pub fn set_display_name(&mut self, name: &str) -> Result<String, PersistenceError> {
        let name = match name.trim() {
            "" => DEFAULT_DISPLAY_NAME,
            trimmed => trimmed,
        };
        self.backend.set(USERNAME_KEY, name)?;
        Ok(name.to_string())
    }

    fn position(&self, id: i64) -> Result<usize, StoreError> {
        match self.appointments.iter().position(|a| a.id == id) {
            Some(index) => Ok(index),
            None => {
                tracing::warn!(id, "appointment not found");
                self.notify(Notification::warning("Appointment no longer exists"));
                Err(StoreError::NotFound(id))
            }
        }
    }

    fn next_id(&self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        let taken = |id: i64| self.appointments.iter().any(|a| a.id == id);
        if !taken(candidate) {
            return candidate;
        }

        let max = self.appointments.iter().map(|a| a.id).max().unwrap_or(candidate);
        // At i64::MAX there is no room above; take the nearest free id below.
        max.checked_add(1)
            .or_else(|| (i64::MIN..candidate).rev().find(|id| !taken(*id)))
            .unwrap_or(candidate)
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.appointments)
            .map_err(PersistenceError::Serialize)
            .and_then(|payload| self.backend.set(APPOINTMENTS_KEY, &payload));

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to save appointments");
            self.notify(Notification::warning("Failed to save appointments"));
        }
    }

    fn notify_invalid(&self) {
        self.notify(Notification::warning("Please check missing or invalid fields"));
    }

    fn report_load_failure(&mut self, notification: Notification) {
        self.notify(notification.clone());
        self.load_notification = Some(notification);
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.notifications.send(notification);
    }
}

fn is_expired(apt: &Appointment, now: DateTime<Utc>) -> bool {
    match apt.completed_at {
        Some(at) if apt.completed => (now - at).num_milliseconds() >= RETENTION_WINDOW_MS,
        _ => false,
    }
}

fn dedup_ids(loaded: Vec<Appointment>) -> Vec<Appointment> {
    let mut seen = HashSet::new();
    let total = loaded.len();
    let kept: Vec<Appointment> = loaded.into_iter().filter(|a| seen.insert(a.id)).collect();
    if kept.len() < total {
        tracing::warn!(dropped = total - kept.len(), "dropped appointments with duplicate ids");
    }
    kept
}
