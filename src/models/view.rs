use serde::Serialize;

use super::Appointment;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Warning {
    None,
    Today,
    StartingSoon,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub hours_until: f64,
    pub is_starting_soon: bool,
    pub is_today: bool,
    pub warning: Warning,
}

/// Time left before a completed appointment is swept.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedEntry {
    #[serde(flatten)]
    pub appointment: Appointment,
    /// `None` for records completed without a timestamp; those are never swept.
    pub deletes_in: Option<Countdown>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub upcoming_count: usize,
    pub completed_today_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub upcoming: Vec<UpcomingEntry>,
    pub completed: Vec<CompletedEntry>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Greeting {
    Morning,
    Afternoon,
    Evening,
}
