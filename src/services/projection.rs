use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Timelike, Utc};

use crate::models::{
    Appointment, CompletedEntry, Countdown, Greeting, Projection, Stats, UpcomingEntry, Warning,
};
use crate::services::appointments::{AppointmentStore, RETENTION_WINDOW_MS};

const STARTING_SOON_HOURS: i64 = 2;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Split appointments into the upcoming and completed lists, both ordered by
/// scheduled instant. Appointment instants are read in `now`'s timezone.
/// Overdue appointments stay in `upcoming` until completed or deleted.
pub fn project<Tz: TimeZone>(appointments: &[Appointment], now: &DateTime<Tz>) -> Projection {
    let tz = now.timezone();
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);

    let mut sorted: Vec<&Appointment> = appointments.iter().collect();
    sorted.sort_by_key(|apt| apt.scheduled_at());

    let upcoming: Vec<UpcomingEntry> = sorted
        .iter()
        .filter(|apt| !apt.completed)
        .map(|apt| upcoming_entry(apt, apt.starts_at(&tz) - now_utc, today))
        .collect();

    let completed: Vec<CompletedEntry> = sorted
        .iter()
        .filter(|apt| apt.completed)
        .map(|apt| CompletedEntry {
            appointment: (*apt).clone(),
            deletes_in: apt.completed_at.map(|at| countdown(now_utc, at)),
        })
        .collect();

    let stats = Stats {
        upcoming_count: upcoming.len(),
        completed_today_count: completed
            .iter()
            .filter(|entry| entry.appointment.date == today)
            .count(),
    };

    Projection {
        upcoming,
        completed,
        stats,
    }
}

/// The current view of a store, in the host's local timezone.
pub fn current_view(store: &AppointmentStore) -> Projection {
    project(store.list(), &store.now().with_timezone(&Local))
}

pub fn greeting<Tz: TimeZone>(now: &DateTime<Tz>) -> Greeting {
    match now.hour() {
        h if h < 12 => Greeting::Morning,
        h if h < 17 => Greeting::Afternoon,
        _ => Greeting::Evening,
    }
}

fn upcoming_entry(apt: &Appointment, until: Duration, today: NaiveDate) -> UpcomingEntry {
    let is_starting_soon = until > Duration::zero() && until <= Duration::hours(STARTING_SOON_HOURS);
    let is_today = apt.date == today;

    let warning = if is_starting_soon {
        Warning::StartingSoon
    } else if is_today {
        Warning::Today
    } else {
        Warning::None
    };

    UpcomingEntry {
        appointment: apt.clone(),
        hours_until: until.num_milliseconds() as f64 / MS_PER_HOUR,
        is_starting_soon,
        is_today,
        warning,
    }
}

fn countdown(now: DateTime<Utc>, completed_at: DateTime<Utc>) -> Countdown {
    let elapsed = (now - completed_at).num_milliseconds();
    let remaining_minutes = (RETENTION_WINDOW_MS - elapsed).max(0) / 60_000;
    Countdown {
        hours: remaining_minutes / 60,
        minutes: remaining_minutes % 60,
    }
}
