use chrono::{DateTime, Duration, Local, TimeZone, Utc};

use crate::models::Appointment;

/// Calendar entries are exported as one-hour blocks.
const EVENT_DURATION_MINUTES: i64 = 60;

pub fn generate_ics(appointment: &Appointment) -> String {
    let start = appointment.scheduled_at();
    let dtstart = start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (start + Duration::minutes(EVENT_DURATION_MINUTES))
        .format("%Y%m%dT%H%M%S")
        .to_string();
    let dtstamp = appointment.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@nokeys", appointment.id);

    let summary = escape_text(&event_title(appointment));
    let description = escape_text(&event_details(appointment));
    let location = escape_text(&appointment.address);

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//NoKeys//Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         LOCATION:{location}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

/// Google Calendar "add event" link, with the local start time converted to UTC.
pub fn google_calendar_url(appointment: &Appointment) -> String {
    google_calendar_url_in(appointment, &Local)
}

pub fn google_calendar_url_in<Tz: TimeZone>(appointment: &Appointment, tz: &Tz) -> String {
    let start = appointment.starts_at(tz);
    let end = start + Duration::minutes(EVENT_DURATION_MINUTES);
    let format = |dt: DateTime<Utc>| dt.format("%Y%m%dT%H%M%SZ").to_string();

    format!(
        "https://calendar.google.com/calendar/render?action=TEMPLATE&text={}&dates={}/{}&details={}&location={}",
        urlencoding::encode(&event_title(appointment)),
        format(start),
        format(end),
        urlencoding::encode(&event_details(appointment)),
        urlencoding::encode(&appointment.address),
    )
}

fn event_title(appointment: &Appointment) -> String {
    format!(
        "NoKeys - {} - {}",
        appointment.customer_name, appointment.service
    )
}

fn event_details(appointment: &Appointment) -> String {
    let mut details = format!(
        "Customer: {}\nPhone: {}\nService: {}\nAddress: {}",
        appointment.customer_name, appointment.phone, appointment.service, appointment.address
    );
    if !appointment.notes.is_empty() {
        details.push_str("\nNotes: ");
        details.push_str(&appointment.notes);
    }
    details
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}
