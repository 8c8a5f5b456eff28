pub mod appointment;
pub mod notification;
pub mod view;

pub use appointment::{Appointment, AppointmentDraft, ValidDraft};
pub use notification::{Notification, NotificationKind};
pub use view::{CompletedEntry, Countdown, Greeting, Projection, Stats, UpcomingEntry, Warning};
