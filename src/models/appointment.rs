use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// A stored appointment. Field names and encodings match the payload the
/// booking widget has always written to local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub customer_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub service: String,
    pub date: NaiveDate,
    #[serde(with = "time_of_day")]
    pub time: NaiveTime,
    pub address: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// The scheduled wall-clock instant, used for ordering and warnings.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// The real instant the appointment starts when its wall-clock time is
    /// read in `tz`. An ambiguous time (clocks going back) resolves to the
    /// earlier instant; a time inside a spring-forward gap is pushed past it.
    pub fn starts_at<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        let naive = self.scheduled_at();
        tz.from_local_datetime(&naive)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }
}

/// Raw form input for create and update. Everything arrives as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    pub customer_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

/// A draft that passed validation: trimmed, with date and time parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub service: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub address: String,
    pub notes: String,
}

impl AppointmentDraft {
    pub fn validate(&self) -> Result<ValidDraft, StoreError> {
        let mut fields = Vec::new();

        let mut required = |name: &'static str, value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                fields.push(name);
            }
            trimmed.to_string()
        };

        let customer_name = required("customerName", &self.customer_name);
        let phone = required("phone", &self.phone);
        let service = required("service", &self.service);
        let date = required("date", &self.date);
        let time = required("time", &self.time);
        let address = required("address", &self.address);

        let parsed_date = if date.is_empty() {
            None
        } else {
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok();
            if parsed.is_none() {
                fields.push("date");
            }
            parsed
        };
        let parsed_time = if time.is_empty() {
            None
        } else {
            let parsed = time_of_day::parse(&time);
            if parsed.is_none() {
                fields.push("time");
            }
            parsed
        };

        match (parsed_date, parsed_time) {
            (Some(date), Some(time)) if fields.is_empty() => Ok(ValidDraft {
                customer_name,
                phone,
                email: self.email.trim().to_string(),
                service,
                date,
                time,
                address,
                notes: self.notes.trim().to_string(),
            }),
            _ => Err(StoreError::Validation { fields }),
        }
    }
}

/// `HH:MM` on write, or `HH:MM:SS` when the seconds are set; either on read.
pub(crate) mod time_of_day {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        let format = if time.second() == 0 { "%H:%M" } else { "%H:%M:%S" };
        serializer.serialize_str(&time.format(format).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}")))
    }
}
