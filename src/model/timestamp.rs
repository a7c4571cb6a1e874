//! Fixed-width UTC timestamp text.
//!
//! Both backends store times as `YYYY-MM-DDTHH:MM:SS.ffffffZ`, so string
//! order is time order and filter literals compare correctly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format(time: &DateTime<Utc>) -> String {
    time.format(FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Current time truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    parse(&format(&now)).unwrap_or(now)
}

pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(time))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{text}'")))
}
