use chrono::{Local, NaiveDateTime};
use chrono_tz::Tz;
use serde::Serialize;

use crate::tuya::SensorValue;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const CSV_HEADER: [&str; 4] = [
    "timestamp",
    "device_id",
    "temperature_c",
    "humidity_percent",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: String,

    pub device_id: String,

    pub temperature_c: SensorValue,

    pub humidity_percent: SensorValue,
}

impl Reading {
    pub fn new(
        measured_at: NaiveDateTime,
        device_id: &str,
        temperature_c: SensorValue,
        humidity_percent: SensorValue,
    ) -> Self {
        Self {
            timestamp: measured_at.format(TIMESTAMP_FORMAT).to_string(),
            device_id: device_id.to_owned(),
            temperature_c,
            humidity_percent,
        }
    }

    pub fn csv_fields(&self) -> [String; 4] {
        [
            self.timestamp.clone(),
            self.device_id.clone(),
            self.temperature_c.to_string(),
            self.humidity_percent.to_string(),
        ]
    }
}

/// Wall-clock time of the run, in `timezone` or the system zone.
pub fn local_now(timezone: Option<Tz>) -> NaiveDateTime {
    match timezone {
        Some(tz) => chrono::Utc::now().with_timezone(&tz).naive_local(),
        None => Local::now().naive_local(),
    }
}
