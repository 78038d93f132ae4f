use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

const TEMPERATURE_CODES: [&str; 3] = ["temp_current", "temperature", "va_temperature"];
const HUMIDITY_CODES: [&str; 3] = ["humidity_value", "humidity", "va_humidity"];

// Sensors that report tenths of a unit exceed these.
const TEMPERATURE_TENTHS_THRESHOLD: f64 = 50.0;
const HUMIDITY_TENTHS_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusPoint {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub value: Value,
}

impl StatusPoint {
    pub fn new(code: &str, value: Value) -> Self {
        Self {
            code: Some(code.to_owned()),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(Number),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Number(n) => write!(f, "{n}"),
            SensorValue::Text(s) => f.write_str(s),
        }
    }
}

/// Picks temperature and humidity out of a device status list.
///
/// Every matching point overwrites the previous one, so the last match wins.
pub fn extract_temperature_humidity(
    points: &[StatusPoint],
) -> (Option<SensorValue>, Option<SensorValue>) {
    let mut temperature = None;
    let mut humidity = None;

    for point in points {
        let Some(code) = point.code.as_deref() else {
            continue;
        };

        if TEMPERATURE_CODES.contains(&code) {
            temperature = normalize_value(&point.value, |v| {
                v.abs() > TEMPERATURE_TENTHS_THRESHOLD
            });
        } else if HUMIDITY_CODES.contains(&code) {
            // Not abs(): negative humidity is never rescaled.
            humidity = normalize_value(&point.value, |v| v > HUMIDITY_TENTHS_THRESHOLD);
        }
    }

    (temperature, humidity)
}

fn normalize_value(value: &Value, is_tenths: impl Fn(f64) -> bool) -> Option<SensorValue> {
    match value {
        Value::Null => None,
        Value::Number(n) => {
            let Some(v) = n.as_f64() else {
                return Some(SensorValue::Number(n.clone()));
            };
            if !is_tenths(v) {
                return Some(SensorValue::Number(n.clone()));
            }
            Some(match Number::from_f64(v / 10.0) {
                Some(scaled) => SensorValue::Number(scaled),
                None => SensorValue::Number(n.clone()),
            })
        }
        Value::String(s) => Some(SensorValue::Text(s.clone())),
        other => Some(SensorValue::Text(other.to_string())),
    }
}
