use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};
use tempfile::TempDir;
use tuya_environments::{
    output::{MANIFEST_FILE_NAME, StorageSink},
    run::{RunConfig, RunError, run},
    tuya::{ApiResponse, StatusPoint, TuyaApi},
};

const HEADER: &str = "timestamp,device_id,temperature_c,humidity_percent";

enum Scripted {
    Points(Value),
    Unsuccessful,
    TransportError,
}

struct FakeApi {
    accept_token: bool,
    connected: bool,
    devices: HashMap<&'static str, Scripted>,
    polled: RefCell<Vec<String>>,
}

impl FakeApi {
    fn new(devices: impl IntoIterator<Item = (&'static str, Scripted)>) -> Self {
        Self {
            accept_token: true,
            connected: false,
            devices: devices.into_iter().collect(),
            polled: RefCell::new(Vec::new()),
        }
    }

    fn rejecting_token() -> Self {
        Self {
            accept_token: false,
            ..Self::new([])
        }
    }
}

impl TuyaApi for FakeApi {
    async fn connect(&mut self) -> Result<()> {
        if !self.accept_token {
            bail!("token call failed: sign invalid (code 1004)");
        }
        self.connected = true;
        Ok(())
    }

    async fn device_status(&self, device_id: &str) -> Result<ApiResponse<Vec<StatusPoint>>> {
        assert!(self.connected, "status fetched before connect");
        self.polled.borrow_mut().push(device_id.to_owned());

        match self.devices.get(device_id) {
            Some(Scripted::Points(points)) => {
                Ok(ApiResponse::from_value(json!({"success": true, "result": points})))
            }
            Some(Scripted::Unsuccessful) | None => Ok(ApiResponse::from_value(
                json!({"success": false, "code": 2009, "msg": "device offline"}),
            )),
            Some(Scripted::TransportError) => Err(anyhow!("connection reset")),
        }
    }
}

fn started_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn config(dir: &Path) -> RunConfig {
    RunConfig {
        output_dir: dir.to_path_buf(),
        storage: None,
        started_at: started_at(),
    }
}

fn sensor(temperature: i64, humidity: i64) -> Scripted {
    Scripted::Points(json!([
        {"code": "va_temperature", "value": temperature},
        {"code": "va_humidity", "value": humidity},
        {"code": "battery_percentage", "value": 100},
    ]))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn writes_csv_and_manifest_on_fresh_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("data");
    let mut api = FakeApi::new([("dev1", sensor(235, 455))]);

    let summary = run(&mut api, &["dev1"], &config(&dir)).await.unwrap();

    let csv_path = dir.join("TROFICDORD20240309.csv");
    assert_eq!(summary.csv_path.as_deref(), Some(csv_path.as_path()));
    assert_eq!(
        read(&csv_path),
        format!("{HEADER}\n2024-03-09 08:30:00,dev1,23.5,45.5\n")
    );
    assert_eq!(
        read(&dir.join(MANIFEST_FILE_NAME)),
        r#"["TROFICDORD20240309.csv"]"#
    );
}

#[tokio::test]
async fn second_run_on_same_day_appends_rows() {
    let tmp = TempDir::new().unwrap();
    let mut api = FakeApi::new([("dev1", sensor(235, 45))]);

    run(&mut api, &["dev1"], &config(tmp.path())).await.unwrap();
    run(&mut api, &["dev1"], &config(tmp.path())).await.unwrap();

    let content = read(&tmp.path().join("TROFICDORD20240309.csv"));
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        [
            HEADER,
            "2024-03-09 08:30:00,dev1,23.5,45",
            "2024-03-09 08:30:00,dev1,23.5,45",
        ]
    );
}

#[tokio::test]
async fn failed_devices_are_skipped_in_order() {
    let tmp = TempDir::new().unwrap();
    let mut api = FakeApi::new([
        ("dev1", sensor(-60, -150)),
        ("dev2", Scripted::TransportError),
        ("dev3", Scripted::Unsuccessful),
        ("dev4", Scripted::Points(json!([{"code": "temp_current", "value": 21}]))),
        ("dev5", Scripted::Points(json!([{"code": "switch", "value": true}]))),
        ("dev6", sensor(22, 40)),
    ]);
    let devices = ["dev1", "dev2", "dev3", "dev4", "dev5", "dev6"];

    let summary = run(&mut api, &devices, &config(tmp.path())).await.unwrap();

    assert_eq!(*api.polled.borrow(), devices);
    assert_eq!(summary.device_count, 6);
    let ids: Vec<&str> = summary
        .readings
        .iter()
        .map(|r| r.device_id.as_str())
        .collect();
    assert_eq!(ids, ["dev1", "dev6"]);
    assert_eq!(
        read(&tmp.path().join("TROFICDORD20240309.csv")),
        format!(
            "{HEADER}\n\
             2024-03-09 08:30:00,dev1,-6.0,-150\n\
             2024-03-09 08:30:00,dev6,22,40\n"
        )
    );
}

#[tokio::test]
async fn no_readings_leaves_filesystem_untouched() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("data");
    let mut api = FakeApi::new([("dev1", Scripted::Unsuccessful)]);

    let summary = run(&mut api, &["dev1", "dev2"], &config(&dir)).await.unwrap();

    assert!(summary.readings.is_empty());
    assert!(summary.csv_path.is_none());
    assert!(!dir.exists());
}

#[tokio::test]
async fn authentication_failure_stops_before_polling() {
    let tmp = TempDir::new().unwrap();
    let mut api = FakeApi::rejecting_token();

    let err = run(&mut api, &["dev1"], &config(tmp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Authentication(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(api.polled.borrow().is_empty());
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn unreachable_storage_does_not_block_csv() {
    let tmp = TempDir::new().unwrap();
    let mut api = FakeApi::new([("dev1", sensor(235, 455))]);
    let config = RunConfig {
        storage: Some(StorageSink::new("http://127.0.0.1:1/readings").unwrap()),
        ..config(tmp.path())
    };

    let summary = run(&mut api, &["dev1"], &config).await.unwrap();

    assert_eq!(summary.readings.len(), 1);
    assert!(tmp.path().join("TROFICDORD20240309.csv").exists());
    assert_eq!(
        summary.manifest.as_deref(),
        Some(&["TROFICDORD20240309.csv".to_owned()][..])
    );
}

#[tokio::test]
async fn csv_write_failure_is_an_output_error() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("data");
    fs::write(&blocker, "not a directory").unwrap();
    let mut api = FakeApi::new([("dev1", sensor(235, 455))]);

    let err = run(&mut api, &["dev1"], &config(&blocker))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Output(_)));
    assert_eq!(err.exit_code(), 1);
}
