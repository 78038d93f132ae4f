use std::path::PathBuf;

use chrono::NaiveDateTime;
use log::{debug, error, info, warn};

use crate::output::{StorageSink, append_readings, csv_lines, rewrite_manifest};
use crate::reading::Reading;
use crate::tuya::{ApiResponse, Credentials, TuyaApi, extract_temperature_humidity};

pub const ACCESS_ID_VAR: &str = "TUYA_ACCESS_ID";
pub const ACCESS_KEY_VAR: &str = "TUYA_ACCESS_KEY";

/// Exit code for bad configuration and failed writes.
pub const CONFIG_ERROR_EXIT_CODE: u8 = 1;

/// Terminal failures of a run, each with its own exit code.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("{} and {} must be set", ACCESS_ID_VAR, ACCESS_KEY_VAR)]
    MissingCredentials,
    #[error("could not connect to Tuya API: {0:#}")]
    Authentication(anyhow::Error),
    #[error("could not write readings: {0:#}")]
    Output(anyhow::Error),
}

impl RunError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::MissingCredentials => CONFIG_ERROR_EXIT_CODE,
            RunError::Authentication(_) => 2,
            RunError::Output(_) => CONFIG_ERROR_EXIT_CODE,
        }
    }
}

/// Builds credentials from the raw variables; empty values count as missing.
pub fn credentials_from_env_values(
    access_id: Option<String>,
    access_key: Option<String>,
) -> Result<Credentials, RunError> {
    let access_id = access_id.filter(|v| !v.is_empty());
    let access_key = access_key.filter(|v| !v.is_empty());

    match (access_id, access_key) {
        (Some(id), Some(key)) => Ok(Credentials::new(id, key)),
        (id, key) => {
            debug!(
                "access id present: {}, access key present: {}",
                id.is_some(),
                key.is_some()
            );
            Err(RunError::MissingCredentials)
        }
    }
}

#[derive(Debug)]
pub struct RunConfig {
    pub output_dir: PathBuf,

    pub storage: Option<StorageSink>,

    /// Local time stamped on every reading of the run.
    pub started_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub readings: Vec<Reading>,

    pub device_count: usize,

    pub csv_path: Option<PathBuf>,

    pub manifest: Option<Vec<String>>,
}

/// One batch: connect, poll every device in order, then write the outputs.
pub async fn run<A: TuyaApi>(
    api: &mut A,
    device_ids: &[&str],
    config: &RunConfig,
) -> Result<RunSummary, RunError> {
    info!("starting IoT data fetch for {} devices", device_ids.len());

    api.connect().await.map_err(RunError::Authentication)?;
    info!("connected successfully");

    let readings = collect_readings(api, device_ids, config.started_at).await;

    info!(
        "successfully read {}/{} devices",
        readings.len(),
        device_ids.len()
    );

    let mut summary = RunSummary {
        device_count: device_ids.len(),
        ..Default::default()
    };

    if readings.is_empty() {
        info!("no readings collected; nothing to write");
        return Ok(summary);
    }

    if let Some(storage) = &config.storage {
        storage.send(&readings).await;
    }

    let path = append_readings(&config.output_dir, config.started_at.date(), &readings)
        .map_err(RunError::Output)?;
    info!("wrote/updated CSV: {}", path.display());
    summary.csv_path = Some(path);

    match rewrite_manifest(&config.output_dir) {
        Ok(files) => summary.manifest = Some(files),
        Err(e) => error!("could not update manifest: {e:#}"),
    }

    for line in csv_lines(&readings) {
        info!("{line}");
    }

    summary.readings = readings;
    Ok(summary)
}

async fn collect_readings<A: TuyaApi>(
    api: &A,
    device_ids: &[&str],
    measured_at: NaiveDateTime,
) -> Vec<Reading> {
    let mut readings = Vec::with_capacity(device_ids.len());

    for &device_id in device_ids {
        info!("fetching device: {device_id}");

        let points = match api.device_status(device_id).await {
            Ok(ApiResponse::Success(points)) => points,
            Ok(ApiResponse::Failure { message, raw }) => {
                error!("failed to get status for {device_id}: {message}: {raw}");
                continue;
            }
            Err(e) => {
                error!("failed to get status for {device_id}: {e:#}");
                continue;
            }
        };

        let (Some(temperature), Some(humidity)) = extract_temperature_humidity(&points) else {
            warn!("could not extract temperature or humidity for {device_id}: {points:?}");
            continue;
        };

        info!("{device_id}: temp {temperature}C, humidity {humidity}%");
        readings.push(Reading::new(measured_at, device_id, temperature, humidity));
    }

    readings
}
