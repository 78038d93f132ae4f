use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::warn;

use crate::reading::{CSV_HEADER, Reading};

pub const CSV_FILE_PREFIX: &str = "TROFICDORD";
pub const CSV_FILE_SUFFIX: &str = ".csv";

pub fn csv_file_name(date: NaiveDate) -> String {
    format!(
        "{CSV_FILE_PREFIX}{}{CSV_FILE_SUFFIX}",
        date.format("%Y%m%d")
    )
}

pub fn is_csv_file_name(name: &str) -> bool {
    name.starts_with(CSV_FILE_PREFIX) && name.ends_with(CSV_FILE_SUFFIX)
}

/// Creates `dir` if needed. Failure is only logged; the write that follows reports it.
pub fn ensure_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("could not create directory {}: {e}", dir.display());
    }
}

/// Appends `readings` to the file for `date`, writing the header only when the file is new.
pub fn append_readings(dir: &Path, date: NaiveDate, readings: &[Reading]) -> Result<PathBuf> {
    ensure_dir(dir);

    let path = dir.join(csv_file_name(date));
    let exists = path.exists();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open CSV file: {}", path.display()))?;

    // Values never contain the delimiter, rows go out unquoted.
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    if !exists {
        writer
            .write_record(CSV_HEADER)
            .context("failed to write CSV header")?;
    }

    for reading in readings {
        writer
            .write_record(reading.csv_fields())
            .with_context(|| format!("failed to write CSV row for {}", reading.device_id))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush CSV file: {}", path.display()))?;

    Ok(path)
}

/// Header plus one line per reading, as they appear in the daily file.
pub fn csv_lines(readings: &[Reading]) -> Vec<String> {
    std::iter::once(CSV_HEADER.join(","))
        .chain(readings.iter().map(|r| r.csv_fields().join(",")))
        .collect()
}
