use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::output::is_csv_file_name;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Daily CSV files in `dir`, sorted by name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context("failed to read directory entry")?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_csv_file_name(&name) {
            files.push(name);
        }
    }
    files.sort();

    Ok(files)
}

/// Recomputes the manifest from the directory listing and overwrites it.
pub fn rewrite_manifest(dir: &Path) -> Result<Vec<String>> {
    let files = list_csv_files(dir)?;

    let path = dir.join(MANIFEST_FILE_NAME);
    let file = File::create(&path)
        .with_context(|| format!("failed to create manifest: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &files).context("failed to write manifest")?;
    writer.flush().context("failed to flush manifest")?;

    Ok(files)
}
