use std::time::Duration;

use anyhow::{Context as _, Result};
use log::{error, info};

use crate::reading::Reading;

const STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Optional webhook that receives each run's readings as a JSON array.
#[derive(Debug, Clone)]
pub struct StorageSink {
    http: reqwest::Client,
    url: String,
}

impl StorageSink {
    pub fn new(url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(STORAGE_TIMEOUT)
            .build()
            .context("failed to build storage HTTP client")?;

        Ok(Self {
            http,
            url: url.to_owned(),
        })
    }

    /// Posts `readings`. Errors are logged here and never returned.
    pub async fn send(&self, readings: &[Reading]) {
        match self.http.post(&self.url).json(readings).send().await {
            Ok(response) => info!("sent to storage: {}", response.status()),
            Err(e) => error!("storage error: {e:#}"),
        }
    }
}
