use std::path::PathBuf;

use chrono_tz::Tz;
use clap::Parser;
use tuya_environments::tuya::DEFAULT_ENDPOINT;

#[derive(Debug, Parser)]
#[command(about = "Fetch Tuya sensor readings and append them to the daily CSV log")]
pub struct Args {
    #[arg(long, env = "TUYA_ACCESS_ID", hide_env_values = true)]
    pub access_id: Option<String>,

    #[arg(long, env = "TUYA_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    #[arg(long, env = "STORAGE_URL")]
    pub storage_url: Option<String>,

    #[arg(long, env = "TUYA_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value = "data")]
    pub output_dir: PathBuf,

    /// Zone for timestamps and the file date; the system zone when unset.
    #[arg(long, env = "TUYA_TIMEZONE")]
    pub timezone: Option<Tz>,
}
