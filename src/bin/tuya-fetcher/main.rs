mod args;

use std::process::ExitCode;

use anyhow::Context as _;
use args::Args;
use clap::Parser as _;
use log::{error, info};
use tuya_environments::{
    output::StorageSink,
    reading::{TIMESTAMP_FORMAT, local_now},
    run::{CONFIG_ERROR_EXIT_CODE, RunConfig, RunError, credentials_from_env_values, run},
    tuya::{DEVICE_IDS, TuyaClient},
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(args_exit_code(&e));
        }
    };

    match fetch(args).await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Help and version output exit 0; any other argument error is a configuration error.
fn args_exit_code(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        CONFIG_ERROR_EXIT_CODE
    } else {
        0
    }
}

async fn fetch(args: Args) -> Result<(), RunError> {
    let started_at = local_now(args.timezone);
    info!("run started at {}", started_at.format(TIMESTAMP_FORMAT));

    let credentials = credentials_from_env_values(args.access_id, args.access_key)?;
    info!("using access id {}...", credentials.access_id_hint());

    let mut client = TuyaClient::new(&args.endpoint, credentials)
        .context("failed to create Tuya client")
        .map_err(RunError::Authentication)?;

    let storage = match args.storage_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => match StorageSink::new(url) {
            Ok(sink) => Some(sink),
            Err(e) => {
                error!("storage disabled: {e:#}");
                None
            }
        },
        None => None,
    };

    let config = RunConfig {
        output_dir: args.output_dir,
        storage,
        started_at,
    };

    run(&mut client, &DEVICE_IDS, &config).await?;

    Ok(())
}
