//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `repokit_core` linkage and store bootstrap from a terminal.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `repokit_cli [DB_PATH]`. Without a path an in-memory store is used.

use repokit_core::{
    core_version, init_logging, push_credentials_repository, LogConfig, Repository, SqliteDriver,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("repokit_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    if let Some(config) = LogConfig::from_env().map_err(|err| err.to_string())? {
        init_logging(&config).map_err(|err| err.to_string())?;
    }

    println!("repokit_core version={}", core_version());

    let driver = match std::env::args_os().nth(1) {
        Some(path) => SqliteDriver::open(path),
        None => SqliteDriver::open_in_memory(),
    }
    .map_err(|err| err.to_string())?;

    let repository =
        push_credentials_repository(Arc::new(driver), |_| {}).map_err(|err| err.to_string())?;

    let mut count = 0;
    repository.all_items(|items| count = items.len());
    log::info!("event=cli_probe module=cli status=ok push_credentials={count}");
    println!("repokit_core push_credentials={count}");
    Ok(())
}
