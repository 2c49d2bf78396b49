//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `easyrepo_core` linkage and a working bundled SQLite.
//! - Start file logging so the smoke run leaves an `event=` trail.
//! - Keep output deterministic for quick local sanity checks.

use easyrepo_core::db::open_db_in_memory;
use easyrepo_core::{init_logging, LogLevel};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "EASYREPO_LOG_DIR";

fn main() -> ExitCode {
    println!("easyrepo_core ping={}", easyrepo_core::ping());
    println!("easyrepo_core version={}", easyrepo_core::core_version());

    match run(&log_dir()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// `$EASYREPO_LOG_DIR` when set, otherwise `<tmp>/easyrepo-logs`.
fn log_dir() -> PathBuf {
    std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .unwrap_or_else(|| std::env::temp_dir().join("easyrepo-logs"))
}

fn run(log_dir: &Path) -> Result<(), String> {
    let level = LogLevel::build_default();
    init_logging(level.as_str(), log_dir)
        .map_err(|err| format!("easyrepo_core logging=error {err}"))?;
    println!(
        "easyrepo_core logging=ok level={} dir={}",
        level.as_str(),
        log_dir.display()
    );

    open_db_in_memory(&[]).map_err(|err| format!("easyrepo_core sqlite=error {err}"))?;
    info!("event=cli_smoke module=cli status=ok");
    println!("easyrepo_core sqlite=ok");
    Ok(())
}
