use anyhow::{anyhow, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

const LOG_DIR_NAME: &str = "skiff-logs";

pub fn logs_dir() -> PathBuf {
    std::env::temp_dir().join(LOG_DIR_NAME)
}

pub fn log_file_name(app_name: &str, action: &str) -> String {
    format!("{app_name}-{action}.log")
}

fn open_log_file(dir: &Path, file_name: &str) -> Result<(PathBuf, fs::File)> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let log_path = dir.join(file_name);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open {}", log_path.display()))?;
    Ok((log_path, file))
}

/// Routes `tracing` output to `<dir>/<file_name>`. Call once per process.
pub fn init(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let (log_path, file) = open_log_file(dir, file_name)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("init logging: {err}"))?;
    Ok(log_path)
}
