#![cfg_attr(windows, windows_subsystem = "windows")]

mod cli;
mod config;
mod error;
mod fs_ops;
mod host;
mod installer;
mod logging;
mod metadata;
mod notify;
mod paths;
mod payload;
mod privilege;
mod record;
mod registry;
mod resolver;
mod self_delete;
mod shortcuts;
mod uninstaller;

use anyhow::Result;
use tracing::{error, info, warn};

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            let kind = error::classify(&err);
            let detail = format!("{err:#}");
            error!(error = %detail, kind = ?kind, "setup failed");
            notify::show_error(
                &notify::dialog_title(config::APP_NAME),
                &notify::error_text(kind, &detail),
            );
            kind.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let meta = metadata::PackageMetadata::from_config()?;
    let self_exe = paths::self_path()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = cli::select_mode(&args, &self_exe)?;

    let action = match mode {
        cli::Mode::Install { .. } => "install",
        cli::Mode::Uninstall => "uninstall",
    };
    let elevated = privilege::is_elevated();
    privilege::ensure_elevated(elevated, action)?;

    let log_name = logging::log_file_name(&meta.app_name, action);
    if let Err(err) = logging::init(&logging::logs_dir(), &log_name) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let layout = paths::Layout::from_env()?;
    let store = registry::default_store();
    let host = host::Host {
        layout: &layout,
        store: store.as_ref(),
        scheduler: &self_delete::RebootScheduler,
        elevated,
    };

    match mode {
        cli::Mode::Install { dir, payload } => {
            let bytes = payload::load(payload.as_deref())?;
            let request = installer::InstallRequest {
                explicit_dir: dir.as_deref(),
                payload: &bytes,
                uninstaller_source: &self_exe,
            };
            let report = installer::install(&meta, &host, &request)?;
            info!(dir = %report.paths.install_dir.display(), "install finished");
            Ok(error::EXIT_OK)
        }
        cli::Mode::Uninstall => {
            let report = uninstaller::uninstall(&meta, &host, &self_exe)?;
            for path in &report.deferred {
                info!(path = %path.display(), "removal deferred until reboot");
            }
            match report.first_failure_kind() {
                None => {
                    info!(dir = %report.paths.install_dir.display(), "uninstall finished");
                    Ok(error::EXIT_OK)
                }
                Some(kind) => {
                    warn!(failures = report.failures.len(), "uninstall finished with failures");
                    let detail = report
                        .failures
                        .iter()
                        .map(|f| format!("{}: {:#}", f.stage, f.error))
                        .collect::<Vec<_>>()
                        .join("\n");
                    notify::show_error(
                        &notify::dialog_title(&meta.app_name),
                        &notify::error_text(kind, &detail),
                    );
                    Ok(kind.exit_code())
                }
            }
        }
    }
}
