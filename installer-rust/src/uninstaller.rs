use anyhow::Result;
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

use crate::{
    error::{classify, ErrorKind, SetupError},
    fs_ops::{self, DirRemoval},
    host::Host,
    metadata::PackageMetadata,
    paths::{self, InstallPaths},
    privilege,
    self_delete::Deletion,
    shortcuts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallStage {
    Start,
    RecordRead,
    ShortcutsRemoved,
    FilesRemoved,
    RecordDeleted,
    Done,
}

impl fmt::Display for UninstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UninstallStage::Start => "start",
            UninstallStage::RecordRead => "record-read",
            UninstallStage::ShortcutsRemoved => "shortcuts-removed",
            UninstallStage::FilesRemoved => "files-removed",
            UninstallStage::RecordDeleted => "record-deleted",
            UninstallStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Record,
    SelfLocation,
}

#[derive(Debug)]
pub struct StepFailure {
    pub stage: UninstallStage,
    pub error: anyhow::Error,
}

#[derive(Debug)]
pub struct UninstallReport {
    pub paths: InstallPaths,
    pub source: LocationSource,
    pub removed: Vec<PathBuf>,
    pub deferred: Vec<PathBuf>,
    /// Directories left in place because they still hold unknown files.
    pub kept: Vec<PathBuf>,
    pub failures: Vec<StepFailure>,
    pub stage: UninstallStage,
}

impl UninstallReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure_kind(&self) -> Option<ErrorKind> {
        self.failures.first().map(|f| classify(&f.error))
    }

    fn record_failure(&mut self, stage: UninstallStage, err: anyhow::Error) {
        let detail = format!("{err:#}");
        error!(step = %stage, error = %detail, "uninstall step failed, continuing");
        self.failures.push(StepFailure { stage, error: err });
    }

    fn advance(&mut self, next: UninstallStage) {
        info!(from = %self.stage, to = %next, "uninstall stage");
        self.stage = next;
    }
}

/// Best-effort inverse of [`crate::installer::install`].
///
/// Only a missing elevation or an install location that cannot be found at
/// all returns `Err`. Every later step runs even if an earlier one failed; the
/// failures are collected in the report.
pub fn uninstall(
    meta: &PackageMetadata,
    host: &Host<'_>,
    self_exe: &Path,
) -> Result<UninstallReport> {
    privilege::ensure_elevated(host.elevated, "uninstall")?;
    info!(app = %meta.app_name, "starting uninstall");

    let (install_dir, source) = locate(meta, host, self_exe)?;
    info!(dir = %install_dir.display(), source = ?source, "located install");

    let mut report = UninstallReport {
        paths: InstallPaths::new(host.layout, meta, &install_dir),
        source,
        removed: Vec::new(),
        deferred: Vec::new(),
        kept: Vec::new(),
        failures: Vec::new(),
        stage: UninstallStage::Start,
    };
    report.advance(UninstallStage::RecordRead);

    remove_shortcuts(meta, host, &mut report);
    report.advance(UninstallStage::ShortcutsRemoved);

    remove_files(host, &mut report);
    remove_install_dir(host, &mut report);
    report.advance(UninstallStage::FilesRemoved);

    if let Err(err) = host.store.delete(&meta.app_name) {
        report.record_failure(UninstallStage::RecordDeleted, err);
    } else {
        info!(app = %meta.app_name, "install record deleted");
    }
    report.advance(UninstallStage::RecordDeleted);

    report.advance(UninstallStage::Done);
    Ok(report)
}

fn locate(
    meta: &PackageMetadata,
    host: &Host<'_>,
    self_exe: &Path,
) -> Result<(PathBuf, LocationSource)> {
    match host.store.read(&meta.app_name) {
        Ok(Some(record)) => {
            if let Some(dir) = record.install_dir() {
                return Ok((dir, LocationSource::Record));
            }
            warn!(app = %meta.app_name, "install record has no InstallLocation");
        }
        Ok(None) => info!(app = %meta.app_name, "no install record"),
        Err(err) => {
            let detail = format!("{err:#}");
            warn!(error = %detail, "reading install record failed, trying own location");
        }
    }

    if paths::is_uninstaller_binary(self_exe) {
        if let Some(dir) = self_exe.parent().filter(|d| !d.as_os_str().is_empty()) {
            return Ok((dir.to_path_buf(), LocationSource::SelfLocation));
        }
    }

    Err(SetupError::NotFound(format!(
        "no install record for {} and {} is not an installed uninstaller",
        meta.app_name,
        self_exe.display()
    ))
    .into())
}

fn remove_shortcuts(meta: &PackageMetadata, host: &Host<'_>, report: &mut UninstallReport) {
    let stage = UninstallStage::ShortcutsRemoved;
    let links = [
        (host.layout.desktop.clone(), report.paths.desktop_shortcut.clone()),
        (report.paths.menu_dir.clone(), report.paths.menu_shortcut.clone()),
    ];
    for (dir, link) in links {
        match shortcuts::remove_shortcut(&dir, &meta.app_name) {
            Ok(true) => report.removed.push(link),
            Ok(false) => {}
            Err(err) => report.record_failure(stage, err),
        }
    }

    let menu_dir = report.paths.menu_dir.clone();
    match fs_ops::remove_dir_if_empty(&menu_dir) {
        Ok(DirRemoval::Removed) => report.removed.push(menu_dir),
        Ok(DirRemoval::Missing) => {}
        Ok(DirRemoval::NotEmpty) => {
            warn!(dir = %menu_dir.display(), "menu group not empty, leaving it");
            report.kept.push(menu_dir);
        }
        Err(err) => report.record_failure(stage, err),
    }
}

fn remove_files(host: &Host<'_>, report: &mut UninstallReport) {
    let stage = UninstallStage::FilesRemoved;
    let exe = report.paths.exe.clone();
    match fs_ops::remove_file_if_exists(&exe) {
        Ok(true) => report.removed.push(exe),
        Ok(false) => {}
        Err(err) => report.record_failure(stage, err),
    }

    let uninstaller = report.paths.uninstaller.clone();
    match host.scheduler.schedule_delete(&uninstaller) {
        Ok(Deletion::Deleted) => report.removed.push(uninstaller),
        Ok(Deletion::Deferred) => report.deferred.push(uninstaller),
        Ok(Deletion::Missing) => {}
        Err(err) => report.record_failure(stage, err),
    }
}

fn remove_install_dir(host: &Host<'_>, report: &mut UninstallReport) {
    let stage = UninstallStage::FilesRemoved;
    let dir = report.paths.install_dir.clone();
    match fs_ops::remove_dir_if_empty(&dir) {
        Ok(DirRemoval::Removed) => report.removed.push(dir),
        Ok(DirRemoval::Missing) => {}
        Ok(DirRemoval::NotEmpty) => {
            if only_deferred_left(&dir, &report.deferred) {
                match host.scheduler.schedule_delete(&dir) {
                    Ok(Deletion::Deleted) => report.removed.push(dir),
                    Ok(Deletion::Deferred) => report.deferred.push(dir),
                    Ok(Deletion::Missing) => {}
                    Err(err) => report.record_failure(stage, err),
                }
            } else {
                warn!(dir = %dir.display(), "install directory not empty, leaving it");
                report.kept.push(dir);
            }
        }
        Err(err) => report.record_failure(stage, err),
    }
}

fn only_deferred_left(dir: &Path, deferred: &[PathBuf]) -> bool {
    match fs_ops::dir_entries(dir) {
        Ok(entries) => !entries.is_empty() && entries.iter().all(|e| deferred.contains(e)),
        Err(_) => false,
    }
}
