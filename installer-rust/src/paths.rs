use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::metadata::PackageMetadata;

pub const UNINSTALLER_NAME: &str = "Uninstall.exe";

const PROGRAM_FILES_ENV: &str = "SKIFF_PROGRAM_FILES";
const START_MENU_ENV: &str = "SKIFF_START_MENU";
const DESKTOP_ENV: &str = "SKIFF_DESKTOP";

pub fn self_path() -> Result<PathBuf> {
    std::env::current_exe().context("current_exe")
}

/// Machine-wide roots everything else is placed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub program_files: PathBuf,
    pub start_menu: PathBuf,
    pub desktop: PathBuf,
}

impl Layout {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            program_files: program_files_root()?,
            start_menu: shared_start_menu_dir()?,
            desktop: shared_desktop_dir()?,
        })
    }

    /// All three roots below one directory, for staging trees and tests.
    pub fn under(root: &Path) -> Self {
        Self {
            program_files: root.join("Program Files"),
            start_menu: root.join("Start Menu").join("Programs"),
            desktop: root.join("Desktop"),
        }
    }

    pub fn default_install_root(&self, app_name: &str) -> PathBuf {
        self.program_files.join(app_name)
    }
}

/// Every artifact an install produces, derived from the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub install_dir: PathBuf,
    pub exe: PathBuf,
    pub uninstaller: PathBuf,
    pub menu_dir: PathBuf,
    pub menu_shortcut: PathBuf,
    pub desktop_shortcut: PathBuf,
}

impl InstallPaths {
    pub fn new(layout: &Layout, meta: &PackageMetadata, install_dir: &Path) -> Self {
        let link_name = format!("{}.lnk", meta.app_name);
        let menu_dir = layout.start_menu.join(&meta.app_name);
        Self {
            install_dir: install_dir.to_path_buf(),
            exe: install_dir.join(&meta.exe_name),
            uninstaller: install_dir.join(UNINSTALLER_NAME),
            menu_shortcut: menu_dir.join(&link_name),
            menu_dir,
            desktop_shortcut: layout.desktop.join(&link_name),
        }
    }
}

pub fn is_uninstaller_binary(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.eq_ignore_ascii_case(UNINSTALLER_NAME))
        .unwrap_or(false)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(windows)]
fn program_files_root() -> Result<PathBuf> {
    Ok(env_path(PROGRAM_FILES_ENV)
        .or_else(|| env_path("ProgramW6432"))
        .or_else(|| env_path("ProgramFiles"))
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files")))
}

#[cfg(not(windows))]
fn program_files_root() -> Result<PathBuf> {
    Ok(env_path(PROGRAM_FILES_ENV).unwrap_or_else(|| PathBuf::from("/opt")))
}

#[cfg(windows)]
fn shared_start_menu_dir() -> Result<PathBuf> {
    if let Some(dir) = env_path(START_MENU_ENV) {
        return Ok(dir);
    }
    let data = env_path("ProgramData").context("ProgramData not set")?;
    Ok(data
        .join("Microsoft")
        .join("Windows")
        .join("Start Menu")
        .join("Programs"))
}

#[cfg(not(windows))]
fn shared_start_menu_dir() -> Result<PathBuf> {
    Ok(env_path(START_MENU_ENV).unwrap_or_else(|| PathBuf::from("/usr/share/applications")))
}

#[cfg(windows)]
fn shared_desktop_dir() -> Result<PathBuf> {
    if let Some(dir) = env_path(DESKTOP_ENV) {
        return Ok(dir);
    }
    let public = env_path("PUBLIC").context("PUBLIC not set")?;
    Ok(public.join("Desktop"))
}

#[cfg(not(windows))]
fn shared_desktop_dir() -> Result<PathBuf> {
    Ok(env_path(DESKTOP_ENV).unwrap_or_else(|| PathBuf::from("/usr/share/desktop")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn meta() -> PackageMetadata {
        PackageMetadata::new("PlumeImpactor", "plumeimpactor.exe", "Samara", "1.0.0").unwrap()
    }

    #[test]
    fn layout_prefers_env_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let keys = [PROGRAM_FILES_ENV, START_MENU_ENV, DESKTOP_ENV];
        let prior: Vec<_> = keys.iter().map(|k| std::env::var_os(k)).collect();

        std::env::set_var(PROGRAM_FILES_ENV, tmp.path().join("pf"));
        std::env::set_var(START_MENU_ENV, tmp.path().join("menu"));
        std::env::set_var(DESKTOP_ENV, tmp.path().join("desk"));
        let layout = Layout::from_env().unwrap();

        for (key, value) in keys.iter().zip(prior) {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }

        assert_eq!(layout.program_files, tmp.path().join("pf"));
        assert_eq!(layout.start_menu, tmp.path().join("menu"));
        assert_eq!(layout.desktop, tmp.path().join("desk"));
    }

    #[test]
    fn default_install_root_joins_app_name() {
        let layout = Layout::under(Path::new(r"C:\Stage"));
        assert_eq!(
            layout.default_install_root("PlumeImpactor"),
            Path::new(r"C:\Stage").join("Program Files").join("PlumeImpactor")
        );
    }

    #[test]
    fn install_paths_follow_layout() {
        let layout = Layout::under(Path::new("/stage"));
        let dir = layout.default_install_root("PlumeImpactor");
        let paths = InstallPaths::new(&layout, &meta(), &dir);

        assert_eq!(paths.exe, dir.join("plumeimpactor.exe"));
        assert_eq!(paths.uninstaller, dir.join("Uninstall.exe"));
        assert_eq!(
            paths.menu_shortcut,
            layout.start_menu.join("PlumeImpactor").join("PlumeImpactor.lnk")
        );
        assert_eq!(paths.desktop_shortcut, layout.desktop.join("PlumeImpactor.lnk"));
    }

    #[test]
    fn uninstaller_binary_name_is_case_insensitive() {
        assert!(is_uninstaller_binary(Path::new("/opt/App/uninstall.EXE")));
        assert!(!is_uninstaller_binary(Path::new("/opt/App/setup.exe")));
        assert!(!is_uninstaller_binary(Path::new("")));
    }
}
