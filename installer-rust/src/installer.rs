use anyhow::{Context, Result};
use std::{fmt, fs, path::Path};
use tracing::info;

use crate::{
    error::SetupError,
    fs_ops,
    host::Host,
    metadata::PackageMetadata,
    paths::InstallPaths,
    privilege,
    record::InstallRecord,
    resolver::{self, Source},
    shortcuts,
};

const COPY_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Start,
    FilesStaged,
    RegistryWritten,
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Start => "start",
            InstallStage::FilesStaged => "files-staged",
            InstallStage::RegistryWritten => "registry-written",
            InstallStage::Done => "done",
        };
        f.write_str(name)
    }
}

pub struct InstallRequest<'a> {
    pub explicit_dir: Option<&'a Path>,
    /// Bytes of the packaged executable.
    pub payload: &'a [u8],
    /// Binary copied next to the payload as `Uninstall.exe`; normally the
    /// running installer itself.
    pub uninstaller_source: &'a Path,
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub paths: InstallPaths,
    pub source: Source,
    pub record: InstallRecord,
    pub stage: InstallStage,
}

/// Runs the install to completion or stops at the first failing step.
///
/// Nothing is rolled back: every step overwrites what it finds, so running the
/// install again picks up from a partial state.
pub fn install(
    meta: &PackageMetadata,
    host: &Host<'_>,
    request: &InstallRequest<'_>,
) -> Result<InstallReport> {
    privilege::ensure_elevated(host.elevated, "install")?;
    if request.payload.is_empty() {
        return Err(SetupError::InvalidPackage(format!(
            "packaged executable {} is empty",
            meta.exe_name
        ))
        .into());
    }

    let mut stage = InstallStage::Start;
    info!(app = %meta.app_name, %stage, "starting install");

    let resolution = resolver::resolve(request.explicit_dir, meta, host.store, host.layout)?;
    info!(dir = %resolution.path.display(), source = ?resolution.source, "resolved install directory");
    let paths = InstallPaths::new(host.layout, meta, &resolution.path);

    stage_files(&paths, request.payload, request.uninstaller_source).map_err(|source| {
        SetupError::Io {
            context: format!("stage files in {}", paths.install_dir.display()),
            source,
        }
    })?;
    advance(&mut stage, InstallStage::FilesStaged);

    create_shortcuts(meta, &paths)?;

    let record = InstallRecord::for_install(meta, &paths);
    host.store
        .write(&meta.app_name, &record)
        .with_context(|| format!("register {}", meta.app_name))?;
    advance(&mut stage, InstallStage::RegistryWritten);

    advance(&mut stage, InstallStage::Done);
    Ok(InstallReport {
        paths,
        source: resolution.source,
        record,
        stage,
    })
}

fn advance(stage: &mut InstallStage, next: InstallStage) {
    info!(from = %stage, to = %next, "install stage");
    *stage = next;
}

fn stage_files(paths: &InstallPaths, payload: &[u8], uninstaller_source: &Path) -> Result<()> {
    fs::create_dir_all(&paths.install_dir)
        .with_context(|| format!("create {}", paths.install_dir.display()))?;

    fs_ops::write_bytes_with_retry(&paths.exe, payload, COPY_ATTEMPTS)
        .with_context(|| format!("install {}", paths.exe.display()))?;
    info!(path = %paths.exe.display(), bytes = payload.len(), "installed executable");

    fs_ops::copy_file_with_retry(uninstaller_source, &paths.uninstaller, COPY_ATTEMPTS)
        .with_context(|| format!("write uninstaller {}", paths.uninstaller.display()))?;
    info!(path = %paths.uninstaller.display(), "wrote uninstaller");
    Ok(())
}

fn create_shortcuts(meta: &PackageMetadata, paths: &InstallPaths) -> Result<()> {
    let menu = shortcuts::create_shortcut(&paths.menu_dir, &meta.app_name, &paths.exe)
        .context("create start menu shortcut")?;
    info!(path = %menu.display(), "created start menu shortcut");

    let desktop_dir = paths
        .desktop_shortcut
        .parent()
        .context("desktop shortcut has no parent")?;
    let desktop = shortcuts::create_shortcut(desktop_dir, &meta.app_name, &paths.exe)
        .context("create desktop shortcut")?;
    info!(path = %desktop.display(), "created desktop shortcut");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{classify, ErrorKind},
        paths::Layout,
        registry::{MemoryStore, RegistrationStore},
        self_delete::RebootScheduler,
    };
    use std::path::PathBuf;

    struct Fixture {
        tmp: tempfile::TempDir,
        layout: Layout,
        source: PathBuf,
        meta: PackageMetadata,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::under(&tmp.path().join("machine"));
        let source = tmp.path().join("setup.exe");
        fs::write(&source, "installer binary").unwrap();
        let meta = PackageMetadata::new("MyApp", "myapp.exe", "Acme", "2.1.0").unwrap();
        Fixture { tmp, layout, source, meta }
    }

    #[test]
    fn install_stages_files_links_and_record() {
        let fx = fixture();
        let store = MemoryStore::new();
        let host = Host {
            layout: &fx.layout,
            store: &store,
            scheduler: &RebootScheduler,
            elevated: true,
        };
        let request = InstallRequest {
            explicit_dir: None,
            payload: b"app binary",
            uninstaller_source: &fx.source,
        };

        let report = install(&fx.meta, &host, &request).unwrap();

        assert_eq!(report.stage, InstallStage::Done);
        assert_eq!(report.source, Source::Default);
        assert_eq!(fs::read(&report.paths.exe).unwrap(), b"app binary");
        assert_eq!(fs::read(&report.paths.uninstaller).unwrap(), b"installer binary");
        assert!(report.paths.menu_shortcut.exists());
        assert!(report.paths.desktop_shortcut.exists());
        assert_eq!(store.read("MyApp").unwrap(), Some(report.record));
        assert!(fx.tmp.path().exists());
    }

    #[test]
    fn empty_payload_is_rejected_before_touching_disk() {
        let fx = fixture();
        let store = MemoryStore::new();
        let host = Host {
            layout: &fx.layout,
            store: &store,
            scheduler: &RebootScheduler,
            elevated: true,
        };
        let request = InstallRequest {
            explicit_dir: None,
            payload: b"",
            uninstaller_source: &fx.source,
        };

        let err = install(&fx.meta, &host, &request).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::InvalidPackage);
        assert!(!fx.layout.program_files.exists());
        assert!(store.is_empty());
    }

    #[test]
    fn missing_uninstaller_source_aborts_before_shortcuts() {
        let fx = fixture();
        let store = MemoryStore::new();
        let host = Host {
            layout: &fx.layout,
            store: &store,
            scheduler: &RebootScheduler,
            elevated: true,
        };
        let missing = fx.tmp.path().join("gone.exe");
        let request = InstallRequest {
            explicit_dir: None,
            payload: b"app binary",
            uninstaller_source: &missing,
        };

        let err = install(&fx.meta, &host, &request).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Io);
        // no rollback: the executable written before the failure stays
        assert!(fx.layout.program_files.join("MyApp").join("myapp.exe").exists());
        assert!(!fx.layout.desktop.exists());
        assert!(store.is_empty());
    }

    #[test]
    fn shortcut_failure_aborts_before_registration() {
        let fx = fixture();
        // a regular file where the desktop folder should be
        fs::create_dir_all(fx.layout.desktop.parent().unwrap()).unwrap();
        fs::write(&fx.layout.desktop, "not a folder").unwrap();
        let store = MemoryStore::new();
        let host = Host {
            layout: &fx.layout,
            store: &store,
            scheduler: &RebootScheduler,
            elevated: true,
        };
        let request = InstallRequest {
            explicit_dir: None,
            payload: b"app binary",
            uninstaller_source: &fx.source,
        };

        let err = install(&fx.meta, &host, &request).unwrap_err();

        assert_eq!(classify(&err), ErrorKind::Io);
        assert!(store.is_empty());
        let dir = fx.layout.program_files.join("MyApp");
        assert!(dir.join("myapp.exe").exists());
        assert!(dir.join("Uninstall.exe").exists());
    }

    #[test]
    fn denied_registration_fails_fast_and_keeps_files() {
        let fx = fixture();
        let store = MemoryStore::read_only();
        let host = Host {
            layout: &fx.layout,
            store: &store,
            scheduler: &RebootScheduler,
            elevated: true,
        };
        let request = InstallRequest {
            explicit_dir: None,
            payload: b"app binary",
            uninstaller_source: &fx.source,
        };

        let err = install(&fx.meta, &host, &request).unwrap_err();

        assert_eq!(classify(&err), ErrorKind::PermissionDenied);
        assert!(store.is_empty());
        let dir = fx.layout.program_files.join("MyApp");
        assert_eq!(fs::read(dir.join("myapp.exe")).unwrap(), b"app binary");
        assert!(fx.layout.desktop.join("MyApp.lnk").exists());
    }

    #[cfg(unix)]
    #[test]
    fn access_denied_while_staging_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        // root ignores directory modes
        if crate::privilege::is_elevated() {
            return;
        }
        let fx = fixture();
        let locked = fx.tmp.path().join("Locked");
        fs::create_dir_all(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
        let store = MemoryStore::new();
        let host = Host {
            layout: &fx.layout,
            store: &store,
            scheduler: &RebootScheduler,
            elevated: true,
        };
        let request = InstallRequest {
            explicit_dir: Some(&locked),
            payload: b"app binary",
            uninstaller_source: &fx.source,
        };

        let err = install(&fx.meta, &host, &request).unwrap_err();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(classify(&err), ErrorKind::Io);
        assert_eq!(classify(&err).exit_code(), crate::error::EXIT_IO);
        assert!(store.is_empty());
    }

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(InstallStage::FilesStaged.to_string(), "files-staged");
        assert_eq!(InstallStage::RegistryWritten.to_string(), "registry-written");
    }
}
