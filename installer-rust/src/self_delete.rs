use anyhow::{Context, Result};
use std::{fs, io, path::Path};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    /// Queued with the OS; the path goes away at the next reboot.
    Deferred,
    Missing,
}

/// Capability to get rid of a path that may still be in use, such as the
/// running uninstaller.
pub trait DeletionScheduler {
    fn schedule_delete(&self, path: &Path) -> Result<Deletion>;
}

/// Deletes right away when the platform allows it, otherwise registers the
/// path for removal at the next reboot.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebootScheduler;

impl DeletionScheduler for RebootScheduler {
    fn schedule_delete(&self, path: &Path) -> Result<Deletion> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Deletion::Missing),
            Err(err) => return Err(err).with_context(|| format!("stat {}", path.display())),
        };
        let removed = if meta.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        match removed {
            Ok(()) => {
                info!(path = %path.display(), "deleted");
                Ok(Deletion::Deleted)
            }
            Err(err) if cfg!(windows) => {
                warn!(path = %path.display(), error = %err, "direct delete failed, deferring to reboot");
                defer_until_reboot(path)?;
                Ok(Deletion::Deferred)
            }
            Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
        }
    }
}

#[cfg(windows)]
fn defer_until_reboot(path: &Path) -> Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_DELAY_UNTIL_REBOOT};

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let ok = unsafe { MoveFileExW(wide.as_ptr(), std::ptr::null(), MOVEFILE_DELAY_UNTIL_REBOOT) };
    if ok == 0 {
        return Err(io::Error::last_os_error())
            .with_context(|| format!("schedule reboot deletion of {}", path.display()));
    }
    Ok(())
}

#[cfg(not(windows))]
fn defer_until_reboot(path: &Path) -> Result<()> {
    anyhow::bail!(
        "deferred deletion is not available on this platform ({})",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletes_file_and_reports_missing_afterwards() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Uninstall.exe");
        fs::write(&path, "bin").unwrap();

        assert_eq!(RebootScheduler.schedule_delete(&path).unwrap(), Deletion::Deleted);
        assert!(!path.exists());
        assert_eq!(RebootScheduler.schedule_delete(&path).unwrap(), Deletion::Missing);
    }

    #[test]
    fn deletes_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("App");
        fs::create_dir(&dir).unwrap();

        assert_eq!(RebootScheduler.schedule_delete(&dir).unwrap(), Deletion::Deleted);
        assert!(!dir.exists());
    }
}
