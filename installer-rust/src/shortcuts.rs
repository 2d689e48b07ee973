use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::fs_ops;

pub fn shortcut_path(dir: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        bail!("shortcut name is empty");
    }
    Ok(dir.join(format!("{name}.lnk")))
}

/// Writes `<dir>/<name>.lnk` pointing at `target`, replacing any existing link.
pub fn create_shortcut(dir: &Path, name: &str, target: &Path) -> Result<PathBuf> {
    let lnk_path = shortcut_path(dir, name)?;
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    fs_ops::remove_file_if_exists(&lnk_path)?;

    write_link(target, &lnk_path)?;
    Ok(lnk_path)
}

#[cfg(windows)]
fn write_link(target: &Path, lnk_path: &Path) -> Result<()> {
    let link = mslnk::ShellLink::new(target)
        .with_context(|| format!("read shortcut target {}", target.display()))?;
    link.create_lnk(lnk_path)
        .with_context(|| format!("write {}", lnk_path.display()))
}

// No shell links off Windows; a symlink under the same name launches the same
// target from a file manager.
#[cfg(unix)]
fn write_link(target: &Path, lnk_path: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, lnk_path)
        .with_context(|| format!("link {} -> {}", lnk_path.display(), target.display()))
}

#[cfg(not(any(windows, unix)))]
fn write_link(target: &Path, lnk_path: &Path) -> Result<()> {
    bail!(
        "shortcuts are not supported on this platform ({} -> {})",
        lnk_path.display(),
        target.display()
    )
}

pub fn remove_shortcut(dir: &Path, name: &str) -> Result<bool> {
    let lnk_path = shortcut_path(dir, name)?;
    fs_ops::remove_file_if_exists(&lnk_path)
}
