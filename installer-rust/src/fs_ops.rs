use anyhow::{Context, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

/// Outcome of removing a directory that must only go away when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirRemoval {
    Removed,
    Missing,
    NotEmpty,
}

fn retry<F>(mut op: F, attempts: usize) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let mut delay = Duration::from_millis(200);
    for i in 0..attempts {
        match op() {
            Ok(()) => return Ok(()),
            Err(err) => {
                if i + 1 == attempts || !is_transient(&err) {
                    return Err(err);
                }
            }
        }
        std::thread::sleep(delay);
        delay = std::cmp::min(delay * 2, Duration::from_secs(2));
    }
    Ok(())
}

// Sharing violations surface as `Other`/`Interrupted`; access denied and
// missing paths will not fix themselves.
fn is_transient(err: &anyhow::Error) -> bool {
    match err.chain().find_map(|c| c.downcast_ref::<io::Error>()) {
        Some(io_err) => !matches!(
            io_err.kind(),
            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
        ),
        None => true,
    }
}

fn temp_path_for(dest: &Path) -> Result<PathBuf> {
    let parent = dest.parent().context("dest has no parent")?;
    let name = dest
        .file_name()
        .context("dest has no filename")?
        .to_string_lossy();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::from_millis(0))
        .as_nanos();
    Ok(parent.join(format!("{name}.tmp-{nonce}")))
}

// `rename` replaces an existing destination in one step on every platform we
// target, so readers see either the old or the new contents.
fn copy_file_atomic(src: &Path, dest: &Path) -> Result<()> {
    let tmp = temp_path_for(dest)?;
    fs::copy(src, &tmp)
        .with_context(|| format!("copy {} -> {}", src.display(), tmp.display()))?;
    if let Err(err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(err)
            .with_context(|| format!("rename {} -> {}", tmp.display(), dest.display()));
    }
    Ok(())
}

fn write_bytes_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path_for(dest)?;
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    if let Err(err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(err)
            .with_context(|| format!("rename {} -> {}", tmp.display(), dest.display()));
    }
    Ok(())
}

pub fn copy_file_with_retry(src: &Path, dest: &Path, attempts: usize) -> Result<()> {
    retry(|| copy_file_atomic(src, dest), attempts)
}

pub fn write_bytes_with_retry(dest: &Path, bytes: &[u8], attempts: usize) -> Result<()> {
    retry(|| write_bytes_atomic(dest, bytes), attempts)
}

/// Removes a file; a file that is already gone is not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}

/// Single removal attempt that leaves a non-empty directory in place.
pub fn remove_dir_if_empty(path: &Path) -> Result<DirRemoval> {
    let mut entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(DirRemoval::Missing),
        Err(err) => return Err(err).with_context(|| format!("read_dir {}", path.display())),
    };
    if entries.next().is_some() {
        return Ok(DirRemoval::NotEmpty);
    }
    fs::remove_dir(path).with_context(|| format!("remove {}", path.display()))?;
    Ok(DirRemoval::Removed)
}

pub fn dir_entries(path: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(path).with_context(|| format!("read_dir {}", path.display()))?;
    let mut out = Vec::new();
    for entry in entries {
        out.push(entry?.path());
    }
    out.sort();
    Ok(out)
}
