use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::{metadata::PackageMetadata, paths::Layout, registry::RegistrationStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Explicit,
    Recorded,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub source: Source,
}

/// Picks the install root: explicit choice, then the location recorded by a
/// previous install, then `<ProgramFiles>/<AppName>`. Reads only.
pub fn resolve(
    explicit: Option<&Path>,
    meta: &PackageMetadata,
    store: &dyn RegistrationStore,
    layout: &Layout,
) -> Result<Resolution> {
    if let Some(path) = explicit {
        return Ok(Resolution {
            path: absolutize(path)?,
            source: Source::Explicit,
        });
    }

    let recorded = store
        .read(&meta.app_name)
        .with_context(|| format!("read install record for {}", meta.app_name))?;
    if let Some(path) = recorded.and_then(|record| record.install_dir()) {
        return Ok(Resolution {
            path,
            source: Source::Recorded,
        });
    }

    Ok(Resolution {
        path: layout.default_install_root(&meta.app_name),
        source: Source::Default,
    })
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("current_dir")?;
    Ok(cwd.join(path))
}
