//! Registration Store: where installation records live between install and
//! uninstall.
//!
//! Records are keyed by application name under the machine-wide uninstall
//! namespace. A write replaces the whole record at once, `read` reports a
//! missing record as `None`, and `delete` of a missing record succeeds.

use anyhow::{Context, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{fs_ops, record::InstallRecord};

pub const UNINSTALL_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";
pub const DEFAULT_FILE_STORE_DIR: &str = "/var/lib/skiff/uninstall";
const REGISTRY_DIR_ENV: &str = "SKIFF_REGISTRY_DIR";

pub trait RegistrationStore {
    fn write(&self, app_name: &str, record: &InstallRecord) -> Result<()>;
    fn read(&self, app_name: &str) -> Result<Option<InstallRecord>>;
    fn delete(&self, app_name: &str) -> Result<()>;
}

/// The platform registry, or a [`FileStore`] when `SKIFF_REGISTRY_DIR` is set.
pub fn default_store() -> Box<dyn RegistrationStore> {
    if let Some(dir) = std::env::var_os(REGISTRY_DIR_ENV).filter(|v| !v.is_empty()) {
        return Box::new(FileStore::new(PathBuf::from(dir)));
    }
    #[cfg(windows)]
    {
        Box::new(WindowsRegistryStore)
    }
    #[cfg(not(windows))]
    {
        Box::new(FileStore::new(PathBuf::from(DEFAULT_FILE_STORE_DIR)))
    }
}

/// In-process store. `read_only` makes every mutation fail the way an
/// unelevated registry write does.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: std::cell::RefCell<std::collections::BTreeMap<String, InstallRecord>>,
    read_only: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            records: Default::default(),
            read_only: true,
        }
    }

    pub fn with_record(self, app_name: &str, record: InstallRecord) -> Self {
        self.records.borrow_mut().insert(app_name.to_string(), record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    fn ensure_writable(&self, app_name: &str) -> Result<()> {
        if self.read_only {
            return Err(crate::error::SetupError::PermissionDenied(format!(
                "registration store is read-only ({app_name})"
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
impl RegistrationStore for MemoryStore {
    fn write(&self, app_name: &str, record: &InstallRecord) -> Result<()> {
        self.ensure_writable(app_name)?;
        self.records
            .borrow_mut()
            .insert(app_name.to_string(), record.clone());
        Ok(())
    }

    fn read(&self, app_name: &str) -> Result<Option<InstallRecord>> {
        Ok(self.records.borrow().get(app_name).cloned())
    }

    fn delete(&self, app_name: &str) -> Result<()> {
        self.ensure_writable(app_name)?;
        self.records.borrow_mut().remove(app_name);
        Ok(())
    }
}

/// One JSON document per application, replaced by rename so a reader never
/// sees half a record.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, app_name: &str) -> PathBuf {
        self.dir.join(format!("{app_name}.json"))
    }
}

impl RegistrationStore for FileStore {
    fn write(&self, app_name: &str, record: &InstallRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let contents = serde_json::to_vec_pretty(record).context("serialize install record")?;
        let path = self.record_path(app_name);
        fs_ops::write_bytes_with_retry(&path, &contents, 3)
            .with_context(|| format!("write install record {}", path.display()))
    }

    fn read(&self, app_name: &str) -> Result<Option<InstallRecord>> {
        let path = self.record_path(app_name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        let record = serde_json::from_str(&contents)
            .with_context(|| format!("parse {}", path.display()))?;
        Ok(Some(record))
    }

    fn delete(&self, app_name: &str) -> Result<()> {
        fs_ops::remove_file_if_exists(&self.record_path(app_name))?;
        Ok(())
    }
}

/// `HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\<app>` in the
/// 64-bit registry view.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistryStore;

#[cfg(windows)]
impl WindowsRegistryStore {
    fn key_path(app_name: &str) -> String {
        format!(r"{UNINSTALL_KEY}\{app_name}")
    }
}

#[cfg(windows)]
impl RegistrationStore for WindowsRegistryStore {
    fn write(&self, app_name: &str, record: &InstallRecord) -> Result<()> {
        use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_ALL_ACCESS, KEY_WOW64_64KEY};
        use winreg::transaction::Transaction;
        use winreg::RegKey;

        let path = Self::key_path(app_name);
        let tx = Transaction::new().context("begin registry transaction")?;
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let (key, _) = hklm
            .create_subkey_transacted_with_flags(&path, &tx, KEY_ALL_ACCESS | KEY_WOW64_64KEY)
            .with_context(|| format!("create HKLM\\{path}"))?;

        key.set_value("DisplayName", &record.display_name)
            .context("set DisplayName")?;
        key.set_value("Publisher", &record.publisher)
            .context("set Publisher")?;
        key.set_value("InstallLocation", &record.install_location)
            .context("set InstallLocation")?;
        key.set_value("UninstallString", &record.uninstall_string)
            .context("set UninstallString")?;
        key.set_value("NoModify", &u32::from(record.no_modify))
            .context("set NoModify")?;
        key.set_value("NoRepair", &u32::from(record.no_repair))
            .context("set NoRepair")?;
        set_optional(&key, "DisplayVersion", record.display_version.as_ref())?;
        set_optional(&key, "DisplayIcon", record.display_icon.as_ref())?;

        tx.commit().context("commit registry transaction")?;
        Ok(())
    }

    fn read(&self, app_name: &str) -> Result<Option<InstallRecord>> {
        use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_64KEY};
        use winreg::RegKey;

        let path = Self::key_path(app_name);
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let key = match hklm.open_subkey_with_flags(&path, KEY_READ | KEY_WOW64_64KEY) {
            Ok(key) => key,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("open HKLM\\{path}")),
        };

        let text = |name: &str| -> Result<String> {
            match key.get_value::<String, _>(name) {
                Ok(value) => Ok(value),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
                Err(err) => Err(err).with_context(|| format!("read {name}")),
            }
        };
        let flag = |name: &str| key.get_value::<u32, _>(name).map(|v| v != 0).unwrap_or(false);
        let optional = |name: &str| key.get_value::<String, _>(name).ok();

        Ok(Some(InstallRecord {
            display_name: text("DisplayName")?,
            publisher: text("Publisher")?,
            install_location: text("InstallLocation")?,
            uninstall_string: text("UninstallString")?,
            no_modify: flag("NoModify"),
            no_repair: flag("NoRepair"),
            display_version: optional("DisplayVersion"),
            display_icon: optional("DisplayIcon"),
        }))
    }

    fn delete(&self, app_name: &str) -> Result<()> {
        use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_WOW64_64KEY};
        use winreg::RegKey;

        let path = Self::key_path(app_name);
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        match hklm.delete_subkey_with_flags(&path, KEY_WOW64_64KEY) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("delete HKLM\\{path}")),
        }
    }
}

#[cfg(windows)]
fn set_optional(key: &winreg::RegKey, name: &str, value: Option<&String>) -> Result<()> {
    match value {
        Some(value) => key
            .set_value(name, value)
            .with_context(|| format!("set {name}")),
        None => match key.delete_value(name) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("clear {name}")),
        },
    }
}
