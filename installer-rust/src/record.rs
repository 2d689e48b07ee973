use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{metadata::PackageMetadata, paths::InstallPaths};

/// Uninstall registration as host package managers read it. Field names are
/// the registry value names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstallRecord {
    pub display_name: String,
    pub publisher: String,
    pub install_location: String,
    pub uninstall_string: String,
    #[serde(with = "flag")]
    pub no_modify: bool,
    #[serde(with = "flag")]
    pub no_repair: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_icon: Option<String>,
}

impl InstallRecord {
    pub fn for_install(meta: &PackageMetadata, paths: &InstallPaths) -> Self {
        Self {
            display_name: meta.app_name.clone(),
            publisher: meta.publisher.clone(),
            install_location: paths.install_dir.to_string_lossy().into_owned(),
            uninstall_string: format!("\"{}\"", paths.uninstaller.display()),
            no_modify: true,
            no_repair: true,
            display_version: (!meta.version.is_empty()).then(|| meta.version.clone()),
            display_icon: Some(paths.exe.to_string_lossy().into_owned()),
        }
    }

    pub fn install_dir(&self) -> Option<PathBuf> {
        let location = self.install_location.trim();
        (!location.is_empty()).then(|| PathBuf::from(location))
    }
}

// Capability flags are DWORD 0/1 in the registry; keep the same shape on disk.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(u32::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u32::deserialize(deserializer)? != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Layout;
    use std::path::Path;

    fn record() -> InstallRecord {
        let meta =
            PackageMetadata::new("PlumeImpactor", "plumeimpactor.exe", "Samara", "1.0.0").unwrap();
        let layout = Layout::under(Path::new("/stage"));
        let dir = layout.default_install_root(&meta.app_name);
        InstallRecord::for_install(&meta, &InstallPaths::new(&layout, &meta, &dir))
    }

    #[test]
    fn for_install_sets_flags_and_locations() {
        let rec = record();
        assert_eq!(rec.display_name, "PlumeImpactor");
        assert_eq!(rec.publisher, "Samara");
        assert!(rec.no_modify);
        assert!(rec.no_repair);
        let expected = Path::new("/stage")
            .join("Program Files")
            .join("PlumeImpactor")
            .join("Uninstall.exe");
        assert_eq!(rec.uninstall_string, format!("\"{}\"", expected.display()));
        assert_eq!(rec.display_version.as_deref(), Some("1.0.0"));
        assert_eq!(
            rec.install_dir().unwrap(),
            Path::new("/stage").join("Program Files").join("PlumeImpactor")
        );
    }

    #[test]
    fn json_uses_registry_value_names() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["DisplayName"], "PlumeImpactor");
        assert_eq!(value["NoModify"], 1);
        assert_eq!(value["NoRepair"], 1);
        assert!(value.get("InstallLocation").is_some());
        assert!(value.get("UninstallString").is_some());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let raw = r#"{"DisplayName":"App","Publisher":"Acme","InstallLocation":"","UninstallString":"u","NoModify":0,"NoRepair":1}"#;
        let rec: InstallRecord = serde_json::from_str(raw).unwrap();
        assert!(!rec.no_modify);
        assert!(rec.no_repair);
        assert!(rec.display_version.is_none());
        assert!(rec.install_dir().is_none());
    }
}
