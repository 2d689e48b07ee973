use anyhow::Result;

use crate::error::SetupError;

/// What the installer was built for. Names are used verbatim as registry
/// values and path components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub app_name: String,
    pub exe_name: String,
    pub publisher: String,
    pub version: String,
}

impl PackageMetadata {
    pub fn new(app_name: &str, exe_name: &str, publisher: &str, version: &str) -> Result<Self> {
        validate_segment("app_name", app_name)?;
        validate_segment("exe_name", exe_name)?;
        if publisher.trim().is_empty() {
            return Err(SetupError::InvalidPackage("publisher is empty".into()).into());
        }
        Ok(Self {
            app_name: app_name.to_string(),
            exe_name: exe_name.to_string(),
            publisher: publisher.to_string(),
            version: version.trim().to_string(),
        })
    }

    pub fn from_config() -> Result<Self> {
        Self::new(
            crate::config::APP_NAME,
            crate::config::EXE_NAME,
            crate::config::PUBLISHER,
            crate::config::VERSION,
        )
    }
}

fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SetupError::InvalidPackage(format!("{field} is empty")).into());
    }
    if value != value.trim() {
        return Err(SetupError::InvalidPackage(format!(
            "{field} has leading or trailing whitespace: {value:?}"
        ))
        .into());
    }
    if value == "." || value == ".." || value.contains(['/', '\\', ':']) {
        return Err(SetupError::InvalidPackage(format!(
            "{field} must be a single path segment: {value:?}"
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};

    #[test]
    fn accepts_plain_names() {
        let meta = PackageMetadata::new("PlumeImpactor", "plumeimpactor.exe", "Samara", "1.0.0")
            .unwrap();
        assert_eq!(meta.app_name, "PlumeImpactor");
        assert_eq!(meta.exe_name, "plumeimpactor.exe");
        assert_eq!(meta.publisher, "Samara");
    }

    #[test]
    fn rejects_empty_fields() {
        for (app, exe, publisher) in [
            ("", "app.exe", "Acme"),
            ("App", "", "Acme"),
            ("App", "app.exe", "  "),
        ] {
            let err = PackageMetadata::new(app, exe, publisher, "").unwrap_err();
            assert_eq!(classify(&err), ErrorKind::InvalidPackage);
        }
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["..", ".", "sub\\app.exe", "sub/app.exe", "C:app.exe"] {
            let err = PackageMetadata::new("App", name, "Acme", "").unwrap_err();
            assert!(err.to_string().contains("single path segment"), "{name}");
        }
    }

    #[test]
    fn config_metadata_is_valid() {
        PackageMetadata::from_config().unwrap();
    }
}
