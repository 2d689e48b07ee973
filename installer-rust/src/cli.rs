use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::error::SetupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Install {
        dir: Option<PathBuf>,
        payload: Option<PathBuf>,
    },
    Uninstall,
}

/// Uninstall when asked to, or when running as the emitted uninstaller;
/// install otherwise. `/D=<dir>` is accepted next to `--dir <dir>`.
pub fn select_mode(args: &[String], self_exe: &Path) -> Result<Mode> {
    if args.iter().any(|arg| arg == "--uninstall") || exe_name_is_uninstaller(self_exe) {
        return Ok(Mode::Uninstall);
    }

    let mut dir = None;
    let mut payload = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dir" => dir = Some(PathBuf::from(next_value(&mut iter, "--dir")?)),
            "--payload" => payload = Some(PathBuf::from(next_value(&mut iter, "--payload")?)),
            other => {
                if let Some(value) = other.strip_prefix("/D=") {
                    if value.is_empty() {
                        return Err(SetupError::Usage("/D= needs a directory".into()).into());
                    }
                    dir = Some(PathBuf::from(value));
                } else {
                    return Err(SetupError::Usage(format!("unknown argument: {other}")).into());
                }
            }
        }
    }
    Ok(Mode::Install { dir, payload })
}

fn next_value<'a>(iter: &mut impl Iterator<Item = &'a String>, key: &str) -> Result<&'a String> {
    match iter.next() {
        Some(value) if !value.is_empty() && !value.starts_with("--") => Ok(value),
        _ => Err(SetupError::Usage(format!("{key} needs a value")).into()),
    }
}

fn exe_name_is_uninstaller(exe: &Path) -> bool {
    exe.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase()
        .contains("uninstall")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plain_run_installs_to_default() {
        let mode = select_mode(&[], Path::new("/tmp/setup.exe")).unwrap();
        assert_eq!(mode, Mode::Install { dir: None, payload: None });
    }

    #[test]
    fn uninstaller_name_selects_uninstall() {
        let exe = Path::new("/opt/PlumeImpactor/Uninstall.exe");
        assert_eq!(select_mode(&[], exe).unwrap(), Mode::Uninstall);
    }

    #[test]
    fn uninstall_flag_selects_uninstall() {
        let mode = select_mode(&args(&["--uninstall"]), Path::new("setup.exe")).unwrap();
        assert_eq!(mode, Mode::Uninstall);
    }

    #[test]
    fn dir_and_payload_are_parsed() {
        let mode = select_mode(
            &args(&["--dir", "D:\\Apps\\Plume", "--payload", "build/plume.exe"]),
            Path::new("setup.exe"),
        )
        .unwrap();
        assert_eq!(
            mode,
            Mode::Install {
                dir: Some(PathBuf::from("D:\\Apps\\Plume")),
                payload: Some(PathBuf::from("build/plume.exe")),
            }
        );
    }

    #[test]
    fn nsis_style_dir_is_accepted() {
        let mode = select_mode(&args(&["/D=C:\\Tools\\Plume"]), Path::new("setup.exe")).unwrap();
        assert_eq!(
            mode,
            Mode::Install { dir: Some(PathBuf::from("C:\\Tools\\Plume")), payload: None }
        );
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        let cases: [&[&str]; 4] = [&["--dir"], &["--dir", "--payload"], &["--frobnicate"], &["/D="]];
        for bad in cases {
            let err = select_mode(&args(bad), Path::new("setup.exe")).unwrap_err();
            assert_eq!(classify(&err), ErrorKind::Usage, "{bad:?}");
        }
    }
}
