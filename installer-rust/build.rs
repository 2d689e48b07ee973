use serde::Deserialize;
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

fn main() {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let repo_root = PathBuf::from(manifest_dir).join("..");
    println!("cargo:rerun-if-changed=build.rs");

    let config = load_config(&repo_root).unwrap_or_else(|err| {
        panic!("failed to load config.toml: {err}");
    });

    if let Err(err) = write_config_rs(&out_dir, &config) {
        panic!("failed to write config: {err}");
    }

    if let Err(err) = stage_payload(&repo_root, &config, &out_dir) {
        panic!("failed to stage payload: {err}");
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        #[cfg(windows)]
        if let Err(err) = embed_resources(&repo_root, &config) {
            println!("cargo:warning=failed to embed version resources: {err}");
        }
    }
}

#[derive(Debug, Deserialize)]
struct Config {
    app_name: String,
    exe_name: String,
    publisher: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    payload: String,
    #[serde(default)]
    #[cfg_attr(not(windows), allow(dead_code))]
    icon: String,
}

fn load_config(repo_root: &Path) -> io::Result<Config> {
    let config_path = repo_root.join("config.toml");
    println!("cargo:rerun-if-changed={}", config_path.display());
    let contents = fs::read_to_string(&config_path)?;
    let cfg: Config = toml::from_str(&contents)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(cfg)
}

fn write_config_rs(out_dir: &Path, config: &Config) -> io::Result<()> {
    let out_path = out_dir.join("skiff_config.rs");
    let mut file = File::create(&out_path)?;
    writeln!(file, "pub const APP_NAME: &str = {:?};", config.app_name)?;
    writeln!(file, "pub const EXE_NAME: &str = {:?};", config.exe_name)?;
    writeln!(file, "pub const PUBLISHER: &str = {:?};", config.publisher)?;
    writeln!(file, "pub const VERSION: &str = {:?};", config.version)?;
    Ok(())
}

// The installer refuses to run with an empty payload, so a checkout without the
// packaged binary still builds and tests.
fn stage_payload(repo_root: &Path, config: &Config, out_dir: &Path) -> io::Result<()> {
    let dest = out_dir.join("payload.bin");
    let payload = config.payload.trim();
    if payload.is_empty() {
        fs::write(&dest, b"")?;
        return Ok(());
    }
    let src = repo_root.join(payload);
    println!("cargo:rerun-if-changed={}", src.display());
    if !src.is_file() {
        println!(
            "cargo:warning=payload not found at {}; embedding an empty payload",
            src.display()
        );
        fs::write(&dest, b"")?;
        return Ok(());
    }
    fs::copy(&src, &dest)?;
    Ok(())
}

#[cfg(windows)]
fn embed_resources(repo_root: &Path, config: &Config) -> io::Result<()> {
    let mut res = winres::WindowsResource::new();
    let icon = config.icon.trim();
    if !icon.is_empty() {
        let icon_path = repo_root.join(icon);
        if icon_path.exists() {
            res.set_icon(icon_path.to_string_lossy().as_ref());
        }
    }
    res.set("ProductName", &config.app_name);
    res.set("FileDescription", &format!("{} Setup", config.app_name));
    res.set("CompanyName", &config.publisher);
    if !config.version.is_empty() {
        res.set("FileVersion", &config.version);
        res.set("ProductVersion", &config.version);
    }
    res.compile()?;
    Ok(())
}
