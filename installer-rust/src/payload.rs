use anyhow::{Context, Result};
use std::{borrow::Cow, path::Path};

const EMBEDDED_PAYLOAD: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/payload.bin"));

/// The packaged executable: the bytes compiled in by `build.rs`, or a file
/// given on the command line instead.
pub fn load(override_path: Option<&Path>) -> Result<Cow<'static, [u8]>> {
    match override_path {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read payload {}", path.display()))?;
            Ok(Cow::Owned(bytes))
        }
        None => Ok(Cow::Borrowed(EMBEDDED_PAYLOAD)),
    }
}
