use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Serialize a document to JSON and write it atomically: the bytes land in a
/// sibling temp file first and are renamed into place, so readers never see a
/// half-written document.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating collection dir {:?}", dir))?;
    }
    let bytes = serde_json::to_vec_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming into {:?}", path))?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("reading {:?}", path))?;
    serde_json::from_slice(&bytes).with_context(|| format!("decoding {:?}", path))
}
