use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Resolve the directory holding a collection's documents.
pub(crate) fn collection_dir(root: &Path, collection: &str) -> PathBuf {
    root.join(collection)
}

/// Resolve the file path for a document id, validating the id first.
///
/// Ids are uuid-shaped (hex digits and dashes), so anything containing a path
/// separator, a dot or other punctuation is rejected outright. This keeps a
/// crafted id from ever addressing a file outside its collection directory.
pub(crate) fn doc_path(root: &Path, collection: &str, id: &str) -> Result<PathBuf> {
    if !valid_id(id) {
        return Err(anyhow!("invalid document id: {:?}", id));
    }
    Ok(collection_dir(root, collection).join(format!("{}.json", id)))
}

pub(crate) fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
