//!
//! quill storage module
//! --------------------
//! This module implements the on-disk document store for quill using a simple
//! two-level directory layout: `collection/<id>.json`. Each collection is a
//! directory under the configured root and each document is one JSON file
//! whose name is the document id. There is deliberately no in-memory cache:
//! every operation reads or writes the filesystem, so concurrent processes
//! sharing a root observe a consistent view.
//!
//! Key responsibilities:
//! - Document persistence with atomic temp-file + rename writes.
//! - Id validation so a crafted id can never escape its collection directory.
//! - Stable listing order (sorted by file name) for repeatable reads.
//!
//! The public API centers around the `Store` type, which is usually wrapped in
//! a thread-safe `SharedStore` (`Arc<Mutex<Store>>`) elsewhere in the codebase.

use anyhow::Result;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io::ErrorKind};

mod io;
mod paths;

/// Collection holding user identity documents.
pub const USERS: &str = "users";
/// Collection holding post documents.
pub const POSTS: &str = "posts";

/// Core on-disk storage handle for a quill collection tree.
///
/// Store exposes methods to put, get, list and delete JSON documents inside
/// named collections. It operates under a configured root folder and resolves
/// logical ids like `("posts", "4be1…")` into real file paths.
#[derive(Clone)]
pub struct Store {
    /// Root folder for all collections.
    root: PathBuf,
}

impl Store {
    /// Create a new Store rooted at the given filesystem path.
    /// The directory is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Return the configured root folder for this Store.
    pub fn root_path(&self) -> &PathBuf {
        &self.root
    }

    /// Persist a document under `collection/<id>.json`, replacing any
    /// previous version. The write is atomic (temp file + rename).
    pub fn put<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<()> {
        let path = paths::doc_path(&self.root, collection, id)?;
        io::write_json_atomic(&path, doc)
    }

    /// Load a document by id. Returns `Ok(None)` when the document does not
    /// exist; malformed ids are treated the same way rather than as errors.
    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        let Ok(path) = paths::doc_path(&self.root, collection, id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(io::read_json(&path)?))
    }

    /// Remove a document. Returns whether a document actually existed.
    pub fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let Ok(path) = paths::doc_path(&self.root, collection, id) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read every document in a collection, sorted by file name so repeated
    /// reads with no intervening writes yield the same order.
    pub fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let dir = paths::collection_dir(&self.root, collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let p = entry?.path();
            if p.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(p);
            }
        }
        files.sort();
        let mut out = Vec::with_capacity(files.len());
        for p in files {
            out.push(io::read_json(&p)?);
        }
        Ok(out)
    }
}

/// Thread-safe shared wrapper around `Store` used by the HTTP layer and the
/// repositories. Locking is per-operation; the store itself holds no state
/// beyond the root path, so the mutex only serializes in-process writers.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Ok(SharedStore(Arc::new(Mutex::new(Store::new(root)?))))
    }
}
