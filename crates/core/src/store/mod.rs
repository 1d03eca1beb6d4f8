//! Content-addressed asset store.
//!
//! Downloaded payloads are written under their own file name inside one
//! directory. A payload whose SHA-256 digest is already present anywhere in
//! the store is never written again. When the requested name is taken by a
//! different payload, a counter is inserted before the extension
//! (`logo.png` -> `logo_0.png` -> `logo_1.png` ...) until a free name or an
//! identical payload is found. Existing files are never overwritten.

pub mod hash;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
pub use hash::content_digest;

/// What a store call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// A new file was created.
    Written,
    /// An identical payload was already stored; nothing was written.
    AlreadyStored,
}

/// Result of persisting one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Path of the file that holds the payload.
    pub path: PathBuf,
    pub outcome: StoreOutcome,
}

/// Directory of assets deduplicated by content digest.
#[derive(Debug)]
pub struct ContentStore {
    dir: PathBuf,
    index: HashMap<String, PathBuf>,
}

impl ContentStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// Files already present are hashed so that re-runs recognise payloads
    /// stored by earlier runs.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;

        let mut index = HashMap::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let data = fs::read(&path).await?;
            index.entry(content_digest(&data)).or_insert(path);
        }

        tracing::debug!(dir = %dir.display(), files = index.len(), "content store opened");

        Ok(Self { dir, index })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of distinct payloads known to the store.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Persist `data` under `file_name`, or find where it already lives.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if `file_name` is not a plain file name
    /// - `Error::NamesExhausted` if every disambiguated name is taken
    /// - `Error::Io` on filesystem failures
    pub async fn store(&mut self, file_name: &str, data: &[u8]) -> Result<StoredAsset, Error> {
        if file_name.is_empty() || Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
            return Err(Error::InvalidInput(format!("not a plain file name: {file_name:?}")));
        }

        let digest = content_digest(data);

        if let Some(existing) = self.index.get(&digest)
            && fs::try_exists(existing).await?
        {
            tracing::debug!(path = %existing.display(), "payload already stored");
            return Ok(StoredAsset { path: existing.clone(), outcome: StoreOutcome::AlreadyStored });
        }

        let mut candidate = self.dir.join(file_name);
        let mut counter: u64 = 0;

        loop {
            match write_new(&candidate, data).await {
                Ok(()) => {
                    tracing::info!(path = %candidate.display(), "stored asset");
                    self.index.insert(digest, candidate.clone());
                    return Ok(StoredAsset { path: candidate, outcome: StoreOutcome::Written });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let existing = fs::read(&candidate).await?;
                    if content_digest(&existing) == digest {
                        tracing::debug!(path = %candidate.display(), "payload already stored");
                        self.index.insert(digest, candidate.clone());
                        return Ok(StoredAsset { path: candidate, outcome: StoreOutcome::AlreadyStored });
                    }
                    candidate = self.dir.join(numbered_name(file_name, counter));
                    counter = counter
                        .checked_add(1)
                        .ok_or_else(|| Error::NamesExhausted(self.dir.join(file_name)))?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Create `path` exclusively and write `data` into it.
async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path).await?;
    file.write_all(data).await?;
    file.flush().await
}

/// `logo.png` + 3 -> `logo_3.png`; names without an extension get a suffix.
fn numbered_name(file_name: &str, counter: u64) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{counter}.{ext}"),
        _ => format!("{file_name}_{counter}"),
    }
}
