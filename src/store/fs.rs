//! Filesystem content store
//!
//! Documents are written as `<root>/<token>.html`. Files are opened with create-new semantics so a
//! second write under the same key is detected by the filesystem itself and reported as a
//! collision; nothing is ever overwritten. A write that fails part way removes its file, so a
//! truncated document never stays under the root holding a key.

use crate::store::{ContentStore, PutOutcome, StoreKey, StoreResult};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Content store backed by a directory
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The output root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path a key is stored under
    pub fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.root.join(key.file_name())
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, key: &StoreKey, bytes: &[u8]) -> StoreResult<PutOutcome> {
        let path = self.path_for(key);

        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(PutOutcome::Collision),
            Err(e) => return Err(e.into()),
        };

        write_or_remove(&path, file, bytes)?;

        Ok(PutOutcome::Stored(path))
    }
}

/// Writes `bytes` to the freshly created file at `path`, removing it if the write fails
fn write_or_remove(path: &Path, mut out: impl Write, bytes: &[u8]) -> io::Result<()> {
    let written = out.write_all(bytes).and_then(|()| out.flush());
    drop(out);

    if let Err(e) = written {
        if let Err(remove_err) = fs::remove_file(path) {
            tracing::warn!(
                "Failed to remove partial document {}: {}",
                path.display(),
                remove_err
            );
        }
        return Err(e);
    }

    Ok(())
}
