//! Content store for accepted documents
//!
//! This module handles persistence of document bodies:
//! - Store key derivation and path-safe sanitization
//! - Collision detection with create-new writes
//! - Collision resolution according to the configured policy

mod fs;
mod key;

pub use fs::FsContentStore;
pub use key::StoreKey;

use crate::config::CollisionPolicy;
use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of discriminated keys tried for one document
pub const MAX_DISAMBIGUATION_ATTEMPTS: u32 = 16;

/// Errors that can occur while persisting documents
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No usable store key can be derived from '{0}'")]
    InvalidKey(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a single write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The bytes were written to this path
    Stored(PathBuf),
    /// A document is already stored under the key; nothing was written
    Collision,
}

/// Trait for content store backends
pub trait ContentStore: Send + Sync {
    /// Persists `bytes` under `key` unless the key is already taken
    fn put(&self, key: &StoreKey, bytes: &[u8]) -> StoreResult<PutOutcome>;
}

/// Final placement of a document after collision handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Stored under `key` at `path` after `collisions` taken keys were skipped
    Stored {
        key: StoreKey,
        path: PathBuf,
        collisions: u32,
    },
    /// Dropped because its key was taken
    Discarded { collisions: u32 },
}

/// Stores a document, resolving key collisions according to `policy`
///
/// With [`CollisionPolicy::Disambiguate`] the keys `Foo-2`, `Foo-3`, … are tried in order, up to
/// [`MAX_DISAMBIGUATION_ATTEMPTS`] writes in total; past that the document is discarded.
pub fn place_document(
    store: &dyn ContentStore,
    key: &StoreKey,
    bytes: &[u8],
    policy: CollisionPolicy,
) -> StoreResult<Placement> {
    let mut collisions = 0;
    let mut candidate = key.clone();

    loop {
        match store.put(&candidate, bytes)? {
            PutOutcome::Stored(path) => {
                return Ok(Placement::Stored {
                    key: candidate,
                    path,
                    collisions,
                })
            }
            PutOutcome::Collision => {
                collisions += 1;
                tracing::debug!("Store key collision on '{}'", candidate.token());

                if policy == CollisionPolicy::Discard || collisions >= MAX_DISAMBIGUATION_ATTEMPTS {
                    return Ok(Placement::Discarded { collisions });
                }

                candidate = key.with_discriminator(collisions + 1);
            }
        }
    }
}
