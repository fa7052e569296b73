//! On-disk application of engine patches, with backup and restore.

pub mod transaction;

pub use transaction::FixTransaction;

/// Errors from applying patches to files.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Patch rejected for {path}: {source}")]
    Patch {
        path: String,
        #[source]
        source: common::PatchError,
    },
}
