//! # The Front End: Java sources → engine IR
//!
//! **Role**: Finds Java files, parses them with tree-sitter, lowers every
//! method into [`engine::ir`] and runs the engine with the AIDL stub detector.
//!
//! **Modules**:
//! - [`scan`]: `walkdir` discovery plus an Aho-Corasick prefilter.
//! - [`parser`]: [`JavaHost`], one parser per worker; mmap file loading.
//! - [`lower`]: node → IR lowering.
//! - [`stub`]: [`AidlStubDetector`].
//! - [`path_util`]: canonical, root-relative report paths.

pub mod lower;
pub mod parser;
pub mod path_util;
pub mod scan;
pub mod stub;

pub use parser::{FileAnalysis, JavaHost};
pub use scan::{discover, Prefilter};
pub use stub::AidlStubDetector;

#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    /// Tree-sitter parsing failed.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Byte range exceeds u32::MAX (file too large).
    #[error("Byte range overflow: file size exceeds 4GB limit")]
    ByteRangeOverflow,

    #[error("Not valid UTF-8: {0}")]
    NonUtf8(String),

    #[error("Prefilter construction failed: {0}")]
    Prefilter(String),
}
