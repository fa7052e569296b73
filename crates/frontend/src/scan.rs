//! Source discovery and the Aho-Corasick prefilter.
//!
//! Most Java files in a tree never touch a binder stub. Before paying for a
//! parse, each file's bytes are scanned once for `.Stub` and for the names
//! of the configured check APIs; a file without both is skipped.
//!
//! **Memory model**: one mmap per file, no heap allocation per match.

use aho_corasick::{AhoCorasick, MatchKind};
use engine::EngineConfig;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::FrontendError;

const STUB_MARKER: &str = ".Stub";

/// Walks `root` for `.java` files, skipping build output and VCS metadata.
///
/// A `root` that is itself a file is returned as-is. Unreadable directory
/// entries are logged and skipped. Paths come back sorted.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_scan_excluded(e.path()))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("java"))
        .collect();
    files.sort();
    files
}

/// Returns `true` if the directory should not be descended into.
fn is_scan_excluded(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| {
            matches!(
                name,
                ".git" | ".repo" | ".enforcer" | "build" | "out" | "target" | "node_modules" | ".gradle" | ".idea"
            )
        })
        .unwrap_or(false)
}

/// Cheap byte-level test for "might contain a convertible stub method".
pub struct Prefilter {
    automaton: AhoCorasick,
}

impl Prefilter {
    /// Pattern 0 is the stub marker; the rest are check-API method names.
    pub fn new(config: &EngineConfig) -> Result<Self, FrontendError> {
        let mut patterns: Vec<&str> = vec![STUB_MARKER];
        patterns.extend(config.check_apis.iter().map(|a| a.method.as_str()));
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .map_err(|e| FrontendError::Prefilter(e.to_string()))?;
        Ok(Self { automaton })
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        let mut stub = false;
        let mut api = false;
        for m in self.automaton.find_iter(bytes) {
            if m.pattern().as_usize() == 0 {
                stub = true;
            } else {
                api = true;
            }
            if stub && api {
                return true;
            }
        }
        false
    }

    /// Applies [`matches`](Self::matches) to a file through a read-only mmap.
    pub fn matches_file(&self, path: &Path) -> Result<bool, FrontendError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }
        // SAFETY: mmap is read-only; the file handle outlives the mmap.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(self.matches(&mmap))
    }
}
