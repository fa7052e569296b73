//! # Baseline: known-finding suppression
//!
//! A baseline records fingerprints of findings that were accepted when the
//! baseline was taken, so later scans only surface new ones.
//!
//! ## Fingerprint
//! BLAKE3 over `rule_id`, file path, method and synthesized annotation,
//! truncated to 128 bits and hex-encoded. Source offsets are **not** hashed:
//! edits above a method must not change its fingerprint.

use crate::diagnostic::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Errors from baseline load/save.
#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed baseline: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Computes the stable fingerprint of a finding.
///
/// # Examples
/// ```
/// # use common::baseline::fingerprint;
/// let a = fingerprint("Rule", "a/B.java", "B.m", "@Ann(P)");
/// let b = fingerprint("Rule", "a/B.java", "B.m", "@Ann(P)");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 32);
/// ```
pub fn fingerprint(rule_id: &str, path: &str, method: &str, annotation: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [rule_id, path, method, annotation] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    digest.to_hex().as_str()[..32].to_string()
}

/// Set of accepted finding fingerprints, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub fingerprints: BTreeSet<String>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a baseline accepting every given finding.
    pub fn from_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> Self {
        Self {
            fingerprints: diagnostics.into_iter().map(Self::key).collect(),
        }
    }

    fn key(d: &Diagnostic) -> String {
        fingerprint(&d.rule_id, &d.path, &d.method, &d.annotation)
    }

    pub fn contains(&self, diagnostic: &Diagnostic) -> bool {
        self.fingerprints.contains(&Self::key(diagnostic))
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Drops every finding already recorded in the baseline.
    ///
    /// Returns the number of suppressed findings.
    pub fn filter(&self, diagnostics: &mut Vec<Diagnostic>) -> usize {
        let before = diagnostics.len();
        diagnostics.retain(|d| !self.contains(d));
        before - diagnostics.len()
    }

    pub fn load(path: &Path) -> Result<Self, BaselineError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the baseline, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), BaselineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Fidelity, Severity};
    use crate::span::{Position, SourceSpan};

    fn finding(method: &str, offset: u32) -> Diagnostic {
        Diagnostic {
            rule_id: "SimpleManualPermissionEnforcement".into(),
            severity: Severity::Warning,
            message: "m".into(),
            location: SourceSpan::new(
                Position::new(offset, 3, 1),
                Position::new(offset + 10, 3, 11),
            ),
            path: "src/Svc.java".into(),
            method: method.into(),
            interface: "ISvc".into(),
            fidelity: Fidelity::Exact,
            annotation: "@EnforcePermission(P)".into(),
            notes: vec![],
            patch: None,
        }
    }

    #[test]
    fn test_fingerprint_ignores_offsets() {
        let baseline = Baseline::from_diagnostics([&finding("Svc.a", 10)]);
        assert!(baseline.contains(&finding("Svc.a", 500)));
        assert!(!baseline.contains(&finding("Svc.b", 10)));
    }

    #[test]
    fn test_fingerprint_is_field_separated() {
        assert_ne!(
            fingerprint("R", "ab", "c", "d"),
            fingerprint("R", "a", "bc", "d")
        );
    }

    #[test]
    fn test_filter_counts_suppressed() {
        let baseline = Baseline::from_diagnostics([&finding("Svc.a", 10)]);
        let mut found = vec![finding("Svc.a", 10), finding("Svc.b", 40)];
        assert_eq!(baseline.filter(&mut found), 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, "Svc.b");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("baseline.json");
        let baseline = Baseline::from_diagnostics([&finding("Svc.a", 1), &finding("Svc.b", 2)]);
        baseline.save(&path).unwrap();
        let loaded = Baseline::load(&path).unwrap();
        assert_eq!(loaded, baseline);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Baseline::load(&path),
            Err(BaselineError::Malformed(_))
        ));
    }
}
