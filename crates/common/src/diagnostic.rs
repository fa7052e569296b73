use crate::patch::Patch;
use crate::span::SourceSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity tier requested for a finding.
///
/// The engine only ever *requests* a tier; the reporting layer has the final say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    Information = 0,
    Warning = 1,
    Error = 2,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Information => "information",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Rule category, used for grouping in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Correctness,
}

/// How faithfully a suggested rewrite preserves the original behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    /// Semantics-preserving; safe to auto-apply.
    Exact,
    /// Plausible but requires human review before acceptance.
    Approximate,
}

impl Fidelity {
    /// `errorLevel` in the classic lint vocabulary: `true` iff approximate.
    pub fn error_level(self) -> bool {
        matches!(self, Fidelity::Approximate)
    }
}

/// A reportable finding for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Anchor: the last consumed manual check.
    pub location: SourceSpan,
    /// Normalized file path. Empty until the front end attaches one.
    #[serde(default)]
    pub path: String,
    /// `Class.method` of the analyzed method.
    pub method: String,
    /// Stub interface the method implements (e.g. `IFooService`).
    pub interface: String,
    pub fidelity: Fidelity,
    /// Annotation line the patch inserts, e.g. `@EnforcePermission(P)`.
    pub annotation: String,
    /// Reviewer notes explaining why a conversion is approximate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Patch>,
}

impl Diagnostic {
    /// Attaches the file path reported by the front end.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn is_exact(&self) -> bool {
        self.fidelity == Fidelity::Exact
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {} [{}]",
            self.path, self.location.start, self.severity, self.message, self.rule_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Position;

    fn sample() -> Diagnostic {
        Diagnostic {
            rule_id: "SimpleManualPermissionEnforcement".into(),
            severity: Severity::Warning,
            message: "IFoo permission check should be converted to @EnforcePermission annotation"
                .into(),
            location: SourceSpan::new(Position::new(10, 2, 5), Position::new(40, 2, 35)),
            path: String::new(),
            method: "FooService.doThing".into(),
            interface: "IFoo".into(),
            fidelity: Fidelity::Exact,
            annotation: "@EnforcePermission(P)".into(),
            notes: vec![],
            patch: None,
        }
    }

    #[test]
    fn test_error_level_polarity() {
        assert!(!Fidelity::Exact.error_level());
        assert!(Fidelity::Approximate.error_level());
    }

    #[test]
    fn test_display_format() {
        let d = sample().with_path("src/Foo.java");
        assert_eq!(
            d.to_string(),
            "src/Foo.java:2:5: warning: IFoo permission check should be converted to \
             @EnforcePermission annotation [SimpleManualPermissionEnforcement]"
        );
    }

    #[test]
    fn test_json_roundtrip_skips_empty_fields() {
        let d = sample();
        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("\"notes\""));
        assert!(!json.contains("\"patch\""));
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Information);
    }
}
