//! Diagnostic emitter and rule metadata.

use crate::classifier::ConversionResult;
use crate::config::SeverityPolicy;
use crate::ir::MethodDecl;
use common::{Category, Diagnostic, Patch, Severity};

/// Static description of the rule, for `explain` and report headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub id: &'static str,
    pub brief: &'static str,
    pub explanation: &'static str,
    pub category: Category,
    /// 1 (lowest) to 10.
    pub priority: u8,
    pub default_severity: Severity,
}

pub const RULE: Rule = Rule {
    id: "SimpleManualPermissionEnforcement",
    brief: "Manual permission check can be @EnforcePermission annotation",
    explanation: "Binder interface methods that only check a permission on entry can use \
        the declarative @EnforcePermission annotation instead. The annotation makes the \
        required permission part of the interface contract, lets the AIDL compiler \
        generate the check, and allows the permission to be verified by tooling. \
        Replace the manual check with the suggested annotation above the method.",
    category: Category::Security,
    priority: 5,
    default_severity: Severity::Warning,
};

/// Packages one classified conversion into a [`Diagnostic`].
///
/// The path is left empty; the caller attaches it with [`Diagnostic::with_path`].
pub fn emit(
    method: &MethodDecl,
    interface: &str,
    result: &ConversionResult,
    annotation_simple: &str,
    annotation_line: String,
    patch: Option<Patch>,
    policy: &SeverityPolicy,
) -> Diagnostic {
    let modal = if result.is_exact() { "should" } else { "can" };
    Diagnostic {
        rule_id: RULE.id.to_string(),
        severity: policy.tier(result.is_exact()),
        message: format!(
            "{interface} permission check {modal} be converted to @{annotation_simple} annotation"
        ),
        location: result.last_span,
        path: String::new(),
        method: method.qualified_name(),
        interface: interface.to_string(),
        fidelity: result.fidelity,
        annotation: annotation_line,
        notes: result.deviations.iter().map(ToString::to_string).collect(),
        patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::config::EngineConfig;
    use crate::folder::Folder;
    use crate::ir::{Expr, StatementKind};
    use crate::testing::*;
    use common::Fidelity;

    fn emit_for(kinds: Vec<StatementKind>, policy: &SeverityPolicy) -> Diagnostic {
        let config = EngineConfig::default();
        let (_, mut decl) = Fixture::new().finish();
        decl.body = body(kinds);
        let result = classify(Folder::new(&config).fold(&decl.body).unwrap()).unwrap();
        emit(
            &decl,
            "ISvc",
            &result,
            "EnforcePermission",
            "@EnforcePermission(P)".into(),
            None,
            policy,
        )
    }

    #[test]
    fn test_exact_wording() {
        let d = emit_for(
            vec![guard_throw("checkCallingPermission", "P")],
            &SeverityPolicy::default(),
        );
        assert_eq!(
            d.message,
            "ISvc permission check should be converted to @EnforcePermission annotation"
        );
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.fidelity, Fidelity::Exact);
        assert_eq!(d.method, "Svc.doThing");
        assert_eq!(d.rule_id, "SimpleManualPermissionEnforcement");
        assert!(d.notes.is_empty());
    }

    #[test]
    fn test_approximate_wording_and_notes() {
        let d = emit_for(
            vec![guard_return(
                "checkCallingPermission",
                "P",
                Some(Expr::Literal("false".into())),
            )],
            &SeverityPolicy {
                escalate_exact: true,
            },
        );
        assert!(d.message.ends_with("can be converted to @EnforcePermission annotation"));
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.notes.len(), 1);
        assert!(d.notes[0].contains("false"));
    }

    #[test]
    fn test_escalation_only_touches_exact() {
        let d = emit_for(
            vec![guard_throw("checkCallingPermission", "P")],
            &SeverityPolicy {
                escalate_exact: true,
            },
        );
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn test_rule_metadata() {
        assert_eq!(RULE.category, Category::Security);
        assert_eq!(RULE.priority, 5);
        assert_eq!(RULE.default_severity, Severity::Warning);
    }
}
