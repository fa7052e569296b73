//! Conversion classifier: exact vs approximate.

use crate::config::Combinator;
use crate::folder::Fold;
use crate::matcher::{Deviation, FailureAction};
use crate::predicate::PermissionPredicate;
use common::{Fidelity, SourceSpan};

/// A successful fold, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub fidelity: Fidelity,
    pub predicate: PermissionPredicate,
    /// Spans of the consumed statements, in source order.
    pub consumed_spans: Vec<SourceSpan>,
    /// Anchor for the diagnostic.
    pub last_span: SourceSpan,
    /// Empty iff `fidelity` is exact.
    pub deviations: Vec<Deviation>,
}

impl ConversionResult {
    /// `true` for approximate conversions.
    pub fn error_level(&self) -> bool {
        self.fidelity.error_level()
    }

    pub fn is_exact(&self) -> bool {
        self.fidelity == Fidelity::Exact
    }
}

/// Classifies a fold.
///
/// Exact requires every denial to be canonical, no match to carry a
/// deviation, and every match to agree with the folded combinator. Anything
/// else is approximate, with the reasons collected in source order.
/// `None` only for a fold without matches.
pub fn classify(fold: Fold) -> Option<ConversionResult> {
    let last_span = fold.matches.last()?.span;
    let mut deviations = Vec::new();

    for m in &fold.matches {
        deviations.extend(m.deviations.iter().cloned());
        match &m.failure {
            FailureAction::Throw {
                exception,
                canonical: false,
            } => deviations.push(Deviation::NonCanonicalException(exception.clone())),
            FailureAction::ReturnDenied {
                value,
                canonical: false,
            } => deviations.push(Deviation::NonCanonicalReturn(value.clone())),
            _ => {}
        }
    }

    let consistent = fold.combinator == Combinator::Single
        || fold
            .matches
            .iter()
            .all(|m| m.combinator == Combinator::Single || m.combinator == fold.combinator);
    if !consistent {
        deviations.push(Deviation::MixedCombinators);
    }

    let fidelity = if deviations.is_empty() {
        Fidelity::Exact
    } else {
        Fidelity::Approximate
    };
    let consumed_spans = fold.matches.iter().map(|m| m.span).collect();

    Some(ConversionResult {
        fidelity,
        predicate: fold.predicate,
        consumed_spans,
        last_span,
        deviations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::folder::Folder;
    use crate::ir::{Expr, StatementKind};
    use crate::matcher::{CheckMatch, CheckShape};
    use crate::predicate::Permission;
    use crate::testing::*;

    fn classify_body(kinds: Vec<StatementKind>) -> ConversionResult {
        let config = EngineConfig::default();
        let fold = Folder::new(&config).fold(&body(kinds)).unwrap();
        classify(fold).unwrap()
    }

    #[test]
    fn test_clean_throw_is_exact() {
        let r = classify_body(vec![guard_throw("checkCallingPermission", "P")]);
        assert!(r.is_exact());
        assert!(!r.error_level());
        assert!(r.deviations.is_empty());
        assert_eq!(r.consumed_spans.len(), 1);
    }

    #[test]
    fn test_enforce_call_is_exact() {
        let r = classify_body(vec![enforce("enforceCallingPermission", "P")]);
        assert!(r.is_exact());
    }

    #[test]
    fn test_logging_makes_approximate() {
        let log = stmt(StatementKind::Call(call(Some("Log"), "e", vec![name("TAG")])));
        let kind = StatementKind::If {
            condition: ne_granted("checkCallingPermission", "P"),
            then_branch: vec![log, stmt(throw_new("SecurityException"))],
            else_branch: None,
        };
        let r = classify_body(vec![kind]);
        assert!(r.error_level());
        assert!(matches!(r.deviations[0], Deviation::DroppedSideEffect { .. }));
    }

    #[test]
    fn test_non_canonical_return_is_approximate() {
        let r = classify_body(vec![guard_return(
            "checkCallingPermission",
            "P",
            Some(Expr::Literal("null".into())),
        )]);
        assert_eq!(r.fidelity, Fidelity::Approximate);
        assert_eq!(
            r.deviations,
            vec![Deviation::NonCanonicalReturn(Some("null".into()))]
        );
    }

    #[test]
    fn test_canonical_return_is_exact() {
        let r = classify_body(vec![guard_return(
            "checkCallingPermission",
            "P",
            Some(name("PackageManager.PERMISSION_DENIED")),
        )]);
        assert!(r.is_exact());
    }

    #[test]
    fn test_order_does_not_change_fidelity() {
        let ab = classify_body(vec![
            guard_throw("checkCallingPermission", "A"),
            guard_return("checkCallingPermission", "B", None),
        ]);
        let ba = classify_body(vec![
            guard_return("checkCallingPermission", "B", None),
            guard_throw("checkCallingPermission", "A"),
        ]);
        assert_eq!(ab.fidelity, ba.fidelity);
        assert_eq!(ab.fidelity, Fidelity::Approximate);
    }

    #[test]
    fn test_inconsistent_combinators_flagged() {
        let check = |combinator, perms: &[&str]| CheckMatch {
            shape: CheckShape::EnforceCall,
            permissions: perms.iter().map(|p| Permission::new(*p)).collect(),
            combinator,
            span: dummy_span(),
            failure: FailureAction::Delegate,
            deviations: vec![],
        };
        let fold = Fold {
            matches: vec![check(Combinator::AnyOf, &["A", "B"]), check(Combinator::AllOf, &["C", "D"])],
            predicate: PermissionPredicate::All(vec![]),
            combinator: Combinator::AllOf,
        };
        let r = classify(fold).unwrap();
        assert_eq!(r.deviations, vec![Deviation::MixedCombinators]);
    }
}
