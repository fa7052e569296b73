//! Predicate folder: merges the leading run of matched checks.

use crate::config::{Combinator, EngineConfig};
use crate::ir::MethodBody;
use crate::matcher::{CheckMatch, Matcher};
use crate::predicate::{Permission, PermissionPredicate};
use tracing::debug;

/// Checks consumed from the start of a body and their single-level predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Non-empty, in source order.
    pub matches: Vec<CheckMatch>,
    pub predicate: PermissionPredicate,
    pub combinator: Combinator,
}

pub struct Folder<'c> {
    matcher: Matcher<'c>,
}

impl<'c> Folder<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            matcher: Matcher::new(config),
        }
    }

    /// Folds the leading checks of `body`.
    ///
    /// Stops at the first statement that is not a check, or whose combinator
    /// cannot join the accumulated one without a second predicate level.
    /// Returns `None` when the very first statement is not a check.
    pub fn fold(&self, body: &MethodBody) -> Option<Fold> {
        let mut matches: Vec<CheckMatch> = Vec::new();
        let mut combinator = Combinator::Single;

        for (index, stmt) in body.statements.iter().enumerate() {
            let Some(m) = self.matcher.match_statement(stmt) else {
                debug!(index, "fold stopped: statement is not a permission check");
                break;
            };
            if matches.is_empty() {
                combinator = m.combinator;
            } else if let Some(merged) = merge(combinator, m.combinator) {
                combinator = merged;
            } else {
                debug!(index, ?combinator, next = ?m.combinator, "fold stopped: combinators do not merge");
                break;
            }
            matches.push(m);
        }

        if matches.is_empty() {
            return None;
        }

        let mut permissions: Vec<Permission> = Vec::new();
        for p in matches.iter().flat_map(|m| m.permissions.iter()) {
            if !permissions.contains(p) {
                permissions.push(p.clone());
            }
        }
        if permissions.len() == 1 {
            combinator = Combinator::Single;
        }

        Some(Fold {
            predicate: build_predicate(combinator, permissions),
            matches,
            combinator,
        })
    }
}

/// `AnyOf` over several permissions is a disjunction; ANDing anything onto
/// it would need a second level.
fn merge(acc: Combinator, next: Combinator) -> Option<Combinator> {
    match (acc, next) {
        (Combinator::Single | Combinator::AllOf, Combinator::Single | Combinator::AllOf) => {
            Some(Combinator::AllOf)
        }
        _ => None,
    }
}

fn build_predicate(combinator: Combinator, mut permissions: Vec<Permission>) -> PermissionPredicate {
    if permissions.len() == 1 {
        if let Some(p) = permissions.pop() {
            return PermissionPredicate::Leaf(p);
        }
    }
    let leaves = permissions.into_iter().map(PermissionPredicate::Leaf).collect();
    match combinator {
        Combinator::AnyOf => PermissionPredicate::Any(leaves),
        Combinator::Single | Combinator::AllOf => PermissionPredicate::All(leaves),
    }
}
