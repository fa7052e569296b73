//! Annotation synthesizer.

use crate::predicate::PermissionPredicate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("predicate nests {depth} combinator levels; one annotation expresses at most one")]
    NestedPredicate { depth: usize },
    #[error("predicate has no permission to render")]
    EmptyPermission,
}

/// Renders the annotation argument for `predicate`.
///
/// # Examples
/// ```
/// # use engine::predicate::{Permission, PermissionPredicate};
/// # use engine::synth::render;
/// let p = PermissionPredicate::All(vec![
///     PermissionPredicate::Leaf(Permission::new("A")),
///     PermissionPredicate::Leaf(Permission::new("B")),
/// ]);
/// assert_eq!(render(&p).unwrap(), "allOf = {A, B}");
/// ```
pub fn render(predicate: &PermissionPredicate) -> Result<String, SynthesisError> {
    let depth = predicate.depth();
    if depth > 1 {
        return Err(SynthesisError::NestedPredicate { depth });
    }
    let names = predicate.permissions();
    if names.is_empty() || names.iter().any(|p| p.as_str().trim().is_empty()) {
        return Err(SynthesisError::EmptyPermission);
    }
    let list = || {
        names
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    Ok(match predicate {
        PermissionPredicate::Leaf(p) => p.to_string(),
        PermissionPredicate::All(_) => format!("allOf = {{{}}}", list()),
        PermissionPredicate::Any(_) => format!("anyOf = {{{}}}", list()),
    })
}

/// `@Annotation(arg)`.
pub fn annotation_line(annotation: &str, predicate: &PermissionPredicate) -> Result<String, SynthesisError> {
    Ok(format!("@{annotation}({})", render(predicate)?))
}
