//! Shared vocabulary for the enforcer workspace.
//!
//! Every crate speaks in these types: source coordinates ([`SourceSpan`]),
//! machine-applicable edits ([`Patch`]), and reportable findings
//! ([`Diagnostic`]). Nothing here knows about Java or about permission checks.

pub mod baseline;
pub mod diagnostic;
pub mod patch;
pub mod span;

pub use baseline::{Baseline, BaselineError};
pub use diagnostic::{Category, Diagnostic, Fidelity, Severity};
pub use patch::{Insertion, Patch, PatchError};
pub use span::{Position, SourceSpan};
