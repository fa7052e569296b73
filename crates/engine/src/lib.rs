//! # The Engine: manual permission check → annotation rewrite
//!
//! **Role**: Given one stub method, decides whether its leading manual
//! permission checks can be replaced by a declarative annotation, and builds
//! the diagnostic plus the patch that does it.
//!
//! **Pipeline** (strictly downward, per method):
//! - [`matcher`]: one statement → [`CheckMatch`](matcher::CheckMatch) or nothing.
//! - [`folder`]: leading matches → single-level [`PermissionPredicate`].
//! - [`classifier`]: exact vs approximate.
//! - [`synth`] and [`patch_builder`]: annotation text and the edit.
//! - [`emitter`]: the [`Diagnostic`].
//!
//! **Design**:
//! - Pure: no I/O, no state across calls. `Engine` is `Send + Sync` and is
//!   shared by reference across worker threads.
//! - Never sees a parse tree. Front ends lower methods into [`ir`].
//! - Stub detection is injected through [`StubDetector`].

pub mod classifier;
pub mod config;
pub mod emitter;
pub mod folder;
pub mod ir;
pub mod matcher;
pub mod patch_builder;
pub mod predicate;
pub mod synth;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::ConversionResult;
pub use config::{ConfigError, EngineConfig};
pub use emitter::RULE;
pub use ir::MethodDecl;
pub use patch_builder::PatchBuildError;
pub use predicate::{Permission, PermissionPredicate};
pub use synth::SynthesisError;

use common::Diagnostic;
use tracing::{debug, trace};

/// Decides whether a method implements a stub interface.
///
/// Returns the interface name (`IFooService`) for stub methods, `None` otherwise.
pub trait StubDetector {
    fn stub_interface(&self, method: &MethodDecl) -> Option<String>;
}

impl<F> StubDetector for F
where
    F: Fn(&MethodDecl) -> Option<String>,
{
    fn stub_interface(&self, method: &MethodDecl) -> Option<String> {
        self(method)
    }
}

/// Internal-consistency failures for a single method.
///
/// Never a "no match": those are `Ok(None)`. Callers should report the
/// error to maintainers and move on to the next method.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot render annotation for {method}: {source}")]
    Synthesis {
        method: String,
        #[source]
        source: SynthesisError,
    },
    #[error("cannot build patch for {method}: {source}")]
    Patch {
        method: String,
        #[source]
        source: PatchBuildError,
    },
}

pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyzes one method.
    ///
    /// `source` is the full text of the file the method's spans point into.
    pub fn analyze(
        &self,
        method: &MethodDecl,
        source: &str,
        detector: &dyn StubDetector,
    ) -> Result<Option<Diagnostic>, EngineError> {
        let Some(interface) = detector.stub_interface(method) else {
            trace!(method = %method.qualified_name(), "not a stub method");
            return Ok(None);
        };
        let simple = self.config.annotation_simple_name();
        if self.config.skip_annotated && method.has_annotation(simple) {
            trace!(method = %method.qualified_name(), "already annotated");
            return Ok(None);
        }

        let Some(fold) = folder::Folder::new(&self.config).fold(&method.body) else {
            return Ok(None);
        };
        let Some(result) = classifier::classify(fold) else {
            return Ok(None);
        };

        let line = synth::annotation_line(&self.config.annotation, &result.predicate).map_err(
            |source| EngineError::Synthesis {
                method: method.qualified_name(),
                source,
            },
        )?;
        let patch = patch_builder::PatchBuilder::new(source)
            .build(method.span, &result, &line)
            .map_err(|source| EngineError::Patch {
                method: method.qualified_name(),
                source,
            })?;

        debug!(
            method = %method.qualified_name(),
            fidelity = ?result.fidelity,
            checks = result.consumed_spans.len(),
            "conversion found"
        );
        Ok(Some(emitter::emit(
            method,
            &interface,
            &result,
            simple,
            line,
            Some(patch),
            &self.config.severity,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, StatementKind};
    use crate::testing::*;
    use common::Fidelity;

    fn stub(_: &MethodDecl) -> Option<String> {
        Some("ISvc".to_string())
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default())
    }

    const LOG_GUARD: &str = "if (mContext.checkCallingPermission(P) != PackageManager.PERMISSION_GRANTED) { Slog.w(TAG, \"no\"); throw new SecurityException(); }";

    fn log_guard() -> StatementKind {
        StatementKind::If {
            condition: ne_granted("checkCallingPermission", "P"),
            then_branch: vec![
                stmt(StatementKind::Call(call(Some("Slog"), "w", vec![name("TAG")]))),
                stmt(throw_new("SecurityException")),
            ],
            else_branch: None,
        }
    }

    #[test]
    fn test_no_leading_check_is_silent() {
        let (source, decl) = Fixture::new()
            .stmt("int x = 1;", StatementKind::Other("local_variable_declaration".into()))
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .finish();
        assert!(engine().analyze(&decl, &source, &stub).unwrap().is_none());
    }

    #[test]
    fn test_single_guard_then_business_logic() {
        let (source, decl) = Fixture::new()
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .stmt("doWork();", StatementKind::Other("expression_statement".into()))
            .finish();
        let d = engine().analyze(&decl, &source, &stub).unwrap().unwrap();
        assert_eq!(d.fidelity, Fidelity::Exact);
        assert_eq!(d.annotation, "@EnforcePermission(P)");
        assert!(d.message.ends_with("should be converted to @EnforcePermission annotation"));
        assert_eq!(d.location, decl.body.statements[0].span);

        let patch = d.patch.unwrap();
        assert_eq!(patch.deletions.len(), 1);
        assert!(patch.deletions[0].contains(&decl.body.statements[0].span));
        assert!(patch.insertion.text.contains("@EnforcePermission(P)"));
    }

    #[test]
    fn test_non_stub_method_is_silent() {
        let (source, decl) = Fixture::new()
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .finish();
        let not_stub = |_: &MethodDecl| -> Option<String> { None };
        assert!(engine().analyze(&decl, &source, &not_stub).unwrap().is_none());
    }

    #[test]
    fn test_two_guards_render_in_source_order() {
        let guard_a = "if (mContext.checkCallingPermission(A) != PackageManager.PERMISSION_GRANTED) throw new SecurityException();";
        let guard_b = "if (mContext.checkCallingPermission(B) != PackageManager.PERMISSION_GRANTED) throw new SecurityException();";
        let (source, decl) = Fixture::new()
            .stmt(guard_a, guard_throw("checkCallingPermission", "A"))
            .stmt(guard_b, guard_throw("checkCallingPermission", "B"))
            .finish();
        let ab = engine().analyze(&decl, &source, &stub).unwrap().unwrap();
        assert_eq!(ab.annotation, "@EnforcePermission(allOf = {A, B})");
        assert_eq!(ab.location, decl.body.statements[1].span);

        let (source, decl) = Fixture::new()
            .stmt(guard_b, guard_throw("checkCallingPermission", "B"))
            .stmt(guard_a, guard_throw("checkCallingPermission", "A"))
            .finish();
        let ba = engine().analyze(&decl, &source, &stub).unwrap().unwrap();
        assert_eq!(ba.annotation, "@EnforcePermission(allOf = {B, A})");
        assert_eq!(ab.fidelity, ba.fidelity);
        assert_eq!(ab.severity, ba.severity);
    }

    #[test]
    fn test_logging_guard_is_approximate_and_fully_deleted() {
        let (source, decl) = Fixture::new()
            .stmt(LOG_GUARD, log_guard())
            .stmt("doWork();", StatementKind::Other("expression_statement".into()))
            .finish();
        let d = engine().analyze(&decl, &source, &stub).unwrap().unwrap();
        assert_eq!(d.fidelity, Fidelity::Approximate);
        assert!(d.message.contains("can be converted"));

        let patched = d.patch.unwrap().apply(&source).unwrap();
        assert!(!patched.contains("Slog.w"));
        assert!(!patched.contains("checkCallingPermission"));
        assert!(patched.contains("doWork();"));
    }

    #[test]
    fn test_non_canonical_return_is_approximate() {
        let text = "if (mContext.checkCallingPermission(P) != PackageManager.PERMISSION_GRANTED) return false;";
        let (source, decl) = Fixture::new()
            .stmt(
                text,
                guard_return("checkCallingPermission", "P", Some(Expr::Literal("false".into()))),
            )
            .finish();
        let d = engine().analyze(&decl, &source, &stub).unwrap().unwrap();
        assert!(d.fidelity.error_level());
    }

    #[test]
    fn test_already_annotated_is_silent() {
        let (source, decl) = Fixture::annotated(&["EnforcePermission(P)", "Override"])
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .finish();
        let mut decl = decl;
        decl.annotations = vec!["EnforcePermission".into(), "Override".into()];
        assert!(engine().analyze(&decl, &source, &stub).unwrap().is_none());
    }

    #[test]
    fn test_bad_span_is_an_error_not_a_panic() {
        let (_, mut decl) = Fixture::new()
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .finish();
        decl.body.statements[0].span.end.offset = 10_000;
        let err = engine().analyze(&decl, "tiny", &stub).unwrap_err();
        assert!(matches!(err, EngineError::Patch { .. }));
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
