//! Patch builder: consumed statements out, annotation line in.

use crate::classifier::ConversionResult;
use common::{Insertion, Patch, Position, SourceSpan};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchBuildError {
    #[error("span {start}..{end} lies outside the source ({len} bytes)")]
    OutOfRange { start: usize, end: usize, len: usize },
    #[error("span {start}..{end} splits a UTF-8 character")]
    CharBoundary { start: usize, end: usize },
}

pub struct PatchBuilder<'s> {
    source: &'s str,
}

impl<'s> PatchBuilder<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source }
    }

    /// Builds the patch for one method.
    ///
    /// `decl` is the whole declaration including its annotations; the new
    /// annotation goes above all of them.
    pub fn build(
        &self,
        decl: SourceSpan,
        result: &ConversionResult,
        annotation_line: &str,
    ) -> Result<Patch, PatchBuildError> {
        let deletions = result
            .consumed_spans
            .iter()
            .map(|span| self.deletion(*span))
            .collect::<Result<Vec<_>, _>>()?;
        let insertion = self.insertion(decl, annotation_line)?;
        Ok(Patch {
            deletions,
            insertion,
        })
    }

    fn check(&self, start: usize, end: usize) -> Result<(), PatchBuildError> {
        if start > end || end > self.source.len() {
            return Err(PatchBuildError::OutOfRange {
                start,
                end,
                len: self.source.len(),
            });
        }
        if !self.source.is_char_boundary(start) || !self.source.is_char_boundary(end) {
            return Err(PatchBuildError::CharBoundary { start, end });
        }
        Ok(())
    }

    /// The statement itself, widened to whole lines when nothing but blanks or
    /// a trailing comment shares them.
    fn deletion(&self, span: SourceSpan) -> Result<SourceSpan, PatchBuildError> {
        let (start, end) = (span.start_byte(), span.end_byte());
        self.check(start, end)?;

        let line_start = self.line_start(start);
        let line_end = self.source[end..]
            .find('\n')
            .map_or(self.source.len(), |i| end + i);
        let alone = is_blank(&self.source[line_start..start])
            && is_blank_or_comment(&self.source[end..line_end]);
        if !alone {
            return Ok(SourceSpan::from_offsets(self.source, start, end));
        }
        let through_newline = if line_end < self.source.len() {
            line_end + 1
        } else {
            line_end
        };
        Ok(SourceSpan::from_offsets(self.source, line_start, through_newline))
    }

    fn insertion(&self, decl: SourceSpan, annotation_line: &str) -> Result<Insertion, PatchBuildError> {
        let start = decl.start_byte();
        self.check(start, start)?;

        let line_start = self.line_start(start);
        let indent = &self.source[line_start..start];
        if is_blank(indent) {
            Ok(Insertion {
                position: Position::locate(self.source, line_start),
                text: format!("{indent}{annotation_line}\n"),
            })
        } else {
            Ok(Insertion {
                position: Position::locate(self.source, start),
                text: format!("{annotation_line} "),
            })
        }
    }

    fn line_start(&self, offset: usize) -> usize {
        self.source[..offset].rfind('\n').map_or(0, |i| i + 1)
    }
}

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c == ' ' || c == '\t' || c == '\r')
}

/// Blank, or a single trailing `// ...` or `/* ... */` comment.
fn is_blank_or_comment(s: &str) -> bool {
    let rest = s.trim_start_matches(|c: char| c == ' ' || c == '\t');
    if rest.starts_with("//") {
        return true;
    }
    if let Some(body) = rest.strip_prefix("/*") {
        return match body.find("*/") {
            Some(close) => is_blank(&body[close + 2..]),
            None => false,
        };
    }
    is_blank(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::config::EngineConfig;
    use crate::folder::Folder;
    use crate::ir::MethodDecl;
    use crate::testing::*;

    fn result_for(decl: &MethodDecl) -> ConversionResult {
        let config = EngineConfig::default();
        let fold = Folder::new(&config).fold(&decl.body).unwrap();
        classify(fold).unwrap()
    }

    #[test]
    fn test_whole_line_deletion_and_insertion() {
        let (source, decl) = Fixture::new()
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .stmt("doWork();", crate::ir::StatementKind::Other("expression_statement".into()))
            .finish();
        let result = result_for(&decl);
        let patch = PatchBuilder::new(&source)
            .build(decl.span, &result, "@EnforcePermission(P)")
            .unwrap();

        assert_eq!(patch.insertion.text, "    @EnforcePermission(P)\n");
        assert_eq!(patch.insertion.position.line, 2);
        assert_eq!(patch.insertion.position.column, 1);

        let patched = patch.apply(&source).unwrap();
        assert_eq!(
            patched,
            "class Svc extends ISvc.Stub {\n    @EnforcePermission(P)\n    @Override\n    public void doThing() {\n        doWork();\n    }\n}\n"
        );
    }

    #[test]
    fn test_deletion_never_truncates_statement() {
        let (source, decl) = Fixture::new()
            .stmt(GUARD_P, guard_throw("checkCallingPermission", "P"))
            .finish();
        let result = result_for(&decl);
        let patch = PatchBuilder::new(&source)
            .build(decl.span, &result, "@EnforcePermission(P)")
            .unwrap();
        let stmt_span = decl.body.statements[0].span;
        assert!(patch.deletions[0].contains(&stmt_span));
    }

    #[test]
    fn test_shared_line_keeps_neighbours() {
        let source = "    void f() { enforce(P); work(); }\n";
        let start = source.find("enforce").unwrap();
        let end = start + "enforce(P);".len();
        let builder = PatchBuilder::new(source);
        let span = builder
            .deletion(SourceSpan::from_offsets(source, start, end))
            .unwrap();
        assert_eq!(span.text(source), Some("enforce(P);"));

        let decl = SourceSpan::from_offsets(source, 4, source.len() - 1);
        let insertion = builder.insertion(decl, "@A").unwrap();
        assert_eq!(insertion.text, "    @A\n");
        assert_eq!(insertion.position.offset, 0);
    }

    #[test]
    fn test_trailing_comment_goes_with_statement() {
        let source = "    void f() {\n        enforce(P); // needed\n        work(); /* keep */ x();\n    }\n";
        let builder = PatchBuilder::new(source);

        let start = source.find("enforce").unwrap();
        let span = builder
            .deletion(SourceSpan::from_offsets(source, start, start + "enforce(P);".len()))
            .unwrap();
        assert_eq!(span.text(source), Some("        enforce(P); // needed\n"));

        let start = source.find("work").unwrap();
        let span = builder
            .deletion(SourceSpan::from_offsets(source, start, start + "work();".len()))
            .unwrap();
        assert_eq!(span.text(source), Some("work();"));
    }

    #[test]
    fn test_blank_or_comment() {
        assert!(is_blank_or_comment(" \r"));
        assert!(is_blank_or_comment("  // why"));
        assert!(is_blank_or_comment(" /* why */ "));
        assert!(!is_blank_or_comment(" /* open"));
        assert!(!is_blank_or_comment(" /* a */ b();"));
        assert!(!is_blank_or_comment(" x();"));
    }

    #[test]
    fn test_inline_insertion_after_code() {
        let source = "class S { void f() {} }";
        let decl_start = source.find("void").unwrap();
        let decl = SourceSpan::from_offsets(source, decl_start, source.len() - 2);
        let insertion = PatchBuilder::new(source).insertion(decl, "@A").unwrap();
        assert_eq!(insertion.text, "@A ");
        assert_eq!(insertion.position.offset as usize, decl_start);
    }

    #[test]
    fn test_out_of_range_span() {
        let source = "short";
        let span = SourceSpan::new(Position::new(2, 1, 3), Position::new(99, 1, 100));
        assert_eq!(
            PatchBuilder::new(source).deletion(span),
            Err(PatchBuildError::OutOfRange {
                start: 2,
                end: 99,
                len: 5
            })
        );
    }

    #[test]
    fn test_char_boundary_span() {
        let source = "é;";
        let span = SourceSpan::new(Position::new(1, 1, 2), Position::new(3, 1, 4));
        assert_eq!(
            PatchBuilder::new(source).deletion(span),
            Err(PatchBuildError::CharBoundary { start: 1, end: 3 })
        );
    }
}
