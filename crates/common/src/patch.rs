//! Machine-applicable edits.
//!
//! A [`Patch`] is a set of byte-range deletions plus exactly one insertion.
//! Application is pure (`&str → String`) and splices **bottom-to-top**
//! (descending start offset) so that earlier offsets stay valid while later
//! ranges are being removed.

use crate::span::{Position, SourceSpan};
use serde::{Deserialize, Serialize};

/// Errors from patch application.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("edit range {start}..{end} exceeds source length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("edit range {start}..{end} is not on a UTF-8 character boundary")]
    CharBoundary { start: usize, end: usize },
    #[error("edits overlap at byte {offset}")]
    Overlap { offset: usize },
}

/// Text inserted at a single position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    pub position: Position,
    pub text: String,
}

/// A self-contained edit: remove `deletions`, then add `insertion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub deletions: Vec<SourceSpan>,
    pub insertion: Insertion,
}

/// One normalized splice: replace `[start, end)` with `text`.
#[derive(Debug)]
struct Splice<'a> {
    start: usize,
    end: usize,
    text: &'a str,
}

impl Patch {
    /// Applies this patch to `source`.
    ///
    /// # Example
    /// ```
    /// # use common::{Insertion, Patch, Position, SourceSpan};
    /// let src = "void f() {\n  check();\n  work();\n}\n";
    /// let patch = Patch {
    ///     deletions: vec![SourceSpan::from_offsets(src, 11, 22)],
    ///     insertion: Insertion { position: Position::locate(src, 0), text: "@A\n".into() },
    /// };
    /// assert_eq!(patch.apply(src).unwrap(), "@A\nvoid f() {\n  work();\n}\n");
    /// ```
    pub fn apply(&self, source: &str) -> Result<String, PatchError> {
        apply_all(source, std::slice::from_ref(self))
    }

    fn splices(&self) -> impl Iterator<Item = Splice<'_>> {
        let deletions = self.deletions.iter().map(|span| Splice {
            start: span.start_byte(),
            end: span.end_byte(),
            text: "",
        });
        let insert_at = self.insertion.position.offset as usize;
        deletions.chain(std::iter::once(Splice {
            start: insert_at,
            end: insert_at,
            text: self.insertion.text.as_str(),
        }))
    }
}

/// Applies several independent patches (e.g. one per method) to one file.
///
/// Fails without partial output if any two edits overlap or any range does
/// not fit `source`.
pub fn apply_all(source: &str, patches: &[Patch]) -> Result<String, PatchError> {
    let mut splices: Vec<Splice<'_>> = patches.iter().flat_map(Patch::splices).collect();

    for s in &splices {
        if s.start > s.end || s.end > source.len() {
            return Err(PatchError::OutOfBounds {
                start: s.start,
                end: s.end,
                len: source.len(),
            });
        }
        if !source.is_char_boundary(s.start) || !source.is_char_boundary(s.end) {
            return Err(PatchError::CharBoundary {
                start: s.start,
                end: s.end,
            });
        }
    }

    // Sort DESCENDING: bottom-to-top so earlier offsets stay valid. On equal
    // starts the wider range goes first so an insertion lands before a
    // deletion beginning at the same byte.
    splices.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    for pair in splices.windows(2) {
        let (later, earlier) = (&pair[0], &pair[1]);
        if earlier.end > later.start {
            return Err(PatchError::Overlap {
                offset: later.start,
            });
        }
    }

    let mut content = source.to_string();
    for s in &splices {
        content.replace_range(s.start..s.end, s.text);
    }
    Ok(content)
}
