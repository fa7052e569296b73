//! Tree-sitter Java host: parsing, file loading and per-file analysis.

use std::fs::File;
use std::path::Path;

use common::Diagnostic;
use engine::{Engine, StubDetector};
use memmap2::MmapOptions;
use tracing::{debug, error};
use tree_sitter::{Parser, Tree};

use crate::lower::collect_methods;
use crate::FrontendError;

/// Findings of one file.
#[derive(Debug, Default)]
pub struct FileAnalysis {
    pub diagnostics: Vec<Diagnostic>,
    /// Method declarations with a body that were handed to the engine.
    pub methods: usize,
    /// Methods whose analysis failed an internal consistency check.
    pub failures: usize,
}

/// Owns one tree-sitter parser with the Java grammar loaded.
///
/// Parsers are not `Sync`; parallel callers create one host per worker.
///
/// # Example
/// ```no_run
/// use engine::{Engine, EngineConfig};
/// use frontend::{AidlStubDetector, JavaHost};
/// use std::path::Path;
///
/// let engine = Engine::new(EngineConfig::default());
/// let mut host = JavaHost::new().unwrap();
/// let found = host
///     .analyze_file(&engine, &AidlStubDetector::default(), Path::new("FooService.java"), "FooService.java")
///     .unwrap();
/// for d in found.diagnostics {
///     println!("{d}");
/// }
/// ```
pub struct JavaHost {
    parser: Parser,
}

impl JavaHost {
    /// # Errors
    /// `ParseFailure` if the Java grammar cannot be loaded (ABI mismatch).
    pub fn new() -> Result<Self, FrontendError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| FrontendError::ParseFailure(format!("Failed to load Java grammar: {e}")))?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, FrontendError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| FrontendError::ParseFailure("Tree-sitter parse returned None".to_string()))
    }

    /// `true` if `source` contains syntax errors or missing tokens.
    pub fn has_syntax_errors(&mut self, source: &str) -> Result<bool, FrontendError> {
        Ok(self.parse(source)?.root_node().has_error())
    }

    /// Reads a source file through a read-only mmap.
    ///
    /// # Errors
    /// - `IoError`: open or mmap failure
    /// - `ByteRangeOverflow`: file larger than 4GB (span offsets are `u32`)
    /// - `NonUtf8`: the file is not valid UTF-8
    pub fn read_source(path: &Path) -> Result<String, FrontendError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len > u32::MAX as u64 {
            return Err(FrontendError::ByteRangeOverflow);
        }
        if file_len == 0 {
            return Ok(String::new());
        }
        // SAFETY: The file handle is held for the duration of the mmap lifetime.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let text = std::str::from_utf8(&mmap)
            .map_err(|_| FrontendError::NonUtf8(path.display().to_string()))?;
        Ok(text.to_string())
    }

    /// Runs the engine over every method in `source`.
    ///
    /// A method whose analysis fails is logged and counted, and the
    /// remaining methods are still analyzed.
    pub fn analyze_source(
        &mut self,
        engine: &Engine,
        detector: &dyn StubDetector,
        source: &str,
        display_path: &str,
    ) -> Result<FileAnalysis, FrontendError> {
        let tree = self.parse(source)?;
        if tree.root_node().has_error() {
            debug!(path = display_path, "syntax errors present; analyzing recovered tree");
        }

        let methods = collect_methods(tree.root_node(), source);
        let mut analysis = FileAnalysis {
            methods: methods.len(),
            ..FileAnalysis::default()
        };
        for method in &methods {
            match engine.analyze(method, source, detector) {
                Ok(Some(d)) => analysis.diagnostics.push(d.with_path(display_path)),
                Ok(None) => {}
                Err(e) => {
                    error!(path = display_path, error = %e, "method analysis aborted");
                    analysis.failures += 1;
                }
            }
        }
        Ok(analysis)
    }

    pub fn analyze_file(
        &mut self,
        engine: &Engine,
        detector: &dyn StubDetector,
        path: &Path,
        display_path: &str,
    ) -> Result<FileAnalysis, FrontendError> {
        let source = Self::read_source(path)?;
        self.analyze_source(engine, detector, &source, display_path)
    }
}
