//! Text and JSON rendering of scan results.

use common::{Diagnostic, Severity};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub methods: usize,
    pub findings: usize,
    pub exact: usize,
    pub approximate: usize,
    pub suppressed: usize,
    pub failures: usize,
}

impl Summary {
    pub fn count(&mut self, diagnostics: &[Diagnostic]) {
        self.findings = diagnostics.len();
        self.exact = diagnostics.iter().filter(|d| d.is_exact()).count();
        self.approximate = self.findings - self.exact;
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a Summary,
    findings: &'a [Diagnostic],
}

pub fn write_report(
    out: &mut impl Write,
    format: Format,
    diagnostics: &[Diagnostic],
    summary: &Summary,
) -> io::Result<()> {
    match format {
        Format::Text => write_text(out, diagnostics, summary),
        Format::Json => {
            let report = JsonReport {
                summary,
                findings: diagnostics,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)
        }
    }
}

fn write_text(out: &mut impl Write, diagnostics: &[Diagnostic], summary: &Summary) -> io::Result<()> {
    for d in diagnostics {
        writeln!(out, "{d}")?;
        writeln!(out, "    fix: {}", d.annotation)?;
        for note in &d.notes {
            writeln!(out, "    note: {note}")?;
        }
    }
    if !diagnostics.is_empty() {
        writeln!(out)?;
    }
    write!(
        out,
        "{} finding(s) ({} exact, {} approximate) in {} file(s)",
        summary.findings, summary.exact, summary.approximate, summary.files_scanned
    )?;
    if summary.suppressed > 0 {
        write!(out, ", {} suppressed by baseline", summary.suppressed)?;
    }
    if summary.failures > 0 {
        write!(out, ", {} method(s) failed analysis", summary.failures)?;
    }
    writeln!(out)
}

/// `true` if any finding requests a blocking severity.
pub fn has_blocking(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity >= Severity::Error)
}
