mod report;
mod tracing_init;

use anyhow::Context;
use applier::FixTransaction;
use clap::{Parser, Subcommand};
use common::{Baseline, Diagnostic, Patch};
use engine::{Engine, EngineConfig, RULE};
use frontend::{path_util, AidlStubDetector, FileAnalysis, JavaHost, Prefilter};
use rayon::prelude::*;
use report::{Format, Summary};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "enforcer")]
#[command(about = "Converts manual binder permission checks into @EnforcePermission", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct AnalysisArgs {
    /// Java file or source tree.
    path: PathBuf,
    /// JSON engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also analyze stub methods without `@Override`.
    #[arg(long)]
    no_require_override: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report convertible permission checks.
    Scan {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
        /// Suppress findings recorded in this baseline file.
        #[arg(long)]
        baseline: Option<PathBuf>,
    },
    /// Apply the suggested patches.
    Fix {
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Also apply approximate conversions.
        #[arg(long)]
        include_approximate: bool,
        /// Print patched files instead of writing them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Record current findings so later scans only report new ones.
    Baseline {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = ".enforcer/baseline.json")]
        output: PathBuf,
    },
    /// Describe the rule.
    Explain,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    tracing_init::init_tracing(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Scan {
            analysis,
            format,
            baseline,
        } => cmd_scan(analysis, *format, baseline.as_deref()),
        Commands::Fix {
            analysis,
            include_approximate,
            dry_run,
        } => cmd_fix(analysis, *include_approximate, *dry_run),
        Commands::Baseline { analysis, output } => cmd_baseline(analysis, output),
        Commands::Explain => {
            cmd_explain();
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ---------------------------------------------------------------------------
// analysis
// ---------------------------------------------------------------------------

/// Findings of one analyzed file, keyed by its on-disk path.
struct FileFindings {
    path: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
struct TreeAnalysis {
    files: Vec<FileFindings>,
    summary: Summary,
}

impl TreeAnalysis {
    /// All findings, ordered by path and position.
    fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut all: Vec<Diagnostic> = self
            .files
            .iter()
            .flat_map(|f| f.diagnostics.iter().cloned())
            .collect();
        all.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.location.start.offset.cmp(&b.location.start.offset))
        });
        all
    }
}

enum FileOutcome {
    Skipped,
    Analyzed(PathBuf, FileAnalysis),
    Failed,
}

fn load_engine(args: &AnalysisArgs) -> anyhow::Result<Engine> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(Engine::new(config))
}

fn detector(args: &AnalysisArgs) -> AidlStubDetector {
    AidlStubDetector {
        require_override: !args.no_require_override,
    }
}

/// Discovers, prefilters and analyzes every Java file under `root` in parallel.
fn analyze_tree(root: &Path, engine: &Engine, detector: &AidlStubDetector) -> anyhow::Result<TreeAnalysis> {
    anyhow::ensure!(root.exists(), "path does not exist: {}", root.display());
    let files = frontend::discover(root);
    let prefilter = Prefilter::new(engine.config())?;
    info!(files = files.len(), root = %root.display(), "analyzing");

    let outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map_init(JavaHost::new, |host, path| {
            let host = match host {
                Ok(h) => h,
                Err(e) => {
                    warn!(error = %e, "parser unavailable");
                    return FileOutcome::Failed;
                }
            };
            analyze_one(host, engine, detector, &prefilter, root, path)
        })
        .collect();

    let mut result = TreeAnalysis::default();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Skipped => result.summary.files_skipped += 1,
            FileOutcome::Failed => result.summary.failures += 1,
            FileOutcome::Analyzed(path, analysis) => {
                result.summary.files_scanned += 1;
                result.summary.methods += analysis.methods;
                result.summary.failures += analysis.failures;
                if !analysis.diagnostics.is_empty() {
                    result.files.push(FileFindings {
                        path,
                        diagnostics: analysis.diagnostics,
                    });
                }
            }
        }
    }
    Ok(result)
}

fn analyze_one(
    host: &mut JavaHost,
    engine: &Engine,
    detector: &AidlStubDetector,
    prefilter: &Prefilter,
    root: &Path,
    path: &Path,
) -> FileOutcome {
    match prefilter.matches_file(path) {
        Ok(true) => {}
        Ok(false) => return FileOutcome::Skipped,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return FileOutcome::Failed;
        }
    }
    let display_name = path_util::display_path(path, root).unwrap_or_else(|_| path.display().to_string());
    match host.analyze_file(engine, detector, path, &display_name) {
        Ok(analysis) => FileOutcome::Analyzed(path.to_path_buf(), analysis),
        Err(e) => {
            warn!(path = %display_name, error = %e, "skipping file");
            FileOutcome::Failed
        }
    }
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn cmd_scan(args: &AnalysisArgs, format: Format, baseline: Option<&Path>) -> anyhow::Result<ExitCode> {
    let engine = load_engine(args)?;
    let analysis = analyze_tree(&args.path, &engine, &detector(args))?;
    let mut diagnostics = analysis.diagnostics();
    let mut summary = analysis.summary;

    if let Some(path) = baseline {
        let baseline = Baseline::load(path)
            .with_context(|| format!("loading baseline {}", path.display()))?;
        summary.suppressed = baseline.filter(&mut diagnostics);
    }
    summary.count(&diagnostics);

    let stdout = std::io::stdout();
    report::write_report(&mut stdout.lock(), format, &diagnostics, &summary)?;

    Ok(if report::has_blocking(&diagnostics) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

// ---------------------------------------------------------------------------
// fix
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
struct FixSummary {
    files_patched: usize,
    methods_converted: usize,
    /// Files restored because the patched text no longer parsed.
    files_reverted: usize,
}

/// Patches to apply, grouped per file; approximate ones only when asked.
fn select_patches(analysis: &TreeAnalysis, include_approximate: bool) -> BTreeMap<PathBuf, Vec<Patch>> {
    let mut by_file: BTreeMap<PathBuf, Vec<Patch>> = BTreeMap::new();
    for file in &analysis.files {
        let patches: Vec<Patch> = file
            .diagnostics
            .iter()
            .filter(|d| include_approximate || d.is_exact())
            .filter_map(|d| d.patch.clone())
            .collect();
        if !patches.is_empty() {
            by_file.insert(file.path.clone(), patches);
        }
    }
    by_file
}

fn apply_fixes(
    project_root: &Path,
    by_file: &BTreeMap<PathBuf, Vec<Patch>>,
) -> anyhow::Result<FixSummary> {
    let mut host = JavaHost::new()?;
    apply_fixes_with(project_root, by_file, |text| Ok(host.has_syntax_errors(text)?))
}

/// Applies `by_file` in one transaction. `breaks_syntax` vets each patched
/// text; a file it flags is restored on its own. Any error rolls back every
/// file touched so far.
fn apply_fixes_with(
    project_root: &Path,
    by_file: &BTreeMap<PathBuf, Vec<Patch>>,
    mut breaks_syntax: impl FnMut(&str) -> anyhow::Result<bool>,
) -> anyhow::Result<FixSummary> {
    let mut tx = FixTransaction::new(project_root)?;
    let mut summary = FixSummary::default();

    for (path, patches) in by_file {
        let step = apply_file(&mut tx, path, patches, &mut breaks_syntax)
            .with_context(|| format!("fixing {}", path.display()));
        match step {
            Ok(true) => {
                summary.files_patched += 1;
                summary.methods_converted += patches.len();
            }
            Ok(false) => summary.files_reverted += 1,
            Err(e) => {
                tx.rollback()?;
                return Err(e);
            }
        }
    }

    tx.commit()?;
    Ok(summary)
}

/// `Ok(false)` when the patched file had to be restored.
fn apply_file(
    tx: &mut FixTransaction,
    path: &Path,
    patches: &[Patch],
    breaks_syntax: &mut impl FnMut(&str) -> anyhow::Result<bool>,
) -> anyhow::Result<bool> {
    let patched = tx.apply_patches(path, patches)?;
    if breaks_syntax(&patched)? {
        warn!(path = %path.display(), "patched file no longer parses; restoring");
        tx.restore(path)?;
        return Ok(false);
    }
    Ok(true)
}

fn cmd_fix(args: &AnalysisArgs, include_approximate: bool, dry_run: bool) -> anyhow::Result<ExitCode> {
    let engine = load_engine(args)?;
    let analysis = analyze_tree(&args.path, &engine, &detector(args))?;
    let by_file = select_patches(&analysis, include_approximate);

    if by_file.is_empty() {
        println!("Nothing to fix.");
        return Ok(ExitCode::SUCCESS);
    }

    if dry_run {
        for (path, patches) in &by_file {
            let source = JavaHost::read_source(path)?;
            let patched = common::patch::apply_all(&source, patches)
                .with_context(|| format!("patching {}", path.display()))?;
            println!("--- {}", path.display());
            print!("{patched}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let project_root = if args.path.is_dir() {
        args.path.clone()
    } else {
        args.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let summary = apply_fixes(&project_root, &by_file)?;
    println!(
        "Converted {} method(s) in {} file(s).",
        summary.methods_converted, summary.files_patched
    );
    if summary.files_reverted > 0 {
        println!(
            "{} file(s) restored: the patched text did not parse.",
            summary.files_reverted
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// baseline / explain
// ---------------------------------------------------------------------------

fn cmd_baseline(args: &AnalysisArgs, output: &Path) -> anyhow::Result<ExitCode> {
    let engine = load_engine(args)?;
    let analysis = analyze_tree(&args.path, &engine, &detector(args))?;
    let diagnostics = analysis.diagnostics();
    let baseline = Baseline::from_diagnostics(&diagnostics);
    baseline
        .save(output)
        .with_context(|| format!("writing baseline {}", output.display()))?;
    println!(
        "Baseline of {} finding(s) written to {}",
        baseline.len(),
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_explain() {
    println!("{}: {}", RULE.id, RULE.brief);
    println!();
    println!("{}", RULE.explanation);
    println!();
    println!(
        "category: {:?}, priority: {}, default severity: {}",
        RULE.category, RULE.priority, RULE.default_severity
    );
}
