//! BackUP - Command-line interface for the backup engine.
//!
//! Mirrors every path listed in an input file into an output tree using
//! rsync, then prints a per-path table of added, updated and deleted entries.

mod logging;

use clap::error::ErrorKind;
use clap::Parser;
use engine::{
    create_backup, run_backup, stats, BackupConfig, EntryError, EntryOutcome, EntryReport,
    ExclusionRules, ProgressCallback, RsyncEngine, RunReport, SourceEntry,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// BackUP - mirror a list of paths into a backup tree
#[derive(Parser, Debug)]
#[command(name = "mirror-backup")]
#[command(version = "0.1.0")]
#[command(about = "Back up a list of files and directories with rsync")]
struct Args {
    /// File listing source paths, one per line (# comments allowed)
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Destination root (created if missing)
    #[arg(long, value_name = "DIR")]
    output: PathBuf,

    /// File of rsync exclude patterns applied to every source
    #[arg(long, value_name = "FILE")]
    exclude: Option<PathBuf>,

    /// File of absolute paths to exclude
    #[arg(long, value_name = "FILE")]
    path_exclude: Option<PathBuf>,

    /// Prefix removed from source paths when laying out the destination
    #[arg(long, value_name = "DIR")]
    strip_prefix: Option<PathBuf>,

    /// Delete files in the destination that no longer exist in a source directory
    #[arg(long)]
    delete: bool,

    /// Put the backup under <output>/<hostname>
    #[arg(long)]
    per_host: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// rsync binary to use
    #[arg(long, value_name = "PATH")]
    rsync: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,

    /// Print the final report as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Also write log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// CLI implementation of ProgressCallback
struct CliProgress {
    verbose: bool,
    start_time: Instant,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            start_time: Instant::now(),
        }
    }

    fn format_duration(elapsed: std::time::Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_run_started(&self, report: &RunReport, entry_count: usize) {
        eprintln!("Backing up {} sources", entry_count);
        eprintln!("  Output: {}", report.output_root.display());
        eprintln!();
    }

    fn on_entry_started(&self, index: usize, entry: &SourceEntry) {
        eprintln!("[{:3}] {} ({})", index + 1, entry.canonical_path.display(), entry.kind);
    }

    fn on_change_line(&self, _index: usize, line: &str) {
        if self.verbose {
            eprintln!("      {}", line);
        }
    }

    fn on_entry_skipped(&self, index: usize, raw_path: &str, error: &EntryError) {
        eprintln!("[{:3}] Skipped {}: {}", index + 1, raw_path, error);
    }

    fn on_entry_completed(&self, _index: usize, report: &EntryReport) {
        match &report.outcome {
            EntryOutcome::Synced => eprintln!(
                "      -> {} (+{} ~{} -{})",
                report.destination.display(),
                report.stats.added,
                report.stats.updated,
                report.stats.deleted
            ),
            EntryOutcome::Failed(msg) => eprintln!("      FAILED: {}", msg),
        }
    }

    fn on_run_completed(&self, report: &RunReport) {
        eprintln!();
        if report.cancelled {
            eprintln!("Backup cancelled.");
        } else {
            eprintln!("Backup complete!");
        }
        eprintln!(
            "{} attempted, {} skipped, {} failed",
            report.entries.len(),
            report.skipped,
            report.failed_count()
        );
        eprintln!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));
    }
}

/// Host name for the per-host layout.
fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Stop starting new entries on SIGINT/SIGTERM (and SIGHUP on Unix).
fn install_signal_handlers() -> Result<Arc<AtomicBool>, String> {
    use signal_hook::consts::{SIGINT, SIGTERM};

    let flag = Arc::new(AtomicBool::new(false));
    let mut signals = vec![SIGINT, SIGTERM];
    #[cfg(unix)]
    signals.push(signal_hook::consts::SIGHUP);

    for signal in signals {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .map_err(|e| format!("Cannot install signal handler: {}", e))?;
    }
    Ok(flag)
}

/// Turn parsed arguments into an engine config.
fn build_config(args: &Args) -> Result<BackupConfig, String> {
    let rules = ExclusionRules::load(args.exclude.as_deref(), args.path_exclude.as_deref())
        .map_err(|e| e.to_string())?;

    let mut config = BackupConfig::new(&args.output);
    if args.per_host {
        config = config.per_host(&host_name());
    }
    config.strip_prefix = args.strip_prefix.as_deref().map(canonical_or_given);
    config.rules = rules;
    config.delete = args.delete;
    config.dry_run = args.dry_run;
    Ok(config)
}

/// Canonicalize a path that exists; keep anything else as written.
fn canonical_or_given(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp => 1,
                ErrorKind::DisplayVersion => 0,
                _ => 2,
            };
            std::process::exit(code);
        }
    };

    if let Err(msg) = logging::init_logging(args.verbose, args.log_file.as_deref()) {
        eprintln!("Error: {}", msg);
        std::process::exit(2);
    }

    tracing::debug!(?args, "Parsed arguments");

    let cancel = match install_signal_handlers() {
        Ok(flag) => flag,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            std::process::exit(2);
        }
    };

    let exit_code = match run_cli(&args, Some(cancel)) {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("Error: cannot serialize report: {}", e),
                }
            } else {
                print!("{}", stats::render_summary(&report));
            }
            0
        }
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
///
/// Only configuration problems are errors. Per-entry failures end up in the
/// returned report.
fn run_cli(args: &Args, cancel: Option<Arc<AtomicBool>>) -> Result<RunReport, String> {
    let engine = match &args.rsync {
        Some(program) => RsyncEngine::locate_program(program),
        None => RsyncEngine::locate(),
    }
    .map_err(|e| e.to_string())?;
    tracing::debug!(program = %engine.program().display(), "Using sync engine");

    let config = build_config(args)?;

    let mut job = create_backup(&args.input, config).map_err(|e| e.to_string())?;
    if let Some(flag) = cancel {
        job.set_cancel_flag(flag);
    }

    let progress = CliProgress::new(args.verbose);
    run_backup(&mut job, &engine, Some(&progress)).map_err(|e| e.to_string())?;

    Ok(job.report)
}
