//! foldertabs CLI
//!
//! Usage:
//!   foldertabs open ~/src ~/docs ~/notes     # one window, three tabs
//!   foldertabs open --single ~/src           # one folder, plain window
//!   foldertabs validate ~/src /missing       # what would be opened
//!   foldertabs bounds                        # front window position, as x,y,w,h
//!   foldertabs doctor                        # is tab automation usable here

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use foldertabs::{
    check_automation_health, platforms, HealthStatus, OpenListener, OpenOptions, OpenOutcome,
    PathFailure, TabOpener, TierKind, Validator, WindowRect,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod logging;

#[derive(Parser)]
#[command(name = "foldertabs")]
#[command(about = "Open several folders as tabs of one Explorer or Finder window")]
struct Cli {
    /// Debug logging on stderr and in the log file
    #[clap(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
struct OpenArgs {
    /// Folders to open, first one becomes the window's initial tab
    #[clap(required = true)]
    paths: Vec<String>,

    /// Open only the first folder, in a window of its own
    #[clap(long)]
    single: bool,

    /// JSON file with OpenOptions fields; flags below override it
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Per-tab navigation timeout in milliseconds
    #[clap(long, env = "FOLDERTABS_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Place the window at x,y,width,height
    #[clap(long, env = "FOLDERTABS_WINDOW")]
    window: Option<WindowRect>,

    /// Reuse the position of the current front window
    #[clap(long, conflicts_with = "window")]
    same_place: bool,

    /// Print the outcome as JSON instead of a summary
    #[clap(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    #[clap(required = true)]
    paths: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open folders as tabs of one window
    Open(OpenArgs),
    /// Show which inputs would be opened and which rejected
    Validate(ValidateArgs),
    /// Print the front file-manager window's position and size
    Bounds,
    /// Check whether tab automation is usable on this machine
    Doctor {
        /// Print the full report as JSON
        #[clap(long)]
        json: bool,
    },
}

/// Progress on stderr as the worker reports it.
struct ConsoleListener;

impl OpenListener for ConsoleListener {
    fn on_progress(&self, index: usize, total: usize, path: &str) {
        eprintln!("{} [{}/{}] {}", "✓".green(), index + 1, total, path);
    }

    fn on_path_failed(&self, failure: &PathFailure) {
        eprintln!(
            "{} [{}] {}: {}",
            "✗".red(),
            failure.index + 1,
            failure.path,
            failure.reason
        );
    }

    fn on_escalation(&self, from: TierKind, to: TierKind, reason: &str) {
        eprintln!(
            "{} {} unavailable ({}), trying {}",
            "→".yellow(),
            from,
            reason,
            to
        );
    }
}

fn load_options(args: &OpenArgs) -> Result<OpenOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<OpenOptions>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => OpenOptions::default(),
    };

    if let Some(timeout_ms) = args.timeout_ms {
        options.navigation_timeout_ms = timeout_ms;
    }
    if let Some(rect) = args.window {
        options.window_rect = Some(rect);
    } else if args.same_place {
        options.window_rect =
            platforms::frontmost_window_rect().context("Failed to read front window bounds")?;
    }

    debug!("Effective options: {:?}", options);
    Ok(options)
}

fn print_summary(outcome: &OpenOutcome) {
    let headline = if outcome.is_complete() {
        "DONE".green().bold()
    } else if outcome.cancelled {
        "CANCELLED".yellow().bold()
    } else {
        "PARTIAL".red().bold()
    };
    println!(
        "{} {} of {} folders via {} in {}ms",
        headline,
        outcome.succeeded.len(),
        outcome.succeeded.len() + outcome.failed.len(),
        outcome.tier,
        outcome.elapsed_ms
    );
    if outcome.degraded {
        println!("  {}", "opened as separate windows, not tabs".yellow());
    }
    for failure in &outcome.failed {
        println!("  {} {}: {}", "✗".red(), failure.path, failure.reason);
    }
}

async fn run_open(args: OpenArgs) -> Result<i32> {
    let options = load_options(&args)?;
    let opener = TabOpener::new(options)
        .context("Tab automation is not supported here")?
        .with_listener(Arc::new(ConsoleListener));

    if args.single {
        let first = &args.paths[0];
        opener
            .open_folder(first)
            .await
            .with_context(|| format!("Failed to open {first}"))?;
        return Ok(0);
    }

    let opener = Arc::new(opener);
    {
        let opener = Arc::clone(&opener);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, cancelling");
                opener.shutdown();
            }
        });
    }

    let outcome = opener
        .open_paths_as_tabs(&args.paths)
        .await
        .context("Failed to open folders")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(if outcome.is_complete() { 0 } else { 1 })
}

fn run_validate(args: ValidateArgs) -> i32 {
    let (accepted, rejected) = Validator::default().partition(&args.paths);
    for folder in &accepted {
        println!("{} {}", "✓".green(), folder);
    }
    for raw in &rejected {
        println!("{} {} {}", "✗".red(), raw, "(not a directory)".dimmed());
    }
    if accepted.is_empty() || !rejected.is_empty() {
        1
    } else {
        0
    }
}

fn run_bounds() -> Result<i32> {
    match platforms::frontmost_window_rect().context("Failed to read front window bounds")? {
        Some(rect) => {
            println!("{rect}");
            Ok(0)
        }
        None => {
            eprintln!("No file-manager window is open");
            Ok(1)
        }
    }
}

async fn run_doctor(json: bool) -> Result<i32> {
    let report = check_automation_health().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.status.exit_code());
    }

    let status = match report.status {
        HealthStatus::Healthy => "HEALTHY".green().bold(),
        HealthStatus::Degraded => "DEGRADED".yellow().bold(),
        HealthStatus::Unhealthy => "UNHEALTHY".red().bold(),
    };
    println!("{} on {} ({}ms)", status, report.platform, report.check_duration_ms);

    let check = |ok: bool| if ok { "✓".green() } else { "✗".red() };
    println!("  {} automation API", check(report.api_available));
    println!("  {} file manager reachable", check(report.file_manager_reachable));
    println!("  {} input permitted", check(report.input_permitted));
    match report.expected_tier {
        Some(tier) => println!("  expected tier: {tier}"),
        None => println!("  expected tier: none"),
    }
    if let Some(error) = &report.error_message {
        println!("  {}", error.red());
    }
    Ok(report.status.exit_code())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Open(args) => run_open(args).await?,
        Commands::Validate(args) => run_validate(args),
        Commands::Bounds => run_bounds()?,
        Commands::Doctor { json } => run_doctor(json).await?,
    };
    std::process::exit(code);
}
