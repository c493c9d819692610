use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rekey::audit;
use rekey::models::Mode;
use rekey::pipeline::{self, RunConfig, WorkDir};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "rekey")]
#[command(about = "Replace event identifiers in failed events before republishing")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite events from old/ for every id in ids/ into new/
    Run(RunArgs),
    /// Check that new/ ids and events are row-aligned
    Audit(AuditArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Working directory containing ids/ and old/
    #[arg(short, long)]
    workdir: String,

    /// Matching strategy
    #[arg(short, long, value_enum, default_value_t = Mode::Literal)]
    mode: Mode,

    /// Remove new/ before starting
    #[arg(long)]
    clean: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args)]
struct AuditArgs {
    /// Working directory containing new/
    #[arg(short, long)]
    workdir: String,
}

fn run_rekey(args: RunArgs) -> Result<()> {
    let config = RunConfig {
        workdir: WorkDir::new(&args.workdir),
        mode: args.mode,
        clean: args.clean,
        show_progress: !args.no_progress,
    };

    let summary = pipeline::run(&config)
        .with_context(|| format!("Run failed in working directory: {}", args.workdir))?;

    println!();
    println!("=== Summary ===");
    println!("Mode:               {}", args.mode);
    println!("Load time:          {:.2}s", summary.load_duration.as_secs_f64());
    println!(
        "Resolve time:       {:.2}s",
        summary.resolve_duration.as_secs_f64()
    );
    println!("Records loaded:     {}", summary.records);
    println!("Identifiers loaded: {}", summary.identifiers);
    println!("Resolved:           {}", summary.resolved);
    println!("Unmatched:          {}", summary.unmatched);
    println!("Rows written:       {}", summary.written);

    Ok(())
}

fn run_audit(args: AuditArgs) -> Result<()> {
    let workdir = WorkDir::new(&args.workdir);
    let report = audit::audit_output(&workdir.new_ids_file(), &workdir.new_events_file())
        .with_context(|| format!("Failed to audit output in: {}", workdir.new_dir().display()))?;

    for violation in &report.violations {
        println!("{}", violation);
    }
    if !report.is_clean() {
        bail!(
            "{} violations across {} rows",
            report.violations.len(),
            report.rows
        );
    }
    println!("{} rows aligned", report.rows);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Run(args) => run_rekey(args),
        Commands::Audit(args) => run_audit(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
