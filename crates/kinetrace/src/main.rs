use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use kinetrace_core::config::{OutputRouting, PipelineConfig, Settings};
use kinetrace_core::pipeline::{self, BatchSummary, FileOutcome};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Motion-capture recording cleaner", long_about = None)]
struct Cli {
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean every recording in a directory
    Clean(CleanArgs),
    /// Print the resolved channel layout and exercise orderings
    ShowConfig(ConfigArgs),
}

#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Pipeline configuration (TOML); falls back to KINETRACE_CONFIG, then built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Directory holding raw recordings
    #[arg(short, long, default_value = "data")]
    input: PathBuf,
    /// Directory receiving cleaned recordings
    #[arg(short, long, default_value = "cleaned_data")]
    output: PathBuf,
    /// Route output into per-date subdirectories
    #[arg(long)]
    by_date: bool,
    /// Files processed at once
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Clean(args) => handle_clean(args).await,
        Command::ShowConfig(args) => handle_show_config(args),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_settings(args: &ConfigArgs) -> Result<Settings> {
    let path = args
        .config
        .clone()
        .or_else(|| env::var_os("KINETRACE_CONFIG").map(PathBuf::from));

    let config = match path {
        Some(path) => {
            info!(config = %path.display(), "Loading pipeline configuration");
            PipelineConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    config
        .into_settings()
        .context("pipeline configuration is inconsistent")
}

async fn handle_clean(args: CleanArgs) -> Result<()> {
    let mut settings = load_settings(&args.config)?;
    if args.by_date {
        settings.routing = OutputRouting::ByDate;
    }
    if args.jobs == 0 {
        bail!("--jobs must be at least 1");
    }

    let inputs = pipeline::discover_inputs(&args.input, &settings.input_extension)
        .with_context(|| format!("failed to list inputs in {}", args.input.display()))?;
    if inputs.is_empty() {
        warn!(dir = %args.input.display(), "No input files found");
    }

    let summary = if args.jobs > 1 {
        pipeline::run_batch_concurrent(inputs, args.output.clone(), Arc::new(settings), args.jobs)
            .await?
    } else {
        pipeline::run_batch(&inputs, &args.output, &settings)?
    };

    print_summary(&summary);
    Ok(())
}

fn handle_show_config(args: ConfigArgs) -> Result<()> {
    let settings = load_settings(&args)?;

    println!("Default channel order: {}", settings.layout.prefixes().join(", "));
    println!("Duplicate policy: {:?}", settings.duplicate_policy);
    println!("Output routing: {:?}", settings.routing);

    if settings.exercises.is_empty() {
        println!("No exercise-specific orderings configured.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Exercise", "Channel order"]);
    for (exercise, order) in settings.exercises.iter() {
        table.add_row(vec![exercise.to_string(), order.join(", ")]);
    }
    println!("{table}");
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    let mut table = Table::new();
    table.set_header(vec!["File", "Status", "Rows", "Detail"]);
    for outcome in &summary.outcomes {
        let file = display_name(outcome.input());
        let row = match outcome {
            FileOutcome::Cleaned(report) => vec![
                file,
                "cleaned".to_string(),
                format!("{}/{}", report.rows_written, report.rows_read),
                format!(
                    "start {} | rejected {} | duplicates {} | alerts {}",
                    report.start_index,
                    report.rows_rejected,
                    report.duplicates.iter().map(|d| d.count).sum::<usize>(),
                    report.alerts.len()
                ),
            ],
            FileOutcome::Skipped { reason, .. } => {
                vec![file, "skipped".to_string(), "-".to_string(), reason.to_string()]
            }
            FileOutcome::Failed { error, .. } => {
                vec![file, "failed".to_string(), "-".to_string(), error.clone()]
            }
        };
        table.add_row(row);
    }
    println!("{table}");
    println!(
        "Processed {} files: {} cleaned, {} skipped, {} failed",
        summary.total(),
        summary.cleaned(),
        summary.skipped(),
        summary.failed()
    );
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
