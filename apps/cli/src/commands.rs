//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use recipepull_checkpoint::CheckpointStore;
use recipepull_core::pipeline::{BatchState, PullBatch, PullOptions, PullProgress, PullSummary};
use recipepull_publisher::RecipeDbPublisher;
use recipepull_rakuten::RakutenClient;
use recipepull_shared::{
    AppConfig, CategoryLevel, init_config, load_config, load_config_from, validate_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// recipepull: mirror Rakuten recipe rankings into a search index.
#[derive(Parser)]
#[command(
    name = "recipepull",
    version,
    about = "Pull ranked recipes for every Rakuten recipe category into a recipe index.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file path (TOML, or JSON for .json files).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the batch, resuming from the checkpoint if one exists.
    Run,

    /// Show the progress recorded in the checkpoint.
    Status,

    /// Discard the checkpoint so the next run starts fresh.
    Reset,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file to ~/.recipepull/recipepull.toml.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "recipepull=info",
        1 => "recipepull=debug",
        _ => "recipepull=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run => cmd_run(cli.config).await,
        Command::Status => cmd_status(cli.config),
        Command::Reset => cmd_reset(cli.config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config),
        },
    }
}

fn resolve_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(&path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    validate_config(&config)?;

    let client = RakutenClient::new(&config.rakuten_api)?;
    let publisher = RecipeDbPublisher::new(&config.recipe_db)?;
    let store = CheckpointStore::new(&config.pull_batch.progress_filepath);
    let options = PullOptions::from(&config);

    info!(
        checkpoint = %store.path().display(),
        call_interval_sec = config.rakuten_api.call_interval_sec,
        recipe_db = %config.recipe_db.host,
        index = %config.recipe_db.index,
        "running pull batch"
    );

    let reporter = CliProgress::new();
    let batch = PullBatch::new(&client, &publisher, &store, options);

    let summary = match batch.run(&reporter).await {
        Ok(summary) => summary,
        Err(e) => {
            reporter.abandon();
            error!(error = %e, checkpoint = %store.path().display(), "pull batch aborted");
            return Err(e).wrap_err("pull batch aborted; rerun to resume from the checkpoint");
        }
    };

    println!();
    println!("  Pull batch finished!");
    println!("  Run:        {}", summary.run_id);
    println!(
        "  Start:      {}",
        if summary.resumed { "resumed from checkpoint" } else { "fresh" }
    );
    println!("  Categories: {}", summary.categories_processed);
    println!("  Empty:      {}", summary.empty_categories);
    println!("  Recipes:    {}", summary.recipes_published);
    if summary.recipes_skipped > 0 {
        println!("  Skipped:    {}", summary.recipes_skipped);
    }
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let store = CheckpointStore::new(&config.pull_batch.progress_filepath);

    let Some(checkpoint) = store.load_checkpoint()? else {
        println!("No batch in progress ({} not found).", store.path().display());
        return Ok(());
    };

    let progress = &checkpoint.progress;
    println!();
    println!("  Batch in progress");
    println!("  Checkpoint: {}", store.path().display());
    println!("  Saved at:   {}", checkpoint.saved_at.to_rfc3339());
    for level in CategoryLevel::ALL {
        println!(
            "  {:<11} {}/{}",
            format!("{level}:"),
            progress.completed_count(level),
            progress.categories.level(level).len()
        );
    }
    println!();

    Ok(())
}

fn cmd_reset(config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let store = CheckpointStore::new(&config.pull_batch.progress_filepath);

    if store.delete()? {
        println!("Checkpoint removed: {}", store.path().display());
    } else {
        println!("No checkpoint at {}", store.path().display());
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    if !config.rakuten_api.app_id.is_empty() {
        config.rakuten_api.app_id = "********".into();
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.abandon();
    }
}

impl PullProgress for CliProgress {
    fn state(&self, state: BatchState) {
        let message = match state {
            BatchState::Uninitialized => "Fetching category taxonomy".to_string(),
            BatchState::Seeded => "Taxonomy ready".to_string(),
            BatchState::Traversing(level) => format!("Pulling {level} categories"),
            BatchState::Completed => "Removing checkpoint".to_string(),
        };
        self.spinner.set_message(message);
    }

    fn category_started(&self, level: CategoryLevel, index: usize, total: usize, name: &str) {
        self.spinner
            .set_message(format!("[{level} {}/{total}] {name}", index + 1));
    }

    fn recipe_published(&self, recipe_id: u64, title: &str) {
        self.spinner.set_message(format!("Published {recipe_id} {title}"));
    }

    fn done(&self, _summary: &PullSummary) {
        self.spinner.finish_and_clear();
    }
}
