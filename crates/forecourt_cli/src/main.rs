//! Forecourt CLI
//!
//! Device-lookup utility: drive the Forecourt combobox over a device catalog
//! from a script of interaction steps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecourt_cn::ComboboxBuilder;
use forecourt_core::ReactiveContext;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod catalog;
mod config;
mod script;

use catalog::SimulatedLookup;
use config::ForecourtConfig;
use script::RevisionWatch;

#[derive(Parser)]
#[command(name = "forecourt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forecourt device-lookup utility", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a device from a catalog by replaying interaction steps
    Pick {
        /// JSON catalog of `{ "value", "label" }` entries
        #[arg(short = 'C', long)]
        catalog: PathBuf,

        /// Search through the simulated lookup instead of filtering locally
        #[arg(short, long)]
        dynamic: bool,

        /// Config file (default: ./forecourt.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Initially selected value
        #[arg(long, default_value = "")]
        value: String,

        /// Steps: open, close, toggle, outside, type:<text>, key:<name>,
        /// hover:<i>, click:<i>, wait:<ms>
        #[arg(required = true)]
        steps: Vec<String>,
    },

    /// Print the effective configuration
    CheckConfig {
        /// Config file (default: ./forecourt.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Pick {
            catalog,
            dynamic,
            config,
            value,
            steps,
        } => cmd_pick(&catalog, dynamic, config.as_deref(), value, &steps),

        Commands::CheckConfig { config } => cmd_check_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ForecourtConfig> {
    match path {
        Some(path) => ForecourtConfig::load(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            ForecourtConfig::load_from_dir(&cwd)
        }
    }
}

fn cmd_pick(
    catalog_path: &Path,
    dynamic: bool,
    config_path: Option<&Path>,
    value: String,
    steps: &[String],
) -> Result<()> {
    let config = load_config(config_path)?;
    let options = catalog::load_catalog(catalog_path)?;
    let steps = script::parse_steps(steps)?;

    info!(
        "Loaded {} devices from {} ({})",
        options.len(),
        catalog_path.display(),
        if dynamic { "dynamic" } else { "static" }
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        let ctx = ReactiveContext::new();
        let selected = ctx.use_state_keyed("device", || value);

        let builder = ComboboxBuilder::with_key(&ctx, "device-lookup", &selected)
            .on_change(|value| info!("Selection changed to {:?}", value));
        let builder = config.combobox.apply(builder);
        let builder = if dynamic {
            builder.lookup(SimulatedLookup::new(options, &config.lookup))
        } else {
            builder.options(options)
        };
        let combobox = builder.build()?;
        let (watch, _effect) = RevisionWatch::subscribe(&ctx, &combobox);

        script::run(&combobox, &steps, &mut std::io::stdout()).await?;

        info!(
            "Selected value: {:?} ({} visible changes)",
            selected.get(),
            watch.changes()
        );
        Ok::<_, anyhow::Error>(())
    })
}

fn cmd_check_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
