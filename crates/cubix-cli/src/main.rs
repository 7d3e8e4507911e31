//! Cubix CLI
//!
//! Command-line interface for the Cubix speedcubing assistant

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cubix_catalog::{Catalog, Category};
use cubix_config::Config;
use cubix_core::CubixRuntime;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cubix")]
#[command(about = "WhatsApp speedcubing assistant over Evolution API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and conversation runtime
    Start,

    /// Validate the configuration and the algorithm catalog
    Check,
}

fn resolve_config(explicit: Option<&str>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path).with_context(|| format!("failed to load config {}", path));
    }
    if let Some(default) = Config::default_path() {
        if default.exists() {
            return Config::load(&default)
                .with_context(|| format!("failed to load config {}", default.display()));
        }
    }
    Config::from_env()
}

fn log_dir(config: &Config) -> PathBuf {
    let base = config
        .core
        .data_dir
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| dirs::data_dir().map(|dir| dir.join("cubix")))
        .unwrap_or_else(|| PathBuf::from(".cubix"));
    base.join("logs")
}

async fn run_start(config: Config, log_level: &str) -> Result<()> {
    let level = config
        .core
        .log_level
        .clone()
        .unwrap_or_else(|| log_level.to_string());
    let _guard = logging::init_logging(&log_dir(&config), &level)?;

    let runtime = CubixRuntime::new(config)?;
    runtime.run().await
}

fn run_check(config: &Config) -> Result<()> {
    config.validate()?;
    println!("Config OK (instance: {})", config.evolution.instance);

    let catalog = Catalog::load(&config.catalog.algorithms_file).with_context(|| {
        format!(
            "failed to load algorithm catalog from {}",
            config.catalog.algorithms_file
        )
    })?;
    for category in [Category::F2l, Category::Oll, Category::Pll] {
        println!("{}: {} cases", category, catalog.case_count(category));
    }

    let images_dir = PathBuf::from(&config.catalog.images_dir);
    if images_dir.is_dir() {
        println!("Images dir OK: {}", images_dir.display());
    } else {
        println!(
            "Images dir missing: {} (algorithms will be sent as plain text)",
            images_dir.display()
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Start => run_start(config, &cli.log_level).await,
        Commands::Check => run_check(&config),
    }
}
