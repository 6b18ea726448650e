//! Karaokify - Karaoke Video Pipeline
//!
//! Entry point of the karaokify binary. Progress percentages and the
//! completion line go to stdout; logs go to stderr and a daily log file.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use karaokify::cli::{Args, Commands};
use karaokify::config::{Config, DEFAULT_CONFIG_FILE};
use karaokify::paths::WorkingPaths;
use karaokify::progress::ProgressReporter;
use karaokify::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;
    info!("Starting Karaokify - Karaoke Video Pipeline");

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    let work_dir = config.resolve_work_dir()?;
    let workflow = Workflow::new(&config, WorkingPaths::new(work_dir));

    match args.command.unwrap_or_default() {
        Commands::Run { input, thumbnail_url, cleanup } => {
            if let Some(input) = input {
                workflow.ingest(&input).await?;
            }
            if let Some(url) = thumbnail_url {
                workflow.fetch_thumbnail(&url).await?;
            }

            let mut reporter = ProgressReporter::new();
            let final_video = workflow.run(&mut reporter).await?;

            if cleanup {
                let removed = workflow.clean_working_files(true).await?;
                info!("Removed {} intermediate files", removed);
            }
            println!("Karaoke video ready: {}", final_video.display());
        }
        Commands::Clean { keep_video } => {
            let removed = workflow.clean_working_files(keep_video).await?;
            println!("Removed {} working files from {}", removed, workflow.paths().root().display());
        }
        Commands::Check => {
            workflow.check_tools().await?;
            println!("All external tools are available");
        }
    }

    info!("Karaokify completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let app_dir = std::env::current_dir()?.join(".karaokify");
    let log_dir = app_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "karaokify.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console layer writes to stderr; stdout carries progress
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("karaokify.log").display());

    Ok(())
}
