use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Defaults to `run` over the files already in the working directory
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Build the karaoke video from the working directory
    Run {
        /// Media file converted into the working mixed track first
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Background image downloaded before the pipeline starts
        #[arg(short, long)]
        thumbnail_url: Option<String>,

        /// Remove intermediate files after a successful run
        #[arg(long)]
        cleanup: bool,
    },

    /// Remove working files left by previous runs
    Clean {
        /// Keep the final karaoke video
        #[arg(long)]
        keep_video: bool,
    },

    /// Verify that the external tools can be launched
    Check,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            input: None,
            thumbnail_url: None,
            cleanup: false,
        }
    }
}
