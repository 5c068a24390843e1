//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Precis - summarize long documents through a local completion service
#[derive(Parser, Debug)]
#[command(name = "precis")]
#[command(version)]
#[command(about = "Chunked, multi-stage summarization of long documents")]
#[command(
    long_about = "Precis splits long documents into bounded chunks, summarizes each through an \
                  OpenAI-compatible completion endpoint, merges and polishes the results, and \
                  stores one JSON record per document."
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for summary records (overrides config and environment)
    #[arg(short, long, global = true)]
    pub out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize one text file
    Summarize {
        /// File to summarize
        file: PathBuf,

        /// Print the summary text after saving it
        #[arg(short, long, default_value_t = false)]
        print: bool,
    },

    /// Summarize existing and newly added files in a directory
    Watch {
        /// Upload directory to watch
        dir: PathBuf,
    },

    /// List stored summaries, newest first
    List {
        /// Emit JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Probe the completion service and show its health
    Probe,
}
