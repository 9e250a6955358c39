use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "copilot-dashboard")]
#[command(version)]
#[command(about = "Monitoring dashboard backend for Co-Pilot agents")]
pub struct Cli {
    /// Settings file (defaults to settings.json in the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default settings.json into the data directory
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load raw events and connection heartbeats from JSONL files
    Import {
        #[arg(long)]
        events: Option<PathBuf>,

        #[arg(long)]
        connections: Option<PathBuf>,
    },

    /// Recompute daily rollups for an agent
    Rollup {
        agent: String,

        /// First day to recompute (defaults to yesterday)
        #[arg(long)]
        since: Option<NaiveDate>,
    },

    /// Print an agent's contribution series as JSON
    Contributions {
        agent: String,

        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Print connections seen in the last few minutes as JSON
    Connections {
        #[arg(short, long, default_value_t = 60)]
        minutes: i64,
    },

    /// Print version information
    Version,
}
