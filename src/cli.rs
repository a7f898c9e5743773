use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipgate")]
#[command(author, version, about = "Sandboxed video compatibility checker")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a batch of files and write the compatibility report
    Run {
        /// Input files to probe
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Report output path (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also deliver results toward a host (redirect URL on stdout
        /// when no host is reachable)
        #[arg(long)]
        deliver: bool,
    },

    /// Probe a single file and display its record
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a base64 results payload (as carried by a redirect URL)
    Decode {
        /// Encoded payload, or a full URL containing ?results=
        value: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
