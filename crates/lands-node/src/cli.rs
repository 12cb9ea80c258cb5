use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lands-node", about = "Land claim regions: store, map layer, sync and editor")]
pub struct Cli {
    /// Configuration file; created with defaults when missing
    #[arg(long, short, default_value = "lands.toml")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the node until Ctrl-C
    Run {
        /// Worlds to register with the map layer; defaults to the allowed worlds
        #[arg(long = "world")]
        worlds: Vec<String>,
    },
    /// Load the store fresh and print the load report
    Validate,
    /// Print a region's rendered rings as JSON
    Geometry {
        /// Region ID
        region_id: String,
    },
}
