//! Command-line interface for working with manifests and exports offline.

mod commands;

pub use commands::run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "estuary", version, about = "Import social platform content archives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize a content manifest file.
    Stats {
        /// Path to a manifest JSON file.
        path: PathBuf,
    },
    /// Normalize a file of raw platform items and print the results.
    Normalize {
        /// Path to a JSON file holding an array of raw items.
        path: PathBuf,
        /// Adapter ID to attribute the items to.
        #[arg(long, default_value = "generic")]
        adapter: String,
    },
    /// Validate settings values against an adapter settings schema.
    CheckSettings {
        /// Path to a schema JSON file.
        schema: PathBuf,
        /// Path to a JSON file of settings values.
        values: PathBuf,
    },
}
