//! Command-line interface for mirro.

mod commands;

use clap::{Parser, Subcommand};

/// mirro - social events backend with parental controls
#[derive(Parser)]
#[command(name = "mirro")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the maintenance scheduler (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Delete expired and redeemed reset tokens once, then exit
    PurgeTokens,
}

pub use commands::*;
