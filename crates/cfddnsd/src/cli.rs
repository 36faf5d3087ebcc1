//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "cfddnsd",
    author,
    version,
    about = "Keep Cloudflare A/AAAA records in sync with this host's public address",
    long_about = None
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        env = "CFDDNS_CONFIG",
        default_value = "conf.toml",
        global = true
    )]
    pub config: PathBuf,

    // None runs the reconciliation loop
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run a single reconciliation pass and exit
    Once,
    /// Print the current record content for each configured family
    Now,
    /// Set the A record to the given address
    V4 {
        /// IPv4 address literal
        ip: String,
    },
    /// Set the AAAA record to the given address
    V6 {
        /// IPv6 address literal
        ip: String,
    },
    /// Send a test notification
    Tgtest,
}
