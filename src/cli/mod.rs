//! CLI for the storefront auth service

pub mod serve;

use clap::{Parser, Subcommand};

/// Storefront Auth - session token service for the storefront backend
#[derive(Parser)]
#[command(name = "storefront-auth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the auth API server
    Serve,
}
