//! CLI module for the issuezz cache
//!
//! - `key`: print the cache key derived from a JSON document
//! - `probe`: round-trip a probe entry through the configured backend

pub mod key;
pub mod probe;

use clap::{Parser, Subcommand};

/// Memoization cache for issue matching and LLM completions
#[derive(Parser)]
#[command(name = "issuezz-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the cache key derived from a JSON document
    Key(key::KeyArgs),

    /// Write and read back a probe entry through the configured backend
    Probe,
}
