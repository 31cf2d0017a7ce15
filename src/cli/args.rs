//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::{Parser, Subcommand};

/// CLI arguments for the did:dht tool
#[derive(Debug, Parser)]
#[command(name = "did-dht")]
#[command(about = "Publish and resolve did:dht identities", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Relay gateway URL
    #[arg(short, long, value_name = "URL", global = true)]
    pub gateway: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30, global = true)]
    pub timeout: u64,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Operations the tool supports
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new identity key and print its DID
    Generate {
        /// Publish the starter document for the new identity
        #[arg(long)]
        publish: bool,
    },
    /// Publish the starter document for an existing identity key
    Publish {
        /// Hex-encoded Ed25519 private key
        #[arg(long, value_name = "HEX")]
        private_key: String,
        /// Registered type index to advertise (repeatable)
        #[arg(long = "type", value_name = "INDEX")]
        types: Vec<u8>,
    },
    /// Resolve an identifier to its document
    Resolve {
        /// The did:dht identifier
        #[arg(value_name = "DID")]
        did: String,
    },
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}
