//! CLI module
//!
//! Command-line interface for the did:dht tool.

pub mod args;
pub mod config;

pub use args::{CliArgs, Command};
pub use config::Config;
