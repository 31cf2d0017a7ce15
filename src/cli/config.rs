//! CLI configuration module
//!
//! Turns parsed arguments into a validated runtime configuration.

use std::time::Duration;

use anyhow::Result;

use crate::cli::args::CliArgs;
use crate::dht::DEFAULT_GATEWAY;

/// Configuration for the did:dht tool
#[derive(Debug, Clone)]
pub struct Config {
    /// Relay gateway URL
    pub gateway: String,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Self {
        let gateway = args
            .gateway
            .clone()
            .unwrap_or_else(|| DEFAULT_GATEWAY.to_string());

        Self {
            gateway,
            timeout: Duration::from_secs(args.timeout),
            verbose: args.verbose,
            quiet: args.quiet,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.gateway)
            .map_err(|e| anyhow::anyhow!("Invalid gateway URL '{}': {}", self.gateway, e))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow::anyhow!(
                "Gateway scheme must be http or https, got '{}'",
                url.scheme()
            ));
        }

        if self.timeout == Duration::ZERO {
            return Err(anyhow::anyhow!("Timeout cannot be 0"));
        }

        Ok(())
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Command;

    fn args_with_gateway(gateway: Option<&str>) -> CliArgs {
        CliArgs {
            command: Command::Resolve {
                did: "did:dht:abc".to_string(),
            },
            gateway: gateway.map(str::to_string),
            timeout: 30,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_args(&args_with_gateway(None));

        assert_eq!(config.gateway, DEFAULT_GATEWAY);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_custom_gateway() {
        let config = Config::from_args(&args_with_gateway(Some("http://localhost:8305")));

        assert_eq!(config.gateway, "http://localhost:8305");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_scheme() {
        let config = Config::from_args(&args_with_gateway(Some("ftp://relay.example")));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_unparseable_gateway() {
        let config = Config::from_args(&args_with_gateway(Some("not a url")));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let mut args = args_with_gateway(None);
        args.timeout = 0;

        let config = Config::from_args(&args);
        assert!(config.validate().is_err());
    }
}
