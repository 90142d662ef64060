//! Command-line interface definition for authrelay
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for running the relay server and for checking a
//! bearer token against the configured identity provider.

use clap::{Parser, Subcommand};

/// authrelay - OAuth relay and bearer-token verifier
///
/// Relays the OAuth authorization-code flow between a third-party client
/// and an identity provider, and verifies the access tokens that provider
/// issues.
#[derive(Parser, Debug, Clone)]
#[command(name = "authrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, env = "AUTHRELAY_JSON_LOGS")]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for authrelay
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the relay HTTP server
    Serve {
        /// Override the bind address from config (e.g. 0.0.0.0:3000)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Verify a bearer token and print the resulting auth context
    VerifyToken {
        /// The raw access token (without the `Bearer ` prefix)
        token: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Serve { bind: None },
        }
    }
}
