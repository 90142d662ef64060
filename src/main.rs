//! authrelay - OAuth relay and bearer-token verifier
//!
#![doc = "authrelay - OAuth relay and bearer-token verifier"]
#![doc = "Main entry point for the authrelay server and CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use authrelay::cli::{Cli, Commands};
use authrelay::commands;
use authrelay::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting relay server");
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::VerifyToken { token } => {
            tracing::debug!("Verifying bearer token");
            commands::verify_token::run_verify_token(config, token).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` raises the crate to
/// debug level.
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_filter = if verbose {
        "authrelay=debug,tower_http=debug"
    } else {
        "authrelay=info,tower_http=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
