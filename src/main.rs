//! Awsible command-line entry point.

mod cli;

use anyhow::Result;
use awsible::config::Config;
use awsible::error::Error;
use awsible::galaxy::GalaxyError;
use cli::commands::CommandContext;
use cli::{Cli, Commands, LogFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration before logging so the configured level applies
    let (config, config_error) = match Config::load(cli.config.as_ref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.logging.format));
    init_logging(cli.verbosity(), &config.logging.level, format);

    tracing::debug!(version = VERSION, "Starting awsible");
    if let Some(e) = config_error {
        tracing::warn!("Failed to load config, using defaults: {:#}", e);
    }

    let mut ctx = CommandContext::new(&cli, config);

    let result = match &cli.command {
        #[cfg(feature = "aws")]
        Commands::Module(args) => args.execute(&mut ctx).await,
        #[cfg(feature = "aws")]
        Commands::Lookup(args) => args.execute(&mut ctx).await,
        Commands::Galaxy(args) => args.execute(&mut ctx).await,
        Commands::Vault(args) => args.execute(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code);
}

/// Maps the first library error in the chain to its exit code.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<Error>() {
            return e.exit_code();
        }
        if cause.is::<GalaxyError>() {
            return 5;
        }
    }
    1
}

/// Initialize logging based on verbosity level
///
/// `RUST_LOG` wins, then `-v` flags, then the configured level.
fn init_logging(verbosity: u8, configured_level: &str, format: LogFormat) {
    let filter = match verbosity {
        0 => configured_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_exit_code_follows_error_chain() {
        let vault = anyhow::Error::new(Error::VaultFileNotFound("pass".into()))
            .context("Failed to read current password file");
        assert_eq!(exit_code_for(&vault), 6);

        let galaxy = anyhow::Error::new(GalaxyError::Other("boom".to_string()));
        assert_eq!(exit_code_for(&galaxy), 5);

        assert_eq!(exit_code_for(&anyhow::anyhow!("plain")), 1);
    }
}
