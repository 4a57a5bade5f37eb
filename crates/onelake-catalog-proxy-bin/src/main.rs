use clap::{Parser, Subcommand};
use onelake_catalog_proxy::ProxyConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod healthcheck;
mod serve;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy
    Serve {},
    /// Check the health of a running proxy
    Healthcheck {},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = ProxyConfig::load()?;

    match cli.command {
        Some(Commands::Serve {}) => {
            tracing::info!("Starting server on 0.0.0.0:{}...", config.listen_port);
            serve::serve(config).await?;
        }
        Some(Commands::Healthcheck {}) => {
            healthcheck::health(&config).await?;
        }
        None => {
            // Error out if no subcommand is provided.
            eprintln!("No subcommand provided. Use --help for more information.");
        }
    }

    Ok(())
}
