use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Resource;

#[derive(Parser)]
#[command(
    name = "hnapi",
    version,
    about = "Read-through JSON gateway over the Hacker News web pages",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// TOML configuration file (defaults to HNAPI_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one gateway operation and print the JSON result
    Fetch {
        /// news, newest, ask, show, jobs, best, active, noobstories,
        /// item, comments, newcomments or user
        resource: Resource,

        /// Item id, continuation token or user id
        arg: Option<String>,

        /// Listing page
        #[arg(long, default_value = "1")]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = commands::load_config(cli.config.as_deref())?;

    // Initialize tracing/logging; the flag wins over the configured format
    let log_format = if cli.log_format == "text" {
        config.logging.format.as_str()
    } else {
        cli.log_format.as_str()
    };
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!(
                bind = %config.server.bind_address(),
                upstream = %config.upstream.base_url,
                "Starting serve command"
            );
            commands::serve(config).await?;
        }

        Commands::Fetch {
            resource,
            arg,
            page,
        } => {
            tracing::info!(
                resource = ?resource,
                arg = ?arg,
                page = %page,
                "Starting fetch command"
            );
            commands::fetch(&config, resource, arg, page).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("hnapi=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
            tracing_subscriber::EnvFilter::try_new(format!("hnapi={level},warn"))
        })?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
