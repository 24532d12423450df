//! docscaled: the docscale daemon.
//!
//! Serves the custom-resource scaling endpoint for a document database's
//! reader fleet, backed by an embedded redb store, and carries the
//! operator commands around it.
//!
//! # Usage
//!
//! ```text
//! docscaled serve --config /etc/docscale/docscale.toml --port 8443
//! docscaled fleet import fleet.json
//! docscaled register --api-endpoint abc123 --region us-east-1 --cluster docs --account 123456789012
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docscale_core::DaemonConfig;

mod fleet;
mod registration;
mod serve;

const DEFAULT_FILTER: &str = "info,docscale=debug,docscaled=debug";

#[derive(Parser)]
#[command(name = "docscaled", about = "docscale daemon", version)]
struct Cli {
    /// Path to docscale.toml. Defaults apply when the file is missing.
    #[arg(long, global = true, default_value = "docscale.toml")]
    config: PathBuf,

    /// tracing filter directive; overrides [logging].level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the scaling endpoint.
    Serve {
        /// Address to bind.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Route prefix, e.g. "/prod".
        #[arg(long)]
        base_path: Option<String>,
    },
    /// Manage the cluster registry.
    Fleet {
        #[command(subcommand)]
        action: FleetAction,
    },
    /// Print the one-time scalable target registration requests as JSON.
    Register {
        /// API gateway identifier in front of this daemon.
        #[arg(long)]
        api_endpoint: String,
        #[arg(long)]
        region: String,
        /// Database cluster identifier.
        #[arg(long)]
        cluster: String,
        /// Account that owns the autoscaling service-linked role.
        #[arg(long)]
        account: String,
    },
    /// Write a docscale.toml with every default spelled out.
    Init {
        /// Data directory recorded in the generated file.
        #[arg(long, default_value = "/var/lib/docscale")]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum FleetAction {
    /// Replace one cluster's registry records with a JSON fleet snapshot.
    Import {
        /// Path to the fleet snapshot.
        file: PathBuf,

        /// Data directory for persistent state.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = DaemonConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.log_level.as_deref(), config.logging.level.as_deref()))
        .init();

    match cli.command {
        Command::Serve {
            bind,
            port,
            data_dir,
            base_path,
        } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.store.data_dir = data_dir;
            }
            if let Some(base_path) = base_path {
                config.server.base_path = base_path;
            }
            serve::run_server(config).await
        }
        Command::Fleet {
            action: FleetAction::Import { file, data_dir },
        } => {
            if let Some(data_dir) = data_dir {
                config.store.data_dir = data_dir;
            }
            fleet::import(&config, &file)
        }
        Command::Register {
            api_endpoint,
            region,
            cluster,
            account,
        } => {
            let target = registration::Target {
                api_endpoint,
                region,
                cluster,
                account,
            };
            let document = registration::registration_document(&target, &config.registration);
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        Command::Init { data_dir } => {
            let scaffold = DaemonConfig::scaffold(&data_dir);
            std::fs::write(&cli.config, scaffold.to_toml_string()?)?;
            tracing::info!(path = ?cli.config, "config written");
            Ok(())
        }
    }
}

/// Command-line directive, then the config file, then `RUST_LOG`.
fn env_filter(cli_level: Option<&str>, config_level: Option<&str>) -> EnvFilter {
    match cli_level.or(config_level) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    }
}
