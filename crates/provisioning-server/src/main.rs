//! provisioning-server: development binary for the provisioning API.
//!
//! Serves the API over in-memory users seeded from the config file, with a
//! scripted remote-auth provider standing in for the remote service.

use clap::Parser;
use provisioning_server::remote_auth::{Script, ScriptedProvider};
use provisioning_server::user::MemoryDirectory;
use provisioning_server::{ConfigOverrides, ProvisioningServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// provisioning-server: bridge provisioning API
#[derive(Parser, Debug)]
#[command(name = "provisioning-server", version, about = "Bridge provisioning API server")]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "~/.config/provisioning/config.toml")]
    config: String,

    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Route prefix (empty mounts at the root)
    #[arg(long)]
    prefix: Option<String>,

    /// Provisioning shared secret
    #[arg(long, env = "PROVISIONING_SHARED_SECRET")]
    shared_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    use tracing_subscriber::EnvFilter;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting provisioning-server");

    let config_path = PathBuf::from(&cli.config);
    let overrides = ConfigOverrides {
        host: cli.host,
        port: cli.port,
        prefix: cli.prefix,
        shared_secret: cli.shared_secret,
    };
    let config = match ServerConfig::load(Some(&config_path), overrides) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let directory = MemoryDirectory::from_seeds(&config.users);
    info!(users = directory.len(), "user directory ready");
    let provider = ScriptedProvider::new(Script::from_simulation(&config.simulation));

    let server = ProvisioningServer::new(config, Arc::new(directory), Arc::new(provider));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal");
        }
    }

    info!("provisioning-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
