use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crew_interactions::registration::CommandRegistrar;
use crew_interactions::{
    Collaborators, MemoryStore, PortalConfig, PostgrestStore, build_state, router,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "crew-portal", version, about = "Crew portal Discord interactions webhook")]
struct Cli {
    /// Optional config file (toml/json). Environment variables override it.
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the resolved config (secrets masked) and exit.
    #[arg(long = "config-explain")]
    config_explain: bool,

    /// Port to serve the HTTP server on (default 8080)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (default 0.0.0.0)
    #[arg(long)]
    bind: Option<String>,

    /// Serve from an empty in-process store instead of the hosted one.
    #[arg(long = "memory-store")]
    memory_store: bool,

    /// Register slash commands with the platform and exit.
    #[arg(long = "register-commands")]
    register_commands: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "crew portal failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    if cli.config_explain {
        println!("{}", config.explain()?);
        return Ok(());
    }

    if cli.register_commands {
        let registrar = CommandRegistrar::new(reqwest::Client::new(), &config.discord);
        let registered = registrar.register().await?;
        println!("{registered}");
        return Ok(());
    }

    for key in config.missing_required() {
        if cli.memory_store && key.starts_with("store.") {
            continue;
        }
        error!(key, "required setting is missing; affected requests will fail");
    }

    let collaborators = if cli.memory_store {
        warn!("serving from an in-process store; reports are not persisted");
        Collaborators::shared(Arc::new(MemoryStore::new()))
    } else {
        Collaborators::shared(Arc::new(PostgrestStore::new(&config.store)))
    };

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "crew portal listening");
    axum::serve(listener, router(build_state(&config, collaborators)))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;
    info!("crew portal stopped");
    Ok(())
}

/// defaults, then file, then environment, then flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<PortalConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => PortalConfig::from_file(path)?,
        None => PortalConfig::default(),
    };
    config.apply_env()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    Ok(config)
}

async fn wait_for_shutdown() {
    tokio::signal::ctrl_c().await.ok();
}
