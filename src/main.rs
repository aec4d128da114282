//! Status Bridge - mirrors agent gateway activity into dashboard status files
//!
//! Runs until interrupted, keeping the dashboard's status file in step with
//! what the agent behind the gateway is doing.

use anyhow::Result;
use clap::{Parser, Subcommand};
use status_bridge::{
    config::{expand_home, BridgeConfig},
    credentials::CredentialResolver,
    StatusBridge,
};
use std::path::PathBuf;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "status-bridge")]
#[command(version)]
#[command(about = "Mirror agent gateway activity into dashboard status files")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "STATUS_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Override the gateway WebSocket URL
    #[arg(long)]
    gateway_url: Option<String>,

    /// Override the primary status file
    #[arg(long)]
    status_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge until Ctrl+C (default)
    Run,

    /// Check credentials, gateway URL and status targets
    Doctor,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("status_bridge={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Load configuration
    let mut config = BridgeConfig::resolve(cli.config.as_deref())?;
    if let Some(url) = cli.gateway_url {
        config.gateway.url = url;
    }
    if let Some(path) = cli.status_file {
        config.status.primary = path;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bridge(config).await?,
        Commands::Doctor => run_doctor(&config),
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_bridge(config: BridgeConfig) -> Result<()> {
    let mut bridge = StatusBridge::new(&config);
    let handle = bridge.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down...");
            handle.shutdown();
        }
    });

    bridge.run().await?;
    Ok(())
}

fn run_doctor(config: &BridgeConfig) {
    println!("Status Bridge Doctor");
    println!();

    println!("Checking credentials...");
    match CredentialResolver::from_config(&config.credentials).resolve() {
        Ok(resolved) => println!("  ✓ Gateway token found ({})", resolved.source),
        Err(e) => println!("  ✗ {}", e),
    }

    println!();
    println!("Checking gateway URL...");
    match config.gateway.url.as_str().into_client_request() {
        Ok(_) => println!("  ✓ {}", config.gateway.url),
        Err(e) => println!("  ✗ {}: {}", config.gateway.url, e),
    }

    println!();
    println!("Checking status targets...");
    let primary = expand_home(&config.status.primary);
    report_target("primary", &primary);
    for mirror in &config.status.mirrors {
        report_target("mirror", &expand_home(mirror));
    }

    println!();
    println!("Doctor check complete!");
}

fn report_target(kind: &str, path: &std::path::Path) {
    let dir_exists = path
        .parent()
        .map(|p| p.as_os_str().is_empty() || p.is_dir())
        .unwrap_or(false);
    if dir_exists {
        println!("  ✓ {} {}", kind, path.display());
    } else {
        println!("  ℹ {} {} (directory missing)", kind, path.display());
    }
}

fn show_config(config: Option<&BridgeConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
