//! roomchat - multi-room chat server for telnet-style clients

use anyhow::Result;
use clap::Parser;
use roomchat::config::Config;
use roomchat::message_log::MessageLog;
use roomchat::server::ChatServer;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// How long shutdown waits for the message log to drain
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "roomchat")]
#[command(about = "Multi-room chat server for telnet-style clients")]
#[command(version)]
struct Cli {
    /// Path to config file (TOML, or JSON with a .json extension)
    #[arg(short, long, default_value = "etc/config.toml")]
    config: PathBuf,

    /// Bind address override
    #[arg(long)]
    bind: Option<String>,

    /// Bind port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Message log file override
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!("Reading configuration file: {}", cli.config.display());
    let mut config = Config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = cli.port {
        config.server.bind_port = port;
    }
    if let Some(log_file) = cli.log_file {
        config.log.file = log_file;
    }

    tracing::info!("Starting roomchat with rooms {:?}", config.rooms);

    let (message_log, log_writer) = MessageLog::open(&config.log.file).await?;
    let server = ChatServer::bind(&config, message_log).await?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                // A dropped sender reads as a shutdown signal.
                tracing::warn!("Failed to install Ctrl-C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    server.run(shutdown_rx).await?;

    // Open connections still hold log handles; give queued records a bounded
    // window to reach the file.
    if timeout(LOG_DRAIN_TIMEOUT, log_writer).await.is_err() {
        tracing::warn!("Message log writer did not finish within {:?}", LOG_DRAIN_TIMEOUT);
    }

    Ok(())
}
