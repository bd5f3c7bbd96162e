//! TCP listener and server main loop

use super::coordinator::SessionCoordinator;
use crate::config::Config;
use crate::message_log::MessageLog;
use crate::room::RoomDirectory;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Chat server bound to a TCP address
pub struct ChatServer {
    listener: TcpListener,
    coordinator: Arc<SessionCoordinator>,
}

impl ChatServer {
    /// Bind the listener and build the room directory from `config`
    pub async fn bind(config: &Config, message_log: MessageLog) -> Result<Self> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind listener on {}", address))?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let directory = Arc::new(RoomDirectory::from_config(config));
        let coordinator = Arc::new(SessionCoordinator::new(config, directory, message_log));

        Ok(Self {
            listener,
            coordinator,
        })
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        self.coordinator.directory()
    }

    /// Start the room hubs and accept connections until shutdown
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        let hubs = self.coordinator.directory().start();

        loop {
            tokio::select! {
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }

                // Accept new connections
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let coordinator = Arc::clone(&self.coordinator);
                            tokio::spawn(async move {
                                coordinator.handle_connection(stream, addr.to_string()).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        for hub in hubs {
            hub.abort();
        }

        Ok(())
    }
}
