//! TCP listener for incoming client connections

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};

use super::connection::Connection;
use crate::auth::AuthenticationHandler;
use crate::config::Config;
use crate::error::Result;
use crate::schema::SchemaResolver;

/// Listener statistics
#[derive(Debug, Default)]
pub struct ListenerStats {
    /// Total connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub connections_active: AtomicU64,
    /// Connections rejected due to limit
    pub connections_rejected: AtomicU64,
}

/// TCP listener that accepts client connections and runs each one on its
/// own task.
pub struct Listener {
    listener: TcpListener,
    config: Arc<Config>,
    handler: Arc<dyn AuthenticationHandler>,
    schemas: Arc<dyn SchemaResolver>,
    stats: Arc<ListenerStats>,
    shutdown_rx: broadcast::Receiver<()>,
    /// Connection limit semaphore (None = unlimited)
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(
        config: Arc<Config>,
        handler: Arc<dyn AuthenticationHandler>,
        schemas: Arc<dyn SchemaResolver>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self> {
        let addr = format!(
            "{}:{}",
            config.server.listen_address, config.server.listen_port
        );

        let listener = TcpListener::bind(&addr).await?;

        // 0 = unlimited
        let connection_semaphore = if config.server.max_connections > 0 {
            info!(
                "Listening on {} (max {} connections)",
                addr, config.server.max_connections
            );
            Some(Arc::new(Semaphore::new(config.server.max_connections)))
        } else {
            info!("Listening on {} (unlimited connections)", addr);
            None
        };

        Ok(Self {
            listener,
            config,
            handler,
            schemas,
            stats: Arc::new(ListenerStats::default()),
            shutdown_rx,
            connection_semaphore,
        })
    }

    /// Get listener statistics
    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Get the local address the listener is bound to.
    ///
    /// This is useful when binding to port 0 to get an OS-assigned port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.accept(stream, addr),
                        Err(e) => {
                            error!("Accept error: {}", e);
                            // Brief delay before retrying
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        info!(
            "Listener stopped. Total: {}, Active: {}, Rejected: {}",
            self.stats.connections_accepted.load(Ordering::Relaxed),
            self.stats.connections_active.load(Ordering::Relaxed),
            self.stats.connections_rejected.load(Ordering::Relaxed)
        );

        Ok(())
    }

    fn accept(&self, stream: TcpStream, addr: SocketAddr) {
        let permit = match &self.connection_semaphore {
            Some(semaphore) => match Arc::clone(semaphore).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(
                        "Connection from {} rejected: max connections ({}) reached",
                        addr, self.config.server.max_connections
                    );
                    self.stats
                        .connections_rejected
                        .fetch_add(1, Ordering::Relaxed);
                    drop(stream);
                    return;
                }
            },
            None => None,
        };

        debug!("Accepted connection from {}", addr);
        self.stats
            .connections_accepted
            .fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        let connection = Connection::new(
            stream,
            addr,
            Arc::clone(&self.handler),
            Arc::clone(&self.schemas),
            self.shutdown_rx.resubscribe(),
        )
        .with_server_version(self.config.server.server_version.clone())
        .with_handshake_timeout(Duration::from_secs(self.config.server.handshake_timeout_secs));
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            // Held for the connection's lifetime
            let _permit = permit;

            if let Err(e) = connection.handle().await {
                warn!("Connection from {} error: {}", addr, e);
            }
            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            debug!("Connection from {} closed", addr);
        });
    }
}
