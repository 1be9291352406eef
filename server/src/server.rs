//
// Copyright 2025-2026 The Rovertel Authors. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Telemetry server implementation
//!
//! The `TelemetryServer` is the main entry point. It owns the TCP
//! listener, the accept loop, the broadcast loop, and the shared state
//! every session works against.

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::logfile::TelemetryLog;
use crate::metrics::ServerMetrics;
use crate::random::{RandomSource, ThreadRandom};
use crate::registry::ClientRegistry;
use crate::secret::AdminSecret;
use crate::session::{run_session, Session, SessionWriter};
use crate::telemetry::{Broadcaster, SharedReading};
use rovertel_protocol::{ErrorReply, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything a session or the broadcaster needs to do its job
///
/// Built once per server and shared behind an `Arc`; nothing in here
/// holds a lock across an await point.
pub(crate) struct ServerState {
    pub(crate) registry: ClientRegistry,
    pub(crate) reading: SharedReading,
    pub(crate) secret: AdminSecret,
    pub(crate) random: Arc<dyn RandomSource>,
    pub(crate) metrics: ServerMetrics,
}

impl ServerState {
    pub(crate) fn new(
        config: &ServerConfig,
        secret: AdminSecret,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            registry: ClientRegistry::new(config.max_clients),
            reading: SharedReading::default(),
            secret,
            random,
            metrics: ServerMetrics::new(),
        }
    }
}

/// Multi-client telemetry server
///
/// Accepts line-oriented TCP clients, runs one session task per
/// connection, and pushes a sensor reading to every client on a fixed
/// interval.
///
/// # Example
///
/// ```no_run
/// use rovertel_server::{AdminSecret, ServerConfig, TelemetryServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     let secret = AdminSecret::resolve();
///     let server = TelemetryServer::new(config, secret).await?;
///
///     server.start().await?;
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///
///     Ok(())
/// }
/// ```
pub struct TelemetryServer {
    /// Server configuration
    config: ServerConfig,
    /// State shared with sessions and the broadcaster
    state: Arc<ServerState>,
    /// Listener bound at construction, consumed by `start`
    listener: tokio::sync::Mutex<Option<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Cancellation fan-out for the accept loop, broadcaster and sessions
    shutdown: CancellationToken,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// Broadcast loop task handle
    broadcast_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TelemetryServer {
    /// Create a server with the given configuration and admin secret
    ///
    /// This binds to the configured address but does not start accepting
    /// connections. Call `start()` to begin.
    pub async fn new(config: ServerConfig, secret: AdminSecret) -> Result<Self> {
        Self::with_random(config, secret, Arc::new(ThreadRandom)).await
    }

    /// Create a server with an explicit randomness source
    ///
    /// Scripted sources make obstacle rolls and sensor samples
    /// reproducible, which the integration tests rely on.
    pub async fn with_random(
        config: ServerConfig,
        secret: AdminSecret,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self> {
        config.validate().map_err(ServerError::InvalidConfig)?;

        let listener = TcpListener::bind(config.bind_address).await?;
        let bind_address = listener.local_addr()?;
        let state = Arc::new(ServerState::new(&config, secret, random));

        tracing::info!("Telemetry server bound to {}", bind_address);

        Ok(Self {
            config,
            state,
            listener: tokio::sync::Mutex::new(Some(listener)),
            bind_address,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
            accept_handle: tokio::sync::Mutex::new(None),
            broadcast_handle: tokio::sync::Mutex::new(None),
        })
    }

    /// Start accepting connections and broadcasting telemetry
    ///
    /// The server runs until `shutdown()` is called. Starting twice is
    /// an error, and a server that has been shut down cannot be started
    /// again.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }
        let Some(listener) = self.listener.lock().await.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(ServerError::AlreadyStarted);
        };

        tracing::info!("Starting telemetry server on {}", self.bind_address);

        let accept = self.spawn_accept_loop(listener);
        *self.accept_handle.lock().await = Some(accept);

        let log = TelemetryLog::new(self.config.log_path.clone(), self.config.log_max_bytes);
        let broadcaster = Broadcaster::new(
            self.state.clone(),
            log,
            self.config.broadcast_interval,
        );
        let broadcast = tokio::spawn(broadcaster.run(self.shutdown.clone()));
        *self.broadcast_handle.lock().await = Some(broadcast);

        Ok(())
    }

    /// Spawn the accept loop task
    fn spawn_accept_loop(&self, listener: TcpListener) -> JoinHandle<()> {
        let state = self.state.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let write_timeout = self.config.write_timeout;

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accepted = tokio::select! {
                    result = listener.accept() => result,
                    _ = shutdown.cancelled() => break,
                };

                match accepted {
                    Ok((socket, peer)) => {
                        tracing::debug!("Accepted connection from {}", peer);
                        let (read_half, write_half) = socket.into_split();
                        let writer = SessionWriter::new(write_half, write_timeout);

                        // Registration doubles as the capacity check.
                        match state.registry.register(peer, writer.clone()) {
                            Ok(token) => {
                                state.metrics.connection_opened();
                                tracing::info!(
                                    "Connection {} established from {}",
                                    token,
                                    peer
                                );
                                let session = Session::new(token, peer, state.clone());
                                tokio::spawn(run_session(
                                    session,
                                    read_half,
                                    writer,
                                    shutdown.clone(),
                                ));
                            }
                            Err(err) => {
                                state.metrics.connection_rejected();
                                tracing::warn!(
                                    "Rejecting connection from {}: {}",
                                    peer,
                                    err
                                );
                                let reply = Response::Error(ErrorReply::ServerFull);
                                let _ = writer.send_line(&reply.to_string()).await;
                                // Dropping both halves closes the socket.
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!("Failed to accept connection: {}", err);

                        // Back off on errors to avoid a tight loop
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }

            tracing::info!("Accept loop terminated");
        })
    }

    /// Shutdown the server gracefully
    ///
    /// Stops accepting, cancels the broadcaster and every session, then
    /// waits up to the configured shutdown timeout for the registry to
    /// drain.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServerError::NotRunning);
        }

        tracing::info!("Shutting down telemetry server");

        self.shutdown.cancel();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(self.config.shutdown_timeout, handle).await;
        }
        if let Some(handle) = self.broadcast_handle.lock().await.take() {
            let _ = tokio::time::timeout(self.config.shutdown_timeout, handle).await;
        }

        // Session tasks exit through the same token; give them until the
        // deadline to release their slots.
        let deadline = Instant::now() + self.config.shutdown_timeout;
        while !self.state.registry.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        tracing::info!("Telemetry server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    ///
    /// When the configuration asked for port 0 this is the actual port
    /// the listener received.
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of registered connections
    pub fn connection_count(&self) -> usize {
        self.state.registry.len()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> &ServerMetrics {
        &self.state.metrics
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for TelemetryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryServer")
            .field("bind_address", &self.bind_address())
            .field("running", &self.is_running())
            .field("connection_count", &self.connection_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

// Implement Drop to ensure cleanup
impl Drop for TelemetryServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("TelemetryServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown.cancel();
        }
    }
}
