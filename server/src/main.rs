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

//! Telemetry Robot Server Daemon
//!
//! Binds the telemetry server, runs until interrupted, then shuts down
//! gracefully.
//!
//! # Usage
//!
//! ```bash
//! rovertel-server --port 7007
//! rovertel-server --host 127.0.0.1 --max-clients 25 --interval-secs 5
//! ```

use clap::Parser;
use rovertel_server::{
    AdminSecret, DEFAULT_BROADCAST_SECS, DEFAULT_LOG_MAX_BYTES, DEFAULT_MAX_CLIENTS, Result,
    ServerConfig, TelemetryServer,
};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Telemetry Robot Server
#[derive(Parser, Debug)]
#[command(name = "rovertel-server")]
#[command(about = "Multi-client telemetry robot server", version)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "ROVERTEL_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "ROVERTEL_PORT", default_value_t = 7007)]
    port: u16,

    /// Maximum number of simultaneous clients
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Seconds between telemetry broadcasts
    #[arg(long, default_value_t = DEFAULT_BROADCAST_SECS)]
    interval_secs: u64,

    /// Telemetry log file
    #[arg(long, env = "ROVERTEL_LOG_FILE", default_value = "telemetry.log")]
    log_file: PathBuf,

    /// Rotate the telemetry log above this many bytes
    #[arg(long, default_value_t = DEFAULT_LOG_MAX_BYTES)]
    log_max_bytes: u64,
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

    let args = Args::parse();

    let config = ServerConfig::new(SocketAddr::new(args.host, args.port))
        .with_max_clients(args.max_clients)
        .with_broadcast_interval(Duration::from_secs(args.interval_secs))
        .with_log_path(args.log_file)
        .with_log_max_bytes(args.log_max_bytes);

    // Environment first, then .env, then the built-in default.
    let secret = AdminSecret::resolve();

    let server = TelemetryServer::new(config, secret).await?;
    server.start().await?;
    tracing::info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupt received");

    server.shutdown().await?;
    Ok(())
}
