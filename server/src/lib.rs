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

//! Multi-Client Telemetry Server
//!
//! This crate provides an async, line-oriented TCP server for a mobile
//! telemetry robot. Clients connect over plain TCP, authenticate, issue
//! commands, and receive a sensor reading pushed to every connection on
//! a fixed interval:
//!
//! - Slot-based client registry with capacity rejection
//! - Per-session privileges and whole-second rate limiting
//! - Periodic sensor broadcast with file logging and size-based rotation
//! - Lock-free metrics and monitoring
//! - Graceful shutdown over a cancellation token
//!
//! # Architecture
//!
//! The server follows a layered architecture:
//!
//! ```text
//! TelemetryServer
//!     ↓
//! ClientRegistry ←─ Broadcaster
//!     ↓
//! Session → SessionWriter
//! ```
//!
//! The accept loop registers each connection and spawns one session
//! task for it. The broadcaster runs beside the sessions and fans the
//! latest reading out through the same per-connection writers.
//!
//! # Example
//!
//! ```no_run
//! use rovertel_server::{AdminSecret, ServerConfig, TelemetryServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:7007".parse()?);
//!     let secret = AdminSecret::resolve();
//!
//!     let server = TelemetryServer::new(config, secret).await?;
//!     server.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod logfile;
mod metrics;
mod random;
mod registry;
mod secret;
mod server;
mod session;
mod telemetry;

pub use config::{
    DEFAULT_BROADCAST_SECS, DEFAULT_LOG_MAX_BYTES, DEFAULT_MAX_CLIENTS, ServerConfig,
};
pub use error::{Result, ServerError};
pub use logfile::TelemetryLog;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use random::{RandomSource, ScriptedRandom, ThreadRandom};
pub use registry::{ClientRegistry, RegistryEntry, SessionToken};
pub use secret::{ADMIN_PASSWORD_VAR, AdminSecret};
pub use server::TelemetryServer;
pub use session::SessionWriter;
pub use telemetry::{SharedReading, TelemetryReading};
