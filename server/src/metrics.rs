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

//! Lock-free metrics for the telemetry server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be accessed concurrently
/// without locks. Use the `snapshot()` method to get a consistent view
/// of all metrics at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    // Connection counts
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,

    // Command traffic
    commands_processed: AtomicU64,
    protocol_errors: AtomicU64,

    // Broadcast loop
    broadcast_cycles: AtomicU64,
    broadcast_failures: AtomicU64,

    // Timing (stored as nanoseconds)
    total_connection_duration_ns: AtomicU64,

    // Server start time
    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            commands_processed: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            broadcast_cycles: AtomicU64::new(0),
            broadcast_failures: AtomicU64::new(0),
            total_connection_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Connection tracking

    /// Record a new session entering the registry
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session leaving the registry
    pub fn connection_closed(&self, duration: Duration) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.total_connection_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record a connection turned away at capacity
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current number of active sessions
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get the total number of sessions since server start
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    // Command tracking

    /// Record one executed command line
    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a line the parser rejected
    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Broadcast tracking

    /// Record one completed telemetry cycle
    pub fn broadcast_cycle(&self) {
        self.broadcast_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record sessions a cycle failed to deliver to
    pub fn broadcast_failures(&self, count: u64) {
        self.broadcast_failures.fetch_add(count, Ordering::Relaxed);
    }

    // Snapshot

    /// Get a consistent snapshot of all metrics
    ///
    /// This creates a point-in-time view of all metrics. Note that the
    /// snapshot may not be perfectly consistent if metrics are being
    /// updated concurrently, but it will be close enough for monitoring
    /// purposes.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            broadcast_cycles: self.broadcast_cycles.load(Ordering::Relaxed),
            broadcast_failures: self.broadcast_failures.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_connection_duration: self.average_connection_duration(),
        }
    }

    fn average_connection_duration(&self) -> Duration {
        let total = self.total_connections.load(Ordering::Relaxed);
        if total == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_connection_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / total)
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total sessions since server start
    pub total_connections: u64,
    /// Current active sessions
    pub active_connections: u64,
    /// Connections turned away at capacity
    pub rejected_connections: u64,
    /// Command lines executed
    pub commands_processed: u64,
    /// Lines the parser rejected
    pub protocol_errors: u64,
    /// Completed telemetry cycles
    pub broadcast_cycles: u64,
    /// Failed per-session deliveries across all cycles
    pub broadcast_failures: u64,
    /// Server uptime
    pub uptime: Duration,
    /// Average session duration
    pub avg_connection_duration: Duration,
}

impl MetricsSnapshot {
    /// Calculate commands per second
    pub fn commands_per_sec(&self) -> f64 {
        if self.uptime.is_zero() {
            return 0.0;
        }
        self.commands_processed as f64 / self.uptime.as_secs_f64()
    }

    /// Calculate the share of deliveries that failed, per cycle average
    pub fn failures_per_cycle(&self) -> f64 {
        if self.broadcast_cycles == 0 {
            return 0.0;
        }
        self.broadcast_failures as f64 / self.broadcast_cycles as f64
    }
}
