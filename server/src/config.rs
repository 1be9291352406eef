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

//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of registry slots.
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Default telemetry broadcast period in seconds.
pub const DEFAULT_BROADCAST_SECS: u64 = 15;

/// Default telemetry log size limit before rotation.
pub const DEFAULT_LOG_MAX_BYTES: u64 = 1024 * 1024;

/// Server configuration
///
/// This structure contains all configuration options for the telemetry
/// server. Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use rovertel_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_max_clients(4)
///     .with_broadcast_interval(Duration::from_millis(200))
///     .with_log_path("/tmp/telemetry.log");
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Number of registry slots
    ///
    /// Connections beyond this count are answered with
    /// `ERROR Server at capacity` and closed without a session.
    pub max_clients: usize,

    /// Period of the telemetry broadcast loop
    pub broadcast_interval: Duration,

    /// Timeout for write operations
    ///
    /// A peer that cannot absorb a line within this duration is treated
    /// as gone; the write fails and the session is torn down.
    pub write_timeout: Duration,

    /// Timeout for graceful shutdown
    ///
    /// `shutdown()` waits this long for sessions to unwind before
    /// giving up on the drain.
    pub shutdown_timeout: Duration,

    /// Path of the telemetry log file
    pub log_path: PathBuf,

    /// Size in bytes past which the telemetry log is rotated
    pub log_max_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7007".parse().unwrap(),
            max_clients: DEFAULT_MAX_CLIENTS,
            broadcast_interval: Duration::from_secs(DEFAULT_BROADCAST_SECS),
            write_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
            log_path: PathBuf::from("telemetry.log"),
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Set the number of registry slots
    pub fn with_max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the telemetry broadcast period
    pub fn with_broadcast_interval(mut self, interval: Duration) -> Self {
        self.broadcast_interval = interval;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the telemetry log path
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Set the telemetry log rotation threshold
    pub fn with_log_max_bytes(mut self, max_bytes: u64) -> Self {
        self.log_max_bytes = max_bytes;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_clients == 0 {
            return Err("max_clients must be greater than 0".to_string());
        }

        if self.broadcast_interval.is_zero() {
            return Err("broadcast_interval must be greater than 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        if self.log_max_bytes == 0 {
            return Err("log_max_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_clients, 10);
        assert_eq!(config.broadcast_interval, Duration::from_secs(15));
        assert_eq!(config.log_max_bytes, 1024 * 1024);
        assert_eq!(config.log_path, PathBuf::from("telemetry.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::default()
            .with_max_clients(4)
            .with_broadcast_interval(Duration::from_millis(200))
            .with_log_path("/tmp/rover.log")
            .with_log_max_bytes(4096);

        assert_eq!(config.max_clients, 4);
        assert_eq!(config.broadcast_interval, Duration::from_millis(200));
        assert_eq!(config.log_path, PathBuf::from("/tmp/rover.log"));
        assert_eq!(config.log_max_bytes, 4096);
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();

        // Valid config
        assert!(config.validate().is_ok());

        // Invalid: zero slots
        config.max_clients = 0;
        assert!(config.validate().is_err());

        // Invalid: zero broadcast period
        config.max_clients = 10;
        config.broadcast_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        // Invalid: zero rotation threshold
        config.broadcast_interval = Duration::from_secs(15);
        config.log_max_bytes = 0;
        assert!(config.validate().is_err());
    }
}
