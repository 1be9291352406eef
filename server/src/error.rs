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

//! Error types for the telemetry server

use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Telemetry server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// I/O error from the underlying TCP stream or the telemetry log
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client registry has no free slot
    #[error("Registry full ({0} slots)")]
    RegistryFull(usize),

    /// `start` was already called on this server
    ///
    /// A server cannot be restarted after shutdown; create a new one.
    #[error("Server already started")]
    AlreadyStarted,

    /// Server is not running
    #[error("Server not running")]
    NotRunning,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServerError {
    /// Check if the error only affects a single connection
    ///
    /// Connection-scoped errors tear down one session; the server keeps
    /// accepting and broadcasting.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ServerError::Io(_) | ServerError::Timeout)
    }

    /// Check if the error is a capacity rejection
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, ServerError::RegistryFull(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_connection_error() {
        let io = ServerError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "peer went away",
        ));
        assert!(io.is_connection_error());
        assert!(ServerError::Timeout.is_connection_error());
        assert!(!ServerError::RegistryFull(10).is_connection_error());
        assert!(!ServerError::AlreadyStarted.is_connection_error());
    }

    #[test]
    fn test_error_is_capacity_error() {
        assert!(ServerError::RegistryFull(10).is_capacity_error());
        assert!(!ServerError::NotRunning.is_capacity_error());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ServerError::RegistryFull(10).to_string(),
            "Registry full (10 slots)"
        );
        assert_eq!(
            ServerError::InvalidConfig("max_clients must be non-zero".to_string()).to_string(),
            "Invalid configuration: max_clients must be non-zero"
        );
    }
}
