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

//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while interpreting one inbound line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Empty line or unrecognised command keyword.
    #[error("invalid command")]
    InvalidCommand,

    /// `GET_DATA` named a variable outside the telemetry vocabulary.
    ///
    /// Kept separate from [`ProtocolError::InvalidCommand`] because the
    /// server charges the attempt against the caller's rate allowance
    /// before answering `ERROR Unknown var`.
    #[error("unknown telemetry variable `{0}`")]
    UnknownScope(String),
}

#[cfg(test)]
mod tests {
    use super::ProtocolError;

    #[test]
    fn errors_describe_themselves() {
        assert_eq!(ProtocolError::InvalidCommand.to_string(), "invalid command");
        assert_eq!(
            ProtocolError::UnknownScope("PRESSURE".to_owned()).to_string(),
            "unknown telemetry variable `PRESSURE`"
        );
    }
}
