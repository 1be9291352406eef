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

//! Outbound wire lines.
//!
//! `Display` on these types produces the exact bytes that go on the wire,
//! minus the terminating newline the transport appends.

use crate::MAX_LINE_BYTES;
use crate::command::Role;
use std::fmt;
use std::net::SocketAddr;

/// One telemetry sample, scoped to the variables a reply should carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataReport {
    ts: i64,
    temp: Option<f32>,
    hum: Option<f32>,
}

impl DataReport {
    /// Report carrying both variables, as broadcast and as `GET_DATA ALL`.
    #[must_use]
    pub fn full(ts: i64, temp: f32, hum: f32) -> Self {
        Self {
            ts,
            temp: Some(temp),
            hum: Some(hum),
        }
    }

    /// Temperature-only report (`GET_DATA TEMP`).
    #[must_use]
    pub fn temperature(ts: i64, temp: f32) -> Self {
        Self {
            ts,
            temp: Some(temp),
            hum: None,
        }
    }

    /// Humidity-only report (`GET_DATA HUM`).
    #[must_use]
    pub fn humidity(ts: i64, hum: f32) -> Self {
        Self {
            ts,
            temp: None,
            hum: Some(hum),
        }
    }
}

impl fmt::Display for DataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DATA {}", self.ts)?;
        match (self.temp, self.hum) {
            (Some(t), Some(h)) => write!(f, " TEMP={t:.1};HUM={h:.1}"),
            (Some(t), None) => write!(f, " TEMP={t:.1}"),
            (None, Some(h)) => write!(f, " HUM={h:.1}"),
            (None, None) => Ok(()),
        }
    }
}

/// Reason carried by an `ERROR <reason>` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReply {
    /// Caller lacks admin privileges for the command.
    NotAuthorized,
    /// Empty line, unknown keyword, or a missing required argument.
    InvalidCommand,
    /// The per-command rate gate rejected the call.
    RateLimited,
    /// `GET_DATA` named a variable outside the telemetry vocabulary.
    UnknownVariable,
    /// The registry has no free slot for a new connection.
    ServerFull,
}

impl fmt::Display for ErrorReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reason texts are part of the wire contract, including the
        // Spanish permission message the fleet tooling matches on.
        match self {
            Self::NotAuthorized => f.write_str("No tienes permisos"),
            Self::InvalidCommand => f.write_str("Invalid command"),
            Self::RateLimited => f.write_str("Rate limit"),
            Self::UnknownVariable => f.write_str("Unknown var"),
            Self::ServerFull => f.write_str("Server at capacity"),
        }
    }
}

/// One outbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `LOGIN_SUCCESS <role>`.
    LoginSuccess(Role),
    /// `LOGIN_FAIL`: bad password, or an unrecognised role.
    LoginFail,
    /// `MOVE_SUCCESS <direction>`.
    MoveSuccess(String),
    /// `MOVE_FAIL <direction> OBSTACLE`.
    MoveBlocked(String),
    /// `USER_LIST ip:port;ip:port;...` over every registered peer.
    UserList(Vec<SocketAddr>),
    /// `DATA <ts> ...` telemetry report.
    Data(DataReport),
    /// `PONG`.
    Pong,
    /// `ERROR <reason>`.
    Error(ErrorReply),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginSuccess(role) => write!(f, "LOGIN_SUCCESS {role}"),
            Self::LoginFail => f.write_str("LOGIN_FAIL"),
            Self::MoveSuccess(direction) => write!(f, "MOVE_SUCCESS {direction}"),
            Self::MoveBlocked(direction) => write!(f, "MOVE_FAIL {direction} OBSTACLE"),
            Self::UserList(peers) => render_user_list(f, peers),
            Self::Data(report) => report.fmt(f),
            Self::Pong => f.write_str("PONG"),
            Self::Error(reason) => write!(f, "ERROR {reason}"),
        }
    }
}

/// Renders `USER_LIST` within the line limit: whole `ip:port;` entries
/// only, an entry that would overflow is skipped rather than split.
fn render_user_list(f: &mut fmt::Formatter<'_>, peers: &[SocketAddr]) -> fmt::Result {
    const PREFIX: &str = "USER_LIST ";
    let budget = MAX_LINE_BYTES - 1;
    f.write_str(PREFIX)?;
    let mut used = PREFIX.len();
    for peer in peers {
        let entry = format!("{}:{};", peer.ip(), peer.port());
        if used + entry.len() > budget {
            continue;
        }
        f.write_str(&entry)?;
        used += entry.len();
    }
    Ok(())
}
