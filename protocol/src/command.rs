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

//! Inbound command vocabulary and line parsing.

use crate::result::{ProtocolError, ProtocolResult};
use std::fmt;

/// Privilege level a `LOGIN` command can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full access: movement, user listing, telemetry.
    Admin,
    /// Read-only access: telemetry and liveness commands.
    User,
}

impl Role {
    /// Role keywords are case-sensitive; anything else is not a role.
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("ADMIN"),
            Self::User => f.write_str("USER"),
        }
    }
}

/// Telemetry variable selector carried by `GET_DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataScope {
    /// Both variables; also the default when no selector is given.
    All,
    /// Temperature only (`TEMP`).
    Temperature,
    /// Humidity only (`HUM`).
    Humidity,
}

impl DataScope {
    fn from_token(token: Option<&str>) -> ProtocolResult<Self> {
        match token {
            None | Some("ALL") => Ok(Self::All),
            Some("TEMP") => Ok(Self::Temperature),
            Some("HUM") => Ok(Self::Humidity),
            Some(other) => Err(ProtocolError::UnknownScope(other.to_owned())),
        }
    }
}

/// One parsed command line.
///
/// Tokens beyond the ones a command consumes are ignored, matching the
/// historical server behaviour; `MOVE up now` moves up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LOGIN <role> [password]`.
    ///
    /// An unrecognised or missing role parses as `None`: the session
    /// answers such a login with `LOGIN_FAIL` rather than treating the
    /// line as malformed.
    Login {
        /// Requested privilege level, if the role token was recognised.
        role: Option<Role>,
        /// Second argument, checked against the admin secret for
        /// [`Role::Admin`] and ignored for [`Role::User`].
        password: Option<String>,
    },
    /// `MOVE [direction]`.
    ///
    /// The direction stays optional at parse time because the session
    /// checks the caller's privilege before complaining about a missing
    /// argument.
    Move {
        /// Free-form direction token, echoed back in the reply.
        direction: Option<String>,
    },
    /// `LIST_USERS`: enumerate registered peers (admin only).
    ListUsers,
    /// `GET_DATA [ALL|TEMP|HUM]`: read the latest telemetry sample.
    GetData {
        /// Which variables to report.
        scope: DataScope,
    },
    /// `PING`: liveness probe.
    Ping,
    /// `LOGOUT`: end the session; the server sends no reply.
    Logout,
}

impl Command {
    /// Parses one complete line (without its terminating newline).
    ///
    /// Splitting is on ASCII whitespace, so a trailing `\r` from a CRLF
    /// peer is tolerated. An empty line or an unknown keyword yields
    /// [`ProtocolError::InvalidCommand`]; a `GET_DATA` with a variable
    /// outside the vocabulary yields [`ProtocolError::UnknownScope`] so
    /// the caller can still charge the rate gate for the attempt.
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().ok_or(ProtocolError::InvalidCommand)?;
        match keyword {
            "LOGIN" => {
                let role = tokens.next().and_then(Role::from_token);
                let password = tokens.next().map(str::to_owned);
                Ok(Self::Login { role, password })
            }
            "MOVE" => Ok(Self::Move {
                direction: tokens.next().map(str::to_owned),
            }),
            "LIST_USERS" => Ok(Self::ListUsers),
            "GET_DATA" => Ok(Self::GetData {
                scope: DataScope::from_token(tokens.next())?,
            }),
            "PING" => Ok(Self::Ping),
            "LOGOUT" => Ok(Self::Logout),
            _ => Err(ProtocolError::InvalidCommand),
        }
    }
}
