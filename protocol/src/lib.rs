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

//! # Rovertel Wire Protocol
//!
//! This crate defines the line-oriented text protocol spoken between the
//! Rovertel telemetry server and its robot clients. Every exchange is a
//! single ASCII line terminated by `\n`; inbound lines are tokenised on
//! whitespace into a case-sensitive command keyword and its arguments.
//!
//! ## Overview
//!
//! The protocol covers five concerns:
//!
//! - **Authentication**: `LOGIN ADMIN <password>` / `LOGIN USER`, answered
//!   with `LOGIN_SUCCESS <role>` or `LOGIN_FAIL`.
//! - **Movement**: `MOVE <direction>`, admin-only, answered with
//!   `MOVE_SUCCESS <direction>` or `MOVE_FAIL <direction> OBSTACLE`.
//! - **Introspection**: `LIST_USERS`, admin-only, answered with a
//!   `USER_LIST ip:port;ip:port;...` line capped at the wire line limit.
//! - **Telemetry**: `GET_DATA [ALL|TEMP|HUM]`, answered with a
//!   `DATA <ts> TEMP=<t>;HUM=<h>` report (or the requested subset), plus
//!   the unsolicited broadcast of the same `DATA` line on a fixed period.
//! - **Liveness**: `PING`/`PONG` and `LOGOUT`.
//!
//! ## Core Components
//!
//! ### [`Command`]
//!
//! One parsed inbound line. [`Command::parse`] never sees I/O: framing is
//! the transport's job, this crate only interprets a complete line. The
//! parse deliberately preserves the server's historical quirks, e.g. a
//! `LOGIN` with an unrecognised role still parses (the answer is
//! `LOGIN_FAIL`, not a protocol error) and a `MOVE` without a direction
//! parses so that the permission check can run before argument validation.
//!
//! ### [`Response`]
//!
//! Every outbound line as a typed value; `Display` renders the exact wire
//! text without the trailing newline. [`DataReport`] carries a telemetry
//! sample and renders its floats with one decimal digit.
//!
//! ### [`ProtocolError`]
//!
//! What can go wrong while interpreting a line: an unknown or empty
//! command, or a `GET_DATA` variable outside the telemetry vocabulary.
//! The latter is distinct because the server charges it against the
//! caller's rate allowance before rejecting it.
//!
//! ## Usage Example
//!
//! ```rust
//! use rovertel_protocol::{Command, Response, Role};
//!
//! let command = Command::parse("LOGIN USER").unwrap();
//! assert_eq!(
//!     command,
//!     Command::Login { role: Some(Role::User), password: None }
//! );
//!
//! let reply = Response::LoginSuccess(Role::User);
//! assert_eq!(reply.to_string(), "LOGIN_SUCCESS USER");
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod command;
mod response;
mod result;

pub use self::command::{Command, DataScope, Role};
pub use self::response::{DataReport, ErrorReply, Response};
pub use self::result::{ProtocolError, ProtocolResult};

/// Maximum length of one wire line in bytes, newline included.
///
/// Inbound lines longer than this are rejected by the transport; outbound
/// `USER_LIST` lines drop whole entries rather than exceed it.
pub const MAX_LINE_BYTES: usize = 1024;

#[cfg(test)]
mod tests {
    use super::{Command, DataReport, ErrorReply, Response, Role};

    #[test]
    fn parse_and_render_smoke() {
        assert_eq!(Command::parse("PING").unwrap(), Command::Ping);
        assert_eq!(Command::parse("LOGOUT").unwrap(), Command::Logout);
        assert!(Command::parse("REBOOT").is_err());

        assert_eq!(Response::Pong.to_string(), "PONG");
        assert_eq!(Response::LoginFail.to_string(), "LOGIN_FAIL");
        assert_eq!(
            Response::LoginSuccess(Role::Admin).to_string(),
            "LOGIN_SUCCESS ADMIN"
        );
        assert_eq!(
            Response::Error(ErrorReply::NotAuthorized).to_string(),
            "ERROR No tienes permisos"
        );
        assert_eq!(
            Response::Data(DataReport::full(0, 0.0, 0.0)).to_string(),
            "DATA 0 TEMP=0.0;HUM=0.0"
        );
    }
}
