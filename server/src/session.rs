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

//! Per-connection session handling
//!
//! Each accepted connection runs one session task: a framed line reader,
//! a command dispatcher and a shared write handle. The dispatcher is a
//! plain state machine over the privilege flag and two rate gates, kept
//! free of I/O so its ordering rules are directly testable.

use crate::error::{Result, ServerError};
use crate::registry::SessionToken;
use crate::server::ServerState;
use crate::telemetry::unix_now_secs;
use futures_util::StreamExt;
use rovertel_protocol::{
    Command, DataReport, DataScope, ErrorReply, MAX_LINE_BYTES, ProtocolError, Response, Role,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;

/// Cloneable write handle for one connection
///
/// The session task and the broadcast loop share the same socket; the
/// inner mutex serialises their lines so output never interleaves
/// mid-line. Writes carry a timeout: a peer that cannot absorb a line
/// within it is treated as gone.
#[derive(Debug, Clone)]
pub struct SessionWriter {
    half: Arc<Mutex<OwnedWriteHalf>>,
    write_timeout: Duration,
}

impl SessionWriter {
    /// Wrap the write half of an accepted connection
    pub fn new(half: OwnedWriteHalf, write_timeout: Duration) -> Self {
        Self {
            half: Arc::new(Mutex::new(half)),
            write_timeout,
        }
    }

    /// Send one line, appending the terminating newline
    pub async fn send_line(&self, line: &str) -> Result<()> {
        let payload = format!("{line}\n");
        let mut half = self.half.lock().await;
        tokio::time::timeout(self.write_timeout, half.write_all(payload.as_bytes()))
            .await
            .map_err(|_| ServerError::Timeout)??;
        Ok(())
    }
}

/// Whole-second rate gate
///
/// A call passes when nothing has passed yet, or when the last passing
/// call is at least one whole unix second old. Rejected calls do not
/// refresh the stamp.
#[derive(Debug, Default, Clone, Copy)]
struct RateGate {
    last: Option<u64>,
}

impl RateGate {
    fn try_pass(&mut self, now_secs: u64) -> bool {
        if let Some(last) = self.last {
            if now_secs.saturating_sub(last) < 1 {
                return false;
            }
        }
        self.last = Some(now_secs);
        true
    }
}

/// What the read loop does after one command
#[derive(Debug, PartialEq)]
enum Outcome {
    Reply(Response),
    Logout,
}

/// Protocol state for one connection
///
/// Owns the privilege flag and the per-command rate gates. The socket
/// halves live elsewhere (the read loop and the shared writer), so the
/// dispatch logic never touches the network.
pub(crate) struct Session {
    token: SessionToken,
    peer: SocketAddr,
    state: Arc<ServerState>,
    is_admin: bool,
    ping_gate: RateGate,
    data_gate: RateGate,
}

impl Session {
    pub(crate) fn new(token: SessionToken, peer: SocketAddr, state: Arc<ServerState>) -> Self {
        Self {
            token,
            peer,
            state,
            is_admin: false,
            ping_gate: RateGate::default(),
            data_gate: RateGate::default(),
        }
    }

    /// Execute one inbound line and decide the reply
    fn handle_line(&mut self, line: &str) -> Outcome {
        match Command::parse(line) {
            Ok(command) => {
                self.state.metrics.command_processed();
                self.execute(command)
            }
            Err(ProtocolError::UnknownScope(_)) => {
                self.state.metrics.command_processed();
                // An unknown variable still spends the rate slot, so a
                // client cannot probe the vocabulary faster than it can
                // read data.
                let reply = if self.data_gate.try_pass(unix_now_secs()) {
                    Response::Error(ErrorReply::UnknownVariable)
                } else {
                    Response::Error(ErrorReply::RateLimited)
                };
                Outcome::Reply(reply)
            }
            Err(ProtocolError::InvalidCommand) => {
                self.state.metrics.protocol_error();
                Outcome::Reply(Response::Error(ErrorReply::InvalidCommand))
            }
        }
    }

    fn execute(&mut self, command: Command) -> Outcome {
        match command {
            Command::Login { role, password } => self.login(role, password.as_deref()),
            Command::Move { direction } => self.do_move(direction),
            Command::ListUsers => self.list_users(),
            Command::GetData { scope } => self.get_data(scope),
            Command::Ping => self.ping(),
            Command::Logout => Outcome::Logout,
        }
    }

    fn login(&mut self, role: Option<Role>, password: Option<&str>) -> Outcome {
        match role {
            Some(Role::Admin)
                if password.is_some_and(|password| self.state.secret.verify(password)) =>
            {
                self.is_admin = true;
                tracing::info!("{} from {} authenticated as admin", self.token, self.peer);
                Outcome::Reply(Response::LoginSuccess(Role::Admin))
            }
            // A user login succeeds unconditionally and never revokes
            // privileges gained earlier in the session.
            Some(Role::User) => Outcome::Reply(Response::LoginSuccess(Role::User)),
            _ => Outcome::Reply(Response::LoginFail),
        }
    }

    fn do_move(&mut self, direction: Option<String>) -> Outcome {
        // Privilege before argument validation: an unauthenticated MOVE
        // reads as a permission problem even without a direction.
        if !self.is_admin {
            return Outcome::Reply(Response::Error(ErrorReply::NotAuthorized));
        }
        let Some(direction) = direction else {
            return Outcome::Reply(Response::Error(ErrorReply::InvalidCommand));
        };
        if self.state.random.roll(5) == 0 {
            Outcome::Reply(Response::MoveBlocked(direction))
        } else {
            Outcome::Reply(Response::MoveSuccess(direction))
        }
    }

    fn list_users(&self) -> Outcome {
        if !self.is_admin {
            return Outcome::Reply(Response::Error(ErrorReply::NotAuthorized));
        }
        Outcome::Reply(Response::UserList(self.state.registry.addresses()))
    }

    fn get_data(&mut self, scope: DataScope) -> Outcome {
        if !self.data_gate.try_pass(unix_now_secs()) {
            return Outcome::Reply(Response::Error(ErrorReply::RateLimited));
        }
        let reading = self.state.reading.get();
        let report = match scope {
            DataScope::All => DataReport::full(reading.ts, reading.temp, reading.hum),
            DataScope::Temperature => DataReport::temperature(reading.ts, reading.temp),
            DataScope::Humidity => DataReport::humidity(reading.ts, reading.hum),
        };
        Outcome::Reply(Response::Data(report))
    }

    fn ping(&mut self) -> Outcome {
        if self.ping_gate.try_pass(unix_now_secs()) {
            Outcome::Reply(Response::Pong)
        } else {
            Outcome::Reply(Response::Error(ErrorReply::RateLimited))
        }
    }
}

/// Drive one connection until it logs out, disconnects, fails, or the
/// server shuts down
///
/// Every exit path releases the registry slot and records the session
/// duration, so a crashed peer can never leak capacity.
pub(crate) async fn run_session(
    mut session: Session,
    read_half: OwnedReadHalf,
    writer: SessionWriter,
    shutdown: CancellationToken,
) {
    let token = session.token;
    let peer = session.peer;
    let state = session.state.clone();
    let started = Instant::now();

    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE_BYTES));

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = lines.next() => next,
        };

        match next {
            None => {
                tracing::debug!("{} from {} disconnected", token, peer);
                break;
            }
            Some(Ok(line)) => match session.handle_line(&line) {
                Outcome::Reply(response) => {
                    if let Err(err) = writer.send_line(&response.to_string()).await {
                        tracing::debug!("{} write failed: {}", token, err);
                        break;
                    }
                }
                Outcome::Logout => {
                    tracing::debug!("{} logged out", token);
                    break;
                }
            },
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                // The codec drops the rest of the oversized line; the
                // session itself stays usable.
                state.metrics.protocol_error();
                tracing::debug!("{} sent an oversized line", token);
                let reply = Response::Error(ErrorReply::InvalidCommand);
                if writer.send_line(&reply.to_string()).await.is_err() {
                    break;
                }
            }
            Some(Err(LinesCodecError::Io(err))) => {
                tracing::debug!("{} read failed: {}", token, err);
                break;
            }
        }
    }

    state.registry.unregister(token);
    state.metrics.connection_closed(started.elapsed());
    tracing::info!("Connection {} from {} closed", token, peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::random::ScriptedRandom;
    use crate::secret::AdminSecret;
    use crate::telemetry::TelemetryReading;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    fn test_state(script: impl IntoIterator<Item = u32>) -> Arc<ServerState> {
        Arc::new(ServerState::new(
            &ServerConfig::default().with_max_clients(4),
            AdminSecret::new("orbital"),
            Arc::new(ScriptedRandom::new(script)),
        ))
    }

    fn test_session(state: &Arc<ServerState>) -> Session {
        Session::new(SessionToken::new(99), "127.0.0.1:50000".parse().unwrap(), state.clone())
    }

    fn reply(outcome: Outcome) -> Response {
        match outcome {
            Outcome::Reply(response) => response,
            Outcome::Logout => panic!("unexpected logout"),
        }
    }

    #[test]
    fn rate_gate_allows_one_call_per_second() {
        let mut gate = RateGate::default();
        assert!(gate.try_pass(1000));
        assert!(!gate.try_pass(1000));
        assert!(gate.try_pass(1001));
        assert!(!gate.try_pass(1001));
        assert!(gate.try_pass(1003));
    }

    #[test]
    fn rate_gate_rejection_keeps_the_old_stamp() {
        let mut gate = RateGate::default();
        assert!(gate.try_pass(1000));
        assert!(!gate.try_pass(1000));
        assert_eq!(gate.last, Some(1000));
        // The stamp did not move, so the next second still passes.
        assert!(gate.try_pass(1001));
    }

    #[test]
    fn rate_gate_rejects_when_the_clock_runs_backwards() {
        let mut gate = RateGate::default();
        assert!(gate.try_pass(1000));
        assert!(!gate.try_pass(999));
    }

    #[test]
    fn admin_login_checks_the_secret() {
        let state = test_state([]);
        let mut session = test_session(&state);

        assert_eq!(
            reply(session.handle_line("LOGIN ADMIN wrong")),
            Response::LoginFail
        );
        assert!(!session.is_admin);

        assert_eq!(
            reply(session.handle_line("LOGIN ADMIN orbital")),
            Response::LoginSuccess(Role::Admin)
        );
        assert!(session.is_admin);

        // A later failed login does not revoke the privilege.
        assert_eq!(
            reply(session.handle_line("LOGIN ADMIN wrong")),
            Response::LoginFail
        );
        assert!(session.is_admin);
    }

    #[test]
    fn admin_login_without_a_password_fails() {
        let state = test_state([]);
        let mut session = test_session(&state);
        assert_eq!(reply(session.handle_line("LOGIN ADMIN")), Response::LoginFail);
    }

    #[test]
    fn user_login_needs_no_password_and_keeps_admin() {
        let state = test_state([]);
        let mut session = test_session(&state);

        assert_eq!(
            reply(session.handle_line("LOGIN USER")),
            Response::LoginSuccess(Role::User)
        );
        assert!(!session.is_admin);

        reply(session.handle_line("LOGIN ADMIN orbital"));
        assert_eq!(
            reply(session.handle_line("LOGIN USER whatever")),
            Response::LoginSuccess(Role::User)
        );
        assert!(session.is_admin);
    }

    #[test]
    fn unknown_roles_fail_login() {
        let state = test_state([]);
        let mut session = test_session(&state);
        assert_eq!(
            reply(session.handle_line("LOGIN root orbital")),
            Response::LoginFail
        );
        assert_eq!(reply(session.handle_line("LOGIN")), Response::LoginFail);
    }

    #[test]
    fn move_checks_privilege_before_the_argument() {
        let state = test_state([]);
        let mut session = test_session(&state);

        // Even without a direction, the non-admin answer is the
        // permission error.
        assert_eq!(
            reply(session.handle_line("MOVE")),
            Response::Error(ErrorReply::NotAuthorized)
        );
        assert_eq!(
            reply(session.handle_line("MOVE up")),
            Response::Error(ErrorReply::NotAuthorized)
        );

        reply(session.handle_line("LOGIN ADMIN orbital"));
        assert_eq!(
            reply(session.handle_line("MOVE")),
            Response::Error(ErrorReply::InvalidCommand)
        );
    }

    #[test]
    fn move_rolls_for_obstacles() {
        let state = test_state([0, 3]);
        let mut session = test_session(&state);
        reply(session.handle_line("LOGIN ADMIN orbital"));

        assert_eq!(
            reply(session.handle_line("MOVE north")),
            Response::MoveBlocked("north".to_owned())
        );
        assert_eq!(
            reply(session.handle_line("MOVE north")),
            Response::MoveSuccess("north".to_owned())
        );
    }

    #[test]
    fn ping_and_get_data_gates_are_independent() {
        let state = test_state([]);
        let mut session = test_session(&state);

        assert_eq!(reply(session.handle_line("PING")), Response::Pong);
        // The data gate has its own stamp, so this still passes.
        assert_eq!(
            reply(session.handle_line("GET_DATA")),
            Response::Data(DataReport::full(0, 0.0, 0.0))
        );
    }

    #[test]
    fn stamped_gates_reject_until_the_next_second() {
        let state = test_state([]);
        let mut session = test_session(&state);
        let future = unix_now_secs() + 60;
        session.ping_gate.last = Some(future);
        session.data_gate.last = Some(future);

        assert_eq!(
            reply(session.handle_line("PING")),
            Response::Error(ErrorReply::RateLimited)
        );
        assert_eq!(
            reply(session.handle_line("GET_DATA ALL")),
            Response::Error(ErrorReply::RateLimited)
        );
        // Rejections never refresh the stamps.
        assert_eq!(session.ping_gate.last, Some(future));
        assert_eq!(session.data_gate.last, Some(future));
    }

    #[test]
    fn get_data_reports_the_published_reading() {
        let state = test_state([]);
        state.reading.publish(TelemetryReading {
            ts: 77,
            temp: 21.5,
            hum: 40.7,
        });

        let mut all = test_session(&state);
        assert_eq!(
            reply(all.handle_line("GET_DATA")),
            Response::Data(DataReport::full(77, 21.5, 40.7))
        );

        let mut temp = test_session(&state);
        assert_eq!(
            reply(temp.handle_line("GET_DATA TEMP")),
            Response::Data(DataReport::temperature(77, 21.5))
        );

        let mut hum = test_session(&state);
        assert_eq!(
            reply(hum.handle_line("GET_DATA HUM")),
            Response::Data(DataReport::humidity(77, 40.7))
        );
    }

    #[test]
    fn unknown_variable_spends_the_rate_slot() {
        let state = test_state([]);
        let mut session = test_session(&state);

        assert_eq!(
            reply(session.handle_line("GET_DATA PRESSURE")),
            Response::Error(ErrorReply::UnknownVariable)
        );
        assert!(session.data_gate.last.is_some());

        // While the gate is closed the unknown variable reads as a rate
        // problem, and the stamp stays put.
        let future = unix_now_secs() + 60;
        session.data_gate.last = Some(future);
        assert_eq!(
            reply(session.handle_line("GET_DATA PRESSURE")),
            Response::Error(ErrorReply::RateLimited)
        );
        assert_eq!(session.data_gate.last, Some(future));
    }

    #[test]
    fn list_users_requires_admin_and_lists_peers() {
        let state = test_state([]);
        let mut session = test_session(&state);

        assert_eq!(
            reply(session.handle_line("LIST_USERS")),
            Response::Error(ErrorReply::NotAuthorized)
        );

        reply(session.handle_line("LOGIN ADMIN orbital"));
        assert_eq!(
            reply(session.handle_line("LIST_USERS")),
            Response::UserList(Vec::new())
        );
    }

    #[test]
    fn invalid_lines_are_counted_as_protocol_errors() {
        let state = test_state([]);
        let mut session = test_session(&state);

        assert_eq!(
            reply(session.handle_line("SELF_DESTRUCT")),
            Response::Error(ErrorReply::InvalidCommand)
        );
        assert_eq!(
            reply(session.handle_line("")),
            Response::Error(ErrorReply::InvalidCommand)
        );
        assert_eq!(state.metrics.snapshot().protocol_errors, 2);
    }

    #[test]
    fn logout_ends_the_session_silently() {
        let state = test_state([]);
        let mut session = test_session(&state);
        assert_eq!(session.handle_line("LOGOUT"), Outcome::Logout);
    }

    #[tokio::test]
    async fn run_session_replies_and_releases_the_slot() {
        let state = test_state([]);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, peer) = listener.accept().await.unwrap();
        let (read_half, write_half) = server_stream.into_split();
        let writer = SessionWriter::new(write_half, Duration::from_secs(1));

        let token = state.registry.register(peer, writer.clone()).unwrap();
        state.metrics.connection_opened();
        let session = Session::new(token, peer, state.clone());
        let handle = tokio::spawn(run_session(
            session,
            read_half,
            writer,
            CancellationToken::new(),
        ));

        client.write_all(b"PING\n").await.unwrap();
        let mut received = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            client.read_exact(&mut byte).await.unwrap();
            received.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        assert_eq!(received, b"PONG\n");
        assert_eq!(state.registry.len(), 1);

        client.write_all(b"LOGOUT\n").await.unwrap();
        handle.await.unwrap();
        assert!(state.registry.is_empty());
        assert_eq!(state.metrics.snapshot().active_connections, 0);
    }

    #[tokio::test]
    async fn run_session_stops_on_shutdown() {
        let state = test_state([]);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, peer) = listener.accept().await.unwrap();
        let (read_half, write_half) = server_stream.into_split();
        let writer = SessionWriter::new(write_half, Duration::from_secs(1));

        let token = state.registry.register(peer, writer.clone()).unwrap();
        state.metrics.connection_opened();
        let session = Session::new(token, peer, state.clone());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_session(session, read_half, writer, shutdown.clone()));

        shutdown.cancel();
        handle.await.unwrap();
        assert!(state.registry.is_empty());
    }
}
