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

//! Telemetry sampling and broadcast
//!
//! One background task samples the onboard sensors on a fixed interval,
//! publishes the reading for `GET_DATA`, appends it to the telemetry
//! log, and fans the formatted line out to every connected client.

use crate::logfile::TelemetryLog;
use crate::server::ServerState;
use futures_util::future::join_all;
use rovertel_protocol::DataReport;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// One sampled sensor reading
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TelemetryReading {
    /// Unix timestamp of the sample, in whole seconds
    pub ts: i64,
    /// Temperature in degrees Celsius
    pub temp: f32,
    /// Relative humidity in percent
    pub hum: f32,
}

/// Latest reading, shared between the broadcaster and the sessions
///
/// Readers take a copy under a read lock, so a `GET_DATA` issued in the
/// middle of a broadcast can never observe a half-updated sample.
#[derive(Debug, Default)]
pub struct SharedReading {
    inner: RwLock<TelemetryReading>,
}

impl SharedReading {
    /// Copy out the latest reading
    pub fn get(&self) -> TelemetryReading {
        *self.inner.read().expect("reading lock poisoned")
    }

    /// Replace the latest reading
    pub fn publish(&self, reading: TelemetryReading) {
        *self.inner.write().expect("reading lock poisoned") = reading;
    }
}

/// Seconds since the unix epoch, zero if the clock sits before it
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Periodic sampler and fan-out loop
///
/// The loop sleeps first, so the initial reading only exists after one
/// full interval; until then `GET_DATA` reports the zero reading.
pub(crate) struct Broadcaster {
    state: Arc<ServerState>,
    log: TelemetryLog,
    interval: Duration,
}

impl Broadcaster {
    pub(crate) fn new(state: Arc<ServerState>, log: TelemetryLog, interval: Duration) -> Self {
        Self {
            state,
            log,
            interval,
        }
    }

    /// Sleep-sample-broadcast until the token is cancelled
    pub(crate) async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => self.run_cycle().await,
            }
        }
        tracing::debug!("telemetry broadcaster stopped");
    }

    /// One complete cycle: sample, publish, log, fan out
    pub(crate) async fn run_cycle(&self) {
        let recipients = self.state.registry.snapshot();

        let reading = TelemetryReading {
            ts: unix_now_secs() as i64,
            temp: self.state.random.roll(300) as f32 / 10.0,
            hum: self.state.random.roll(1000) as f32 / 10.0,
        };
        let line = DataReport::full(reading.ts, reading.temp, reading.hum).to_string();

        // Publish before the fan-out so a client reacting to the
        // broadcast with GET_DATA sees the same sample.
        self.state.reading.publish(reading);

        if let Err(err) = self.log.append_line(&line).await {
            tracing::warn!("telemetry log append failed: {}", err);
        }
        if let Err(err) = self.log.rotate_if_needed().await {
            tracing::warn!("telemetry log rotation failed: {}", err);
        }

        let line_ref = line.as_str();
        let sends = recipients.iter().map(|entry| async move {
            (entry.token(), entry.writer().send_line(line_ref).await)
        });
        let mut failures = 0u64;
        for (token, result) in join_all(sends).await {
            if let Err(err) = result {
                failures += 1;
                tracing::debug!("broadcast to {} failed: {}", token, err);
            }
        }
        if failures > 0 {
            self.state.metrics.broadcast_failures(failures);
        }
        self.state.metrics.broadcast_cycle();
        tracing::debug!("broadcast reached {} clients", recipients.len() as u64 - failures);
    }
}
