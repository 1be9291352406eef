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

//! Telemetry log file with size-based rotation

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Append-only telemetry log
///
/// Every broadcast cycle appends one `DATA` line. Once the file grows
/// past the limit it is renamed to `<path>.1`, replacing any previous
/// backup. Callers treat every failure here as non-fatal: telemetry
/// keeps flowing even when the disk does not.
#[derive(Debug, Clone)]
pub struct TelemetryLog {
    path: PathBuf,
    max_bytes: u64,
}

impl TelemetryLog {
    /// Create a log writing to `path`, rotating past `max_bytes`
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
        }
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path the log is renamed to on rotation (`<path>.1`)
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".1");
        PathBuf::from(name)
    }

    /// Append one line, opening and closing the file per call
    ///
    /// Open-per-append keeps the file visible to outside tooling (tail,
    /// ingest scripts) and makes rotation a plain rename.
    pub async fn append_line(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Rename the log to its backup path once it outgrows the limit
    ///
    /// Returns whether a rotation happened. A log that does not exist
    /// yet simply does not rotate.
    pub async fn rotate_if_needed(&self) -> io::Result<bool> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if metadata.len() <= self.max_bytes {
            return Ok(false);
        }
        tokio::fs::rename(&self.path, self.backup_path()).await?;
        tracing::info!(
            "Rotated telemetry log {} ({} bytes)",
            self.path.display(),
            metadata.len()
        );
        Ok(true)
    }
}
