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

//! Admin secret resolution

use std::env;
use std::fmt;
use std::path::Path;

/// Environment variable and `.env` key holding the admin password
pub const ADMIN_PASSWORD_VAR: &str = "ADMIN_PASSWORD";

/// Password accepted when nothing else is configured
const FALLBACK_PASSWORD: &str = "admin";

/// The shared admin secret, resolved once at startup
///
/// `LOGIN ADMIN <password>` succeeds iff the password matches this
/// value. The secret never changes while the server runs.
#[derive(Clone)]
pub struct AdminSecret(String);

impl AdminSecret {
    /// Wrap an explicit secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Resolve the secret for this process
    ///
    /// The `ADMIN_PASSWORD` environment variable wins, then an
    /// `ADMIN_PASSWORD` entry in the working directory's `.env` file,
    /// then the built-in fallback. Empty values count as unset.
    pub fn resolve() -> Self {
        Self::resolve_from(env::var(ADMIN_PASSWORD_VAR).ok(), Path::new(".env"))
    }

    /// Resolution with explicit inputs, for callers that supply their
    /// own environment value or `.env` location
    pub fn resolve_from(env_value: Option<String>, env_file: &Path) -> Self {
        if let Some(value) = env_value.filter(|value| !value.is_empty()) {
            tracing::debug!("Admin secret loaded from the environment");
            return Self(value);
        }
        if let Some(value) = read_env_file(env_file) {
            tracing::debug!("Admin secret loaded from {}", env_file.display());
            return Self(value);
        }
        tracing::warn!("Admin secret not configured, using the built-in fallback");
        Self(FALLBACK_PASSWORD.to_string())
    }

    /// Check a login attempt against the secret
    pub fn verify(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

/// First non-empty `ADMIN_PASSWORD` entry in the file, if any.
///
/// Reads the file directly instead of loading it into the process
/// environment, so a missing or malformed file never leaks state.
fn read_env_file(path: &Path) -> Option<String> {
    let entries = dotenvy::from_path_iter(path).ok()?;
    for entry in entries {
        let Ok((key, value)) = entry else { continue };
        if key == ADMIN_PASSWORD_VAR && !value.is_empty() {
            return Some(value);
        }
    }
    None
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminSecret(***)")
    }
}
