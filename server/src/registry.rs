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

//! Bounded registry of connected sessions
//!
//! A fixed number of slots under one mutex. Registration claims the
//! first free slot or fails, so the capacity check is atomic with the
//! insertion; there is no separate count to race against. The lock only
//! ever guards in-memory slot work: callers copy entries out and do
//! their socket I/O with the lock long released.

use crate::error::{Result, ServerError};
use crate::session::SessionWriter;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Opaque handle identifying one registered session
///
/// Tokens are monotonic and never reused, so a late unregister from a
/// dying session can never evict a slot's new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One occupied registry slot
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    token: SessionToken,
    peer: SocketAddr,
    writer: SessionWriter,
}

impl RegistryEntry {
    /// Token of the session occupying the slot
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Peer address of the session
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Write handle of the session
    pub fn writer(&self) -> &SessionWriter {
        &self.writer
    }
}

/// Bounded arena of connected sessions
#[derive(Debug)]
pub struct ClientRegistry {
    slots: Mutex<Vec<Option<RegistryEntry>>>,
    next_token: AtomicU64,
}

impl ClientRegistry {
    /// Create a registry with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; capacity]),
            next_token: AtomicU64::new(1),
        }
    }

    /// Claim the first free slot for `peer`
    ///
    /// Fails with [`ServerError::RegistryFull`] when every slot is
    /// taken; the caller then owes the peer a capacity rejection line.
    pub fn register(&self, peer: SocketAddr, writer: SessionWriter) -> Result<SessionToken> {
        let token = SessionToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
        let mut slots = self.lock_slots();
        let Some(slot) = slots.iter_mut().find(|slot| slot.is_none()) else {
            return Err(ServerError::RegistryFull(slots.len()));
        };
        *slot = Some(RegistryEntry {
            token,
            peer,
            writer,
        });
        tracing::trace!("Registered {} from {}", token, peer);
        Ok(token)
    }

    /// Release the slot held by `token`
    ///
    /// Idempotent: unknown or already-released tokens are ignored, so
    /// every session exit path may call this unconditionally.
    pub fn unregister(&self, token: SessionToken) {
        let mut slots = self.lock_slots();
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|entry| entry.token == token) {
                *slot = None;
                tracing::trace!("Unregistered {}", token);
                return;
            }
        }
    }

    /// Copies of every live entry, in slot order
    ///
    /// The broadcast loop fans out to this snapshot after the lock is
    /// released; sessions that join or leave mid-cycle catch the next
    /// one.
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        self.lock_slots().iter().flatten().cloned().collect()
    }

    /// Peer addresses of every live entry, in slot order
    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.lock_slots()
            .iter()
            .flatten()
            .map(|entry| entry.peer)
            .collect()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.lock_slots().iter().flatten().count()
    }

    /// Whether no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.lock_slots().len()
    }

    fn lock_slots(&self) -> MutexGuard<'_, Vec<Option<RegistryEntry>>> {
        self.slots.lock().expect("registry lock poisoned")
    }
}
