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

//! Randomness behind obstacle rolls and sensor sampling
//!
//! Both consumers draw uniform integers, so the seam is a single `roll`
//! method. Production uses the thread-local generator; tests and demos
//! inject [`ScriptedRandom`] to pin every outcome.

use rand::Rng;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::Mutex;

/// Uniform integer source
pub trait RandomSource: Send + Sync + Debug {
    /// Returns a uniform value in `0..bound`; a zero bound returns zero.
    fn roll(&self, bound: u32) -> u32;
}

/// Production source backed by the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        rand::rng().random_range(0..bound)
    }
}

/// Deterministic source that replays a scripted sequence
///
/// Rolls pop from the front of the script. An exhausted script keeps
/// returning the fallback value, which defaults to 1 so it never reads
/// as an obstacle.
#[derive(Debug)]
pub struct ScriptedRandom {
    rolls: Mutex<VecDeque<u32>>,
    fallback: u32,
}

impl ScriptedRandom {
    /// Create a source replaying `rolls` in order
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
            fallback: 1,
        }
    }

    /// Set the value returned once the script runs out
    pub fn with_fallback(mut self, fallback: u32) -> Self {
        self.fallback = fallback;
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn roll(&self, bound: u32) -> u32 {
        let value = self
            .rolls
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or(self.fallback);
        if bound == 0 { 0 } else { value % bound }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_range() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            assert!(source.roll(5) < 5);
            assert!(source.roll(300) < 300);
        }
        assert_eq!(source.roll(0), 0);
        assert_eq!(source.roll(1), 0);
    }

    #[test]
    fn scripted_random_replays_then_falls_back() {
        let source = ScriptedRandom::new([0, 215, 407]);
        assert_eq!(source.roll(5), 0);
        assert_eq!(source.roll(300), 215);
        assert_eq!(source.roll(1000), 407);
        // Script exhausted: the default fallback is 1.
        assert_eq!(source.roll(5), 1);
        assert_eq!(source.roll(5), 1);
    }

    #[test]
    fn scripted_random_wraps_to_the_bound() {
        let source = ScriptedRandom::new([12]).with_fallback(7);
        assert_eq!(source.roll(5), 2);
        assert_eq!(source.roll(5), 2);
        assert_eq!(source.roll(0), 0);
    }
}
