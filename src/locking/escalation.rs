// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::EscalationConfig;
use std::cell::Cell;

pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 12;

/// Number of acquisition attempts made through one session. Never decremented.
#[derive(Debug, Default)]
pub struct AttemptCounter {
    attempts: Cell<u32>,
}

impl AttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.attempts.get()
    }

    fn increment(&self) -> u32 {
        let next = self.attempts.get().saturating_add(1);
        self.attempts.set(next);
        next
    }
}

/// Routes a session to the global lock once it has made more than `threshold` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    enabled: bool,
    threshold: u32,
}

impl EscalationPolicy {
    pub const fn new(threshold: u32) -> Self {
        Self {
            enabled: true,
            threshold,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }

    pub fn from_config(config: &EscalationConfig) -> Self {
        Self {
            enabled: config.enabled,
            threshold: config.threshold,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Records one attempt on `counter` and reports whether it must use the global lock.
    ///
    /// Once a counter passes the threshold every later attempt escalates as well.
    pub fn should_escalate(&self, counter: &AttemptCounter) -> bool {
        let attempts = counter.increment();
        self.enabled && attempts > self.threshold
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_THRESHOLD)
    }
}
