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

use log::debug;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// A resource whose updates are only meaningful while its entity lock is held.
///
/// Every mutation sleeps for `work` to widen the window in which overlapping
/// writers would interleave.
#[derive(Debug)]
pub struct ProtectedEntity {
    id: u32,
    value: Mutex<String>,
    work: Duration,
}

/// Point-in-time copy of an entity for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub value: String,
}

impl ProtectedEntity {
    pub fn new(id: u32, work: Duration) -> Self {
        Self {
            id,
            value: Mutex::new(String::new()),
            work,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn value(&self) -> String {
        self.value_mut().clone()
    }

    /// Appends a record of the calling thread, then simulates work.
    pub fn set_value(&self) {
        let name = current_thread_name();
        debug!("Updating entity {} from {name}", self.id);
        self.value_mut()
            .push_str(&format!("id = {} thread: {name}", self.id));
        thread::sleep(self.work);
    }

    /// Marks the value as checked, then simulates work.
    pub fn check(&self) {
        debug!(
            "Checking entity {} from {}",
            self.id,
            current_thread_name()
        );
        self.value_mut().push_str(" + check");
        thread::sleep(self.work);
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            value: self.value(),
        }
    }

    fn value_mut(&self) -> MutexGuard<'_, String> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn current_thread_name() -> String {
    thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}
