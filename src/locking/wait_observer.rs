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

//! Observer interfaces for lock wait instrumentation.
//!
//! Observers decouple the `EntityLocker` from user-facing feedback so callers
//! can surface contention, escalation and release events without wrapping
//! every call site.

use crate::locking::target::{HolderId, LockTarget};
use crate::locking::timeout::format_duration;
use log::info;
use std::time::Duration;

/// Observer hooks for lock lifecycle events.
pub trait LockWaitObserver: Send + Sync {
    /// Called once per request, the first time it has to block.
    fn on_wait_start(&self, _holder: HolderId, _target: &LockTarget<'_>, _timeout: Duration) {}

    fn on_acquired(&self, _holder: HolderId, _target: &LockTarget<'_>, _waited: Duration) {}

    fn on_timeout(&self, _holder: HolderId, _target: &LockTarget<'_>, _waited: Duration) {}

    fn on_cancelled(&self, _holder: HolderId, _target: &LockTarget<'_>, _waited: Duration) {}

    fn on_escalated(&self, _holder: HolderId, _key: &LockTarget<'_>, _attempts: u32) {}

    fn on_released(&self, _holder: HolderId, _target: &LockTarget<'_>) {}
}

/// Observer implementation that performs no work.
#[derive(Debug, Default)]
pub struct NoopLockWaitObserver;

impl LockWaitObserver for NoopLockWaitObserver {}

/// Observer that reports every event through the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LoggingLockWaitObserver;

impl LockWaitObserver for LoggingLockWaitObserver {
    fn on_wait_start(&self, holder: HolderId, target: &LockTarget<'_>, timeout: Duration) {
        let timeout_label = format_duration(timeout);
        if target.is_global() {
            info!("{holder} is waiting for global lock release (timeout {timeout_label})");
        } else {
            info!("{holder} is waiting for {target} (timeout {timeout_label})");
        }
    }

    fn on_acquired(&self, holder: HolderId, target: &LockTarget<'_>, waited: Duration) {
        let waited_label = format_duration(waited);
        info!("{holder} acquired {target} after {waited_label}");
    }

    fn on_timeout(&self, holder: HolderId, target: &LockTarget<'_>, waited: Duration) {
        let waited_label = format_duration(waited);
        info!("{holder} timed out waiting for {target} after {waited_label}");
    }

    fn on_cancelled(&self, holder: HolderId, target: &LockTarget<'_>, waited: Duration) {
        let waited_label = format_duration(waited);
        info!("{holder} cancelled wait for {target} after {waited_label}");
    }

    fn on_escalated(&self, holder: HolderId, key: &LockTarget<'_>, attempts: u32) {
        info!("Escalating {key} to the global lock for {holder} (attempt {attempts})");
    }

    fn on_released(&self, holder: HolderId, target: &LockTarget<'_>) {
        info!("{holder} released {target}");
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Captures events as short strings so tests can assert on ordering.
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl LockWaitObserver for RecordingObserver {
        fn on_wait_start(&self, _holder: HolderId, target: &LockTarget<'_>, _timeout: Duration) {
            self.push(format!("wait:{target}"));
        }

        fn on_acquired(&self, _holder: HolderId, target: &LockTarget<'_>, _waited: Duration) {
            self.push(format!("acquired:{target}"));
        }

        fn on_timeout(&self, _holder: HolderId, target: &LockTarget<'_>, _waited: Duration) {
            self.push(format!("timeout:{target}"));
        }

        fn on_cancelled(&self, _holder: HolderId, target: &LockTarget<'_>, _waited: Duration) {
            self.push(format!("cancelled:{target}"));
        }

        fn on_escalated(&self, _holder: HolderId, key: &LockTarget<'_>, attempts: u32) {
            self.push(format!("escalated:{key}:{attempts}"));
        }

        fn on_released(&self, _holder: HolderId, target: &LockTarget<'_>) {
            self.push(format!("released:{target}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::RecordingObserver;
    use super::*;

    #[test]
    fn noop_observer_accepts_all_events() {
        let observer = NoopLockWaitObserver;
        let holder = HolderId::new(1);
        observer.on_wait_start(holder, &LockTarget::Global, Duration::from_millis(5));
        observer.on_acquired(holder, &LockTarget::Global, Duration::ZERO);
        observer.on_released(holder, &LockTarget::Global);
    }

    #[test]
    fn recording_observer_keeps_order() {
        let observer = RecordingObserver::default();
        let holder = HolderId::new(3);
        let key = 9;
        observer.on_escalated(holder, &LockTarget::Entity(&key), 13);
        observer.on_acquired(holder, &LockTarget::Global, Duration::ZERO);
        observer.on_released(holder, &LockTarget::Global);
        assert_eq!(
            observer.events(),
            [
                "escalated:entity 9:13",
                "acquired:global lock",
                "released:global lock"
            ]
        );
    }
}
