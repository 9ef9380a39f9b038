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

use crate::locking::cancellation::CancellationToken;
use crate::locking::target::{HolderId, LockTarget};
use crate::locking::wait_observer::LockWaitObserver;
use log::debug;
use std::cmp;
use std::sync::{Condvar, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Longest single condition-variable wait; bounds how late a cancellation is noticed.
pub const WAIT_SLICE: Duration = Duration::from_millis(50);

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Cancelled,
}

impl WaitOutcome {
    pub fn is_ready(self) -> bool {
        matches!(self, WaitOutcome::Ready)
    }
}

/// Tracks elapsed and remaining time for one acquisition.
#[derive(Debug, Clone, Copy)]
pub struct AcquireBudget {
    timeout: Duration,
    started_at: Instant,
}

impl AcquireBudget {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            started_at: Instant::now(),
        }
    }

    #[cfg(test)]
    fn with_start(timeout: Duration, started_at: Instant) -> Self {
        Self {
            timeout,
            started_at,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }
}

/// Carries the state of a single lock acquisition attempt across its wait phases.
pub(crate) struct AcquisitionRequest<'a> {
    holder: HolderId,
    target: LockTarget<'a>,
    budget: AcquireBudget,
    cancellation: &'a CancellationToken,
    observer: Option<&'a dyn LockWaitObserver>,
    wait_started: bool,
    wakeups: usize,
}

impl<'a> AcquisitionRequest<'a> {
    pub fn new(
        holder: HolderId,
        target: LockTarget<'a>,
        budget: AcquireBudget,
        cancellation: &'a CancellationToken,
    ) -> Self {
        Self {
            holder,
            target,
            budget,
            cancellation,
            observer: None,
            wait_started: false,
            wakeups: 0,
        }
    }

    pub fn with_observer(mut self, observer: Option<&'a dyn LockWaitObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Points the request at the next primitive, keeping its budget.
    pub fn retarget(&mut self, target: LockTarget<'a>) {
        self.target = target;
        self.wait_started = false;
    }

    pub fn holder(&self) -> HolderId {
        self.holder
    }

    pub fn elapsed(&self) -> Duration {
        self.budget.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.budget.remaining()
    }

    #[cfg(test)]
    fn wakeups(&self) -> usize {
        self.wakeups
    }

    fn next_wait_slice(&self) -> Option<Duration> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return None;
        }
        Some(cmp::min(remaining, WAIT_SLICE))
    }

    fn record_wait_start(&mut self) {
        if self.wait_started {
            return;
        }
        self.wait_started = true;
        debug!(
            "{} blocked on {} with {:.3}s of budget left",
            self.holder,
            self.target,
            self.remaining().as_secs_f64()
        );
        if let Some(observer) = self.observer {
            observer.on_wait_start(self.holder, &self.target, self.budget.timeout());
        }
    }

    /// Blocks on `condvar` while `blocked` holds, within the remaining budget.
    ///
    /// The predicate is re-evaluated after every wakeup, so spurious wakeups and
    /// broadcasts meant for other waiters are harmless.
    pub(crate) fn wait_while<'g, T>(
        &mut self,
        condvar: &Condvar,
        mut guard: MutexGuard<'g, T>,
        mut blocked: impl FnMut(&T) -> bool,
    ) -> (MutexGuard<'g, T>, WaitOutcome) {
        loop {
            if !blocked(&*guard) {
                return (guard, WaitOutcome::Ready);
            }
            if self.cancellation.is_cancelled() {
                return (guard, WaitOutcome::Cancelled);
            }
            let Some(slice) = self.next_wait_slice() else {
                return (guard, WaitOutcome::TimedOut);
            };

            self.record_wait_start();
            let (next, _) = condvar
                .wait_timeout(guard, slice)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
            self.wakeups = self.wakeups.saturating_add(1);
        }
    }

    /// Reports the final outcome to the observer and returns whether the lock was taken.
    pub(crate) fn finish(&self, outcome: WaitOutcome) -> bool {
        let waited = self.elapsed();
        match outcome {
            WaitOutcome::Ready => {
                debug!(
                    "{} acquired {} after {:.3}s",
                    self.holder,
                    self.target,
                    waited.as_secs_f64()
                );
                if let Some(observer) = self.observer {
                    observer.on_acquired(self.holder, &self.target, waited);
                }
                true
            }
            WaitOutcome::TimedOut => {
                debug!(
                    "{} gave up on {} after {:.3}s",
                    self.holder,
                    self.target,
                    waited.as_secs_f64()
                );
                if let Some(observer) = self.observer {
                    observer.on_timeout(self.holder, &self.target, waited);
                }
                false
            }
            WaitOutcome::Cancelled => {
                debug!(
                    "{} cancelled its wait for {} after {:.3}s",
                    self.holder,
                    self.target,
                    waited.as_secs_f64()
                );
                if let Some(observer) = self.observer {
                    observer.on_cancelled(self.holder, &self.target, waited);
                }
                false
            }
        }
    }
}
