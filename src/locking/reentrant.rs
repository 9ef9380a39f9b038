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

//! Reentrant mutual exclusion keyed by session identity.
//!
//! Ownership is an `(owner, holds)` pair guarded by a `Mutex`. The owning
//! session may acquire again, which only bumps the hold count; the lock is
//! handed to someone else once the count drops back to zero, at which point
//! every waiter is woken through the condition variable.

use crate::error::{LockerError, Result};
use crate::locking::acquisition::{AcquisitionRequest, WaitOutcome};
use crate::locking::target::HolderId;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Owner and hold count of a reentrant primitive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ownership {
    owner: Option<HolderId>,
    holds: usize,
}

impl Ownership {
    /// True when `holder` could take the primitive right now.
    pub(crate) fn admits(&self, holder: HolderId) -> bool {
        self.owner.is_none_or(|owner| owner == holder)
    }

    pub(crate) fn acquire(&mut self, holder: HolderId) {
        debug_assert!(self.admits(holder));
        self.owner = Some(holder);
        self.holds += 1;
    }

    /// Drops one hold; returns the holds left, or `None` if `holder` is not the owner.
    pub(crate) fn release(&mut self, holder: HolderId) -> Option<usize> {
        if self.owner != Some(holder) {
            return None;
        }
        self.holds -= 1;
        if self.holds == 0 {
            self.owner = None;
        }
        Some(self.holds)
    }

    /// Drops every hold owned by `holder`; returns how many were dropped.
    pub(crate) fn release_all(&mut self, holder: HolderId) -> usize {
        if self.owner != Some(holder) {
            return 0;
        }
        let dropped = self.holds;
        self.owner = None;
        self.holds = 0;
        dropped
    }

    pub(crate) fn owner(&self) -> Option<HolderId> {
        self.owner
    }

    pub(crate) fn holds(&self) -> usize {
        self.holds
    }

    pub(crate) fn is_held_by(&self, holder: HolderId) -> bool {
        self.owner == Some(holder)
    }
}

/// Reentrant lock guarding a single entity.
#[derive(Debug, Default)]
pub struct ReentrantLock {
    state: Mutex<Ownership>,
    released: Condvar,
}

impl ReentrantLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Ownership> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the lock only if it is free or already owned by `holder`.
    #[cfg(test)]
    pub(crate) fn try_lock(&self, holder: HolderId) -> bool {
        let mut state = self.state();
        if state.admits(holder) {
            state.acquire(holder);
            true
        } else {
            false
        }
    }

    /// Waits for the lock within the request's remaining budget.
    pub(crate) fn try_lock_for(&self, request: &mut AcquisitionRequest<'_>) -> WaitOutcome {
        let holder = request.holder();
        let guard = self.state();
        let (mut state, outcome) =
            request.wait_while(&self.released, guard, |state| !state.admits(holder));
        if outcome.is_ready() {
            state.acquire(holder);
        }
        outcome
    }

    /// Drops one hold and returns the holds left.
    ///
    /// Fails with `IllegalState` when `holder` does not own the lock.
    pub fn unlock(&self, holder: HolderId) -> Result<usize> {
        let mut state = self.state();
        let remaining = state.release(holder).ok_or_else(|| {
            LockerError::IllegalState(format!("{holder} does not hold this entity lock"))
        })?;
        drop(state);
        if remaining == 0 {
            self.released.notify_all();
        }
        Ok(remaining)
    }

    pub(crate) fn release_all(&self, holder: HolderId) -> usize {
        let dropped = self.state().release_all(holder);
        if dropped > 0 {
            self.released.notify_all();
        }
        dropped
    }

    pub fn is_held_by(&self, holder: HolderId) -> bool {
        self.state().is_held_by(holder)
    }

    pub fn is_locked(&self) -> bool {
        self.state().owner().is_some()
    }

    pub fn owner(&self) -> Option<HolderId> {
        self.state().owner()
    }

    pub fn hold_count(&self) -> usize {
        self.state().holds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locking::acquisition::AcquireBudget;
    use crate::locking::cancellation::CancellationToken;
    use crate::locking::target::LockTarget;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn lock_for(lock: &ReentrantLock, holder: HolderId, timeout: Duration) -> WaitOutcome {
        let cancellation = CancellationToken::new();
        let key = "k";
        let mut request = AcquisitionRequest::new(
            holder,
            LockTarget::Entity(&key),
            AcquireBudget::new(timeout),
            &cancellation,
        );
        lock.try_lock_for(&mut request)
    }

    #[test]
    fn owner_can_reenter() {
        let lock = ReentrantLock::new();
        let a = HolderId::new(1);
        assert!(lock.try_lock(a));
        assert!(lock.try_lock(a));
        assert_eq!(lock.hold_count(), 2);
        assert_eq!(lock.owner(), Some(a));

        assert_eq!(lock.unlock(a).unwrap(), 1);
        assert!(lock.is_locked());
        assert_eq!(lock.unlock(a).unwrap(), 0);
        assert!(!lock.is_locked());
    }

    #[test]
    fn other_holder_is_excluded_until_last_release() {
        let lock = ReentrantLock::new();
        let a = HolderId::new(1);
        let b = HolderId::new(2);
        assert!(lock.try_lock(a));
        assert!(lock.try_lock(a));
        assert!(!lock.try_lock(b));
        lock.unlock(a).unwrap();
        assert!(!lock.try_lock(b));
        lock.unlock(a).unwrap();
        assert!(lock.try_lock(b));
        assert!(lock.is_held_by(b));
    }

    #[test]
    fn unlock_by_non_owner_is_illegal_state() {
        let lock = ReentrantLock::new();
        let a = HolderId::new(1);
        let b = HolderId::new(2);
        assert!(matches!(lock.unlock(a), Err(LockerError::IllegalState(_))));
        lock.try_lock(a);
        assert!(matches!(lock.unlock(b), Err(LockerError::IllegalState(_))));
        assert_eq!(lock.hold_count(), 1);
    }

    #[test]
    fn timed_wait_gives_up() {
        let lock = ReentrantLock::new();
        let a = HolderId::new(1);
        let b = HolderId::new(2);
        lock.try_lock(a);
        let outcome = lock_for(&lock, b, Duration::from_millis(60));
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(lock.is_held_by(a));
    }

    #[test]
    fn waiter_is_woken_by_release() {
        let lock = Arc::new(ReentrantLock::new());
        let a = HolderId::new(1);
        let b = HolderId::new(2);
        assert!(lock.try_lock(a));

        let releaser = Arc::clone(&lock);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            releaser.unlock(a).unwrap();
        });

        let started = Instant::now();
        let outcome = lock_for(&lock, b, Duration::from_secs(5));
        assert_eq!(outcome, WaitOutcome::Ready);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(lock.is_held_by(b));
        handle.join().unwrap();
    }

    #[test]
    fn release_all_frees_every_hold() {
        let lock = ReentrantLock::new();
        let a = HolderId::new(1);
        lock.try_lock(a);
        lock.try_lock(a);
        lock.try_lock(a);
        assert_eq!(lock.release_all(HolderId::new(9)), 0);
        assert_eq!(lock.release_all(a), 3);
        assert!(!lock.is_locked());
    }
}
