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

//! Per-caller lock context.
//!
//! A session is the identity every lock is owned by, and it carries the
//! attempt counter the escalation policy reads. It is `Send` but not `Sync`:
//! hand it to one worker and let that worker do all of its locking through it.

use crate::error::{LockerError, Result};
use crate::locking::acquisition::{AcquireBudget, AcquisitionRequest, WaitOutcome};
use crate::locking::cancellation::CancellationToken;
use crate::locking::escalation::AttemptCounter;
use crate::locking::locker::EntityLocker;
use crate::locking::scoped_guard::EntityGuard;
use crate::locking::target::{EntityKey, HolderId, LockTarget};
use crate::locking::timeout::ensure_positive;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

pub struct LockSession<'a, K: EntityKey> {
    locker: &'a EntityLocker<K>,
    holder: HolderId,
    attempts: AttemptCounter,
    /// Entity holds per key taken through the per-entity path.
    held: RefCell<HashMap<K, usize>>,
    /// Global holds per key taken because the request escalated.
    escalated: RefCell<HashMap<K, usize>>,
    cancellation: CancellationToken,
}

impl<'a, K: EntityKey> LockSession<'a, K> {
    pub(crate) fn new(locker: &'a EntityLocker<K>, holder: HolderId) -> Self {
        Self {
            locker,
            holder,
            attempts: AttemptCounter::new(),
            held: RefCell::new(HashMap::new()),
            escalated: RefCell::new(HashMap::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Makes every wait of this session give up once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn holder(&self) -> HolderId {
        self.holder
    }

    /// Acquisition attempts made so far, escalated or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    /// Entity holds this session has on `key`.
    pub fn holds(&self, key: &K) -> usize {
        self.held.borrow().get(key).copied().unwrap_or(0)
    }

    /// Global holds this session took for `key` because of escalation.
    pub fn escalated_holds(&self, key: &K) -> usize {
        self.escalated.borrow().get(key).copied().unwrap_or(0)
    }

    pub fn holds_global(&self) -> bool {
        self.locker.global().is_held_by(self.holder)
    }

    /// Tries to acquire exclusive access to `key` within `timeout`.
    ///
    /// Returns `Ok(false)` when the lock could not be taken in time or the wait was
    /// cancelled. Once the session has exceeded the escalation threshold the request
    /// takes the global lock instead and `key` is not locked individually.
    pub fn try_lock(&self, key: &K, timeout: Duration) -> Result<bool> {
        let timeout = ensure_positive(timeout)?;
        let budget = AcquireBudget::new(timeout);
        let observer = self.locker.observer();

        if self.locker.escalation().should_escalate(&self.attempts) {
            let attempts = self.attempts.get();
            debug!(
                "Escalating {key:?} to the global lock for {} (attempt {attempts})",
                self.holder
            );
            if let Some(observer) = observer {
                observer.on_escalated(self.holder, &LockTarget::Entity(key), attempts);
            }

            let mut request =
                AcquisitionRequest::new(self.holder, LockTarget::Global, budget, &self.cancellation)
                    .with_observer(observer);
            let outcome = self.locker.global().try_acquire(&mut request);
            let acquired = request.finish(outcome);
            if acquired {
                add_hold(&self.escalated, key);
            }
            return Ok(acquired);
        }

        let lock = self.locker.registry().get_or_create(key);
        let global = self.locker.global();
        let mut request =
            AcquisitionRequest::new(self.holder, LockTarget::Global, budget, &self.cancellation)
                .with_observer(observer);

        // The section opens only once the entity lock is held.
        loop {
            request.retarget(LockTarget::Global);
            let gate = global.wait_until_open(&mut request);
            if !gate.is_ready() {
                return Ok(request.finish(gate));
            }

            request.retarget(LockTarget::Entity(key));
            let outcome = lock.try_lock_for(&mut request);
            if !outcome.is_ready() {
                return Ok(request.finish(outcome));
            }
            if global.try_enter_section(self.holder) {
                break;
            }

            debug!(
                "{} took entity {key:?} after the global lock was granted; backing off",
                self.holder
            );
            lock.unlock(self.holder)?;
        }

        let acquired = request.finish(WaitOutcome::Ready);
        add_hold(&self.held, key);
        Ok(acquired)
    }

    /// Releases one hold on `key`.
    ///
    /// A key whose acquisition escalated gives back one global hold. Otherwise the
    /// entity lock is released if this session owns it; unlocking a key owned by
    /// someone else is a no-op. Fails with `LockNotFound` if `key` was never locked.
    pub fn unlock(&self, key: &K) -> Result<()> {
        if take_hold(&self.escalated, key) {
            self.locker.global().release(self.holder)?;
            self.notify_released(&LockTarget::Global);
            return Ok(());
        }

        let lock = self
            .locker
            .registry()
            .get(key)
            .ok_or_else(|| LockerError::lock_not_found(key))?;

        if !lock.is_held_by(self.holder) {
            debug!(
                "{} does not hold entity {key:?}; nothing to release",
                self.holder
            );
            return Ok(());
        }

        lock.unlock(self.holder)?;
        self.locker.global().leave_section(self.holder);
        take_hold(&self.held, key);
        self.notify_released(&LockTarget::Entity(key));
        Ok(())
    }

    /// Acquires the global lock directly. Does not count as an escalation attempt.
    pub fn try_lock_global(&self, timeout: Duration) -> Result<bool> {
        let timeout = ensure_positive(timeout)?;
        let mut request = AcquisitionRequest::new(
            self.holder,
            LockTarget::Global,
            AcquireBudget::new(timeout),
            &self.cancellation,
        )
        .with_observer(self.locker.observer());
        let outcome = self.locker.global().try_acquire(&mut request);
        Ok(request.finish(outcome))
    }

    /// Releases one hold on the global lock; fails with `IllegalState` if none is held.
    pub fn release_global(&self) -> Result<()> {
        self.locker.global().release(self.holder)?;
        self.notify_released(&LockTarget::Global);
        Ok(())
    }

    /// Acquires `key` and returns a guard that unlocks it when dropped.
    pub fn lock_scoped(&self, key: &K, timeout: Duration) -> Result<Option<EntityGuard<'_, 'a, K>>> {
        if self.try_lock(key, timeout)? {
            Ok(Some(EntityGuard::new(self, key.clone())))
        } else {
            Ok(None)
        }
    }

    fn notify_released(&self, target: &LockTarget<'_>) {
        if let Some(observer) = self.locker.observer() {
            observer.on_released(self.holder, target);
        }
    }
}

impl<K: EntityKey> Drop for LockSession<'_, K> {
    fn drop(&mut self) {
        let holder = self.holder;

        for (key, holds) in self.held.get_mut().drain() {
            warn!("{holder} closed while holding entity {key:?} ({holds} hold(s)); releasing");
            if let Some(lock) = self.locker.registry().get(&key) {
                let dropped = lock.release_all(holder);
                self.locker.global().leave_sections(holder, dropped);
            }
        }

        self.escalated.get_mut().clear();
        let dropped = self.locker.global().release_all(holder);
        if dropped > 0 {
            warn!("{holder} closed while holding the global lock ({dropped} hold(s)); releasing");
        }
        debug!("Closed {holder}");
    }
}

fn add_hold<K: EntityKey>(holds: &RefCell<HashMap<K, usize>>, key: &K) {
    *holds.borrow_mut().entry(key.clone()).or_insert(0) += 1;
}

/// Removes one hold on `key`; returns false when there was none.
fn take_hold<K: EntityKey>(holds: &RefCell<HashMap<K, usize>>, key: &K) -> bool {
    let mut holds = holds.borrow_mut();
    let Some(count) = holds.get_mut(key) else {
        return false;
    };
    *count -= 1;
    if *count == 0 {
        holds.remove(key);
    }
    true
}
