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

//! The global lock and the gate every per-entity critical section passes.
//!
//! Two rules are enforced under one mutex:
//!
//! 1. A session may enter an entity section only while the global lock is
//!    free or owned by that same session. The section opens once the session
//!    holds the entity lock; merely waiting for one opens nothing.
//! 2. A session may take the global lock only once no *other* session is
//!    inside an entity section.
//!
//! Together they make the global lock dominate every entity lock. Every state
//! change that can unblock a waiter is broadcast on the condition variable, so
//! waiters never sit out their full timeout after the lock frees.

use crate::error::{LockerError, Result};
use crate::locking::acquisition::{AcquisitionRequest, WaitOutcome};
use crate::locking::reentrant::Ownership;
use crate::locking::target::HolderId;
use log::debug;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct GateState {
    ownership: Ownership,
    /// Open entity sections per session; entries are removed when they reach zero.
    sections: HashMap<HolderId, usize>,
}

impl GateState {
    fn others_in_sections(&self, holder: HolderId) -> bool {
        self.sections.keys().any(|other| *other != holder)
    }

    fn admits_global(&self, holder: HolderId) -> bool {
        self.ownership.admits(holder) && !self.others_in_sections(holder)
    }
}

#[derive(Debug, Default)]
pub struct GlobalLockCoordinator {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl GlobalLockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for the global lock within the request's budget. Reentrant.
    pub(crate) fn try_acquire(&self, request: &mut AcquisitionRequest<'_>) -> WaitOutcome {
        let holder = request.holder();
        let guard = self.state();
        let (mut state, outcome) =
            request.wait_while(&self.changed, guard, |state| !state.admits_global(holder));
        if outcome.is_ready() {
            state.ownership.acquire(holder);
            debug!(
                "{holder} holds the global lock (hold count {})",
                state.ownership.holds()
            );
        }
        outcome
    }

    /// Drops one hold of the global lock and returns the holds left.
    ///
    /// Fails with `IllegalState` if `holder` does not own the global lock.
    pub fn release(&self, holder: HolderId) -> Result<usize> {
        let mut state = self.state();
        let remaining = state.ownership.release(holder).ok_or_else(|| {
            LockerError::IllegalState(format!("global lock is not held by {holder}"))
        })?;
        debug!("{holder} released the global lock (hold count {remaining})");
        drop(state);
        if remaining == 0 {
            self.changed.notify_all();
        }
        Ok(remaining)
    }

    /// Drops every hold `holder` has on the global lock.
    pub(crate) fn release_all(&self, holder: HolderId) -> usize {
        let dropped = self.state().ownership.release_all(holder);
        if dropped > 0 {
            self.changed.notify_all();
        }
        dropped
    }

    /// Waits until the global lock is free or owned by the caller. Opens nothing.
    pub(crate) fn wait_until_open(&self, request: &mut AcquisitionRequest<'_>) -> WaitOutcome {
        let holder = request.holder();
        let guard = self.state();
        let (guard, outcome) = request.wait_while(&self.changed, guard, |state| {
            !state.ownership.admits(holder)
        });
        drop(guard);
        outcome
    }

    /// Opens an entity section for a holder that already owns the entity lock.
    ///
    /// Returns false when another session took the global lock in the meantime;
    /// the caller must then give the entity lock back and wait again.
    pub(crate) fn try_enter_section(&self, holder: HolderId) -> bool {
        let mut state = self.state();
        if !state.ownership.admits(holder) {
            return false;
        }
        *state.sections.entry(holder).or_insert(0) += 1;
        true
    }

    /// Closes one entity section opened by `holder`.
    pub(crate) fn leave_section(&self, holder: HolderId) {
        self.leave_sections(holder, 1);
    }

    pub(crate) fn leave_sections(&self, holder: HolderId, count: usize) {
        let mut state = self.state();
        let Some(open) = state.sections.get_mut(&holder) else {
            return;
        };
        *open = open.saturating_sub(count);
        let drained = *open == 0;
        if drained {
            state.sections.remove(&holder);
        }
        drop(state);
        if drained {
            self.changed.notify_all();
        }
    }

    pub fn is_held_by(&self, holder: HolderId) -> bool {
        self.state().ownership.is_held_by(holder)
    }

    pub fn is_locked(&self) -> bool {
        self.state().ownership.owner().is_some()
    }

    pub fn owner(&self) -> Option<HolderId> {
        self.state().ownership.owner()
    }

    pub fn hold_count(&self) -> usize {
        self.state().ownership.holds()
    }

    /// Number of entity sections currently open across all sessions.
    pub fn open_sections(&self) -> usize {
        self.state().sections.values().sum()
    }
}
