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

use crate::config::LockerConfig;
use crate::locking::escalation::EscalationPolicy;
use crate::locking::global::GlobalLockCoordinator;
use crate::locking::registry::LockRegistry;
use crate::locking::session::LockSession;
use crate::locking::target::{EntityKey, HolderId};
use crate::locking::wait_observer::LockWaitObserver;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Coordinates per-entity locks, the global lock and escalation for one key space.
///
/// Callers do not lock through the locker directly; each caller opens a
/// [`LockSession`] and acquires and releases through it. Share the locker
/// between threads with an `Arc` and open one session per thread.
pub struct EntityLocker<K: EntityKey> {
    registry: LockRegistry<K>,
    global: GlobalLockCoordinator,
    escalation: EscalationPolicy,
    default_timeout: Duration,
    observer: Option<Arc<dyn LockWaitObserver>>,
    next_holder: AtomicU64,
}

impl<K: EntityKey> EntityLocker<K> {
    pub fn new() -> Self {
        Self::with_config(&LockerConfig::default())
    }

    pub fn with_config(config: &LockerConfig) -> Self {
        Self {
            registry: LockRegistry::new(),
            global: GlobalLockCoordinator::new(),
            escalation: EscalationPolicy::from_config(&config.escalation),
            default_timeout: config.default_timeout(),
            observer: None,
            next_holder: AtomicU64::new(0),
        }
    }

    pub fn with_escalation(mut self, escalation: EscalationPolicy) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LockWaitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Opens a new caller context with its own identity and attempt counter.
    pub fn session(&self) -> LockSession<'_, K> {
        let raw = self.next_holder.fetch_add(1, Ordering::Relaxed) + 1;
        let holder = HolderId::new(raw);
        debug!("Opened {holder}");
        LockSession::new(self, holder)
    }

    pub fn escalation(&self) -> EscalationPolicy {
        self.escalation
    }

    /// Timeout configured for callers that do not pick their own.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn registered_keys(&self) -> usize {
        self.registry.len()
    }

    pub fn is_locked(&self, key: &K) -> bool {
        self.registry
            .get(key)
            .is_some_and(|lock| lock.is_locked())
    }

    pub fn is_global_locked(&self) -> bool {
        self.global.is_locked()
    }

    /// Drops registry entries that are neither locked nor being acquired.
    pub fn prune_idle(&self) -> usize {
        self.registry.prune_idle()
    }

    pub(crate) fn registry(&self) -> &LockRegistry<K> {
        &self.registry
    }

    pub(crate) fn global(&self) -> &GlobalLockCoordinator {
        &self.global
    }

    pub(crate) fn observer(&self) -> Option<&dyn LockWaitObserver> {
        self.observer.as_deref()
    }
}

impl<K: EntityKey> Default for EntityLocker<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationConfig;

    #[test]
    fn sessions_get_distinct_holders() {
        let locker: EntityLocker<u32> = EntityLocker::new();
        let first = locker.session();
        let second = locker.session();
        assert_ne!(first.holder(), second.holder());
    }

    #[test]
    fn config_drives_policy_and_timeout() {
        let config = LockerConfig {
            escalation: EscalationConfig {
                enabled: true,
                threshold: 3,
            },
            default_timeout_ms: 40,
        };
        let locker: EntityLocker<u32> = EntityLocker::with_config(&config);
        assert_eq!(locker.escalation().threshold(), 3);
        assert_eq!(locker.default_timeout(), Duration::from_millis(40));
    }

    #[test]
    fn introspection_reflects_lock_state() {
        let locker = EntityLocker::new();
        let session = locker.session();
        assert!(!locker.is_locked(&1));
        assert!(session.try_lock(&1, Duration::from_millis(50)).unwrap());
        assert!(locker.is_locked(&1));
        assert_eq!(locker.registered_keys(), 1);
        session.unlock(&1).unwrap();
        assert!(!locker.is_locked(&1));
        assert_eq!(locker.prune_idle(), 1);
        assert_eq!(locker.registered_keys(), 0);
    }
}
