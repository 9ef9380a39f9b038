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

//! Lazily populated map from entity key to its reentrant lock.
//!
//! Entries are created on first use through an atomic get-or-insert and are
//! never removed implicitly: memory grows with the number of distinct keys
//! ever locked. Long-lived lockers that see unbounded key spaces can call
//! [`LockRegistry::prune_idle`] at a quiet point to drop unused entries.

use crate::locking::reentrant::ReentrantLock;
use crate::locking::target::EntityKey;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

#[derive(Debug)]
pub struct LockRegistry<K: EntityKey> {
    locks: DashMap<K, Arc<ReentrantLock>>,
}

impl<K: EntityKey> LockRegistry<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Returns the lock for `key`, installing a fresh one if the key is new.
    ///
    /// Concurrent callers racing on the same unseen key all receive the same instance.
    pub fn get_or_create(&self, key: &K) -> Arc<ReentrantLock> {
        if let Some(existing) = self.locks.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self.locks.entry(key.clone()).or_insert_with(|| {
            debug!("Registering lock for entity {key:?}");
            Arc::new(ReentrantLock::new())
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, key: &K) -> Option<Arc<ReentrantLock>> {
        self.locks.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.locks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Removes entries that are unlocked and not referenced by any pending acquisition.
    ///
    /// Runs under each shard's write lock, so no caller can obtain a handle to an
    /// entry while it is being judged idle.
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks
            .retain(|_, lock| Arc::strong_count(lock) > 1 || lock.is_locked());
        let removed = before.saturating_sub(self.locks.len());
        if removed > 0 {
            debug!("Pruned {removed} idle entity lock(s)");
        }
        removed
    }
}

impl<K: EntityKey> Default for LockRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
