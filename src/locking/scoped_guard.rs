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

use crate::error::Result;
use crate::locking::session::LockSession;
use crate::locking::target::EntityKey;
use log::warn;

/// RAII guard that releases one hold on an entity when dropped.
pub struct EntityGuard<'s, 'a, K: EntityKey> {
    session: &'s LockSession<'a, K>,
    key: Option<K>,
}

impl<'s, 'a, K: EntityKey> EntityGuard<'s, 'a, K> {
    pub(crate) fn new(session: &'s LockSession<'a, K>, key: K) -> Self {
        Self {
            session,
            key: Some(key),
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Releases the hold now and reports failures instead of logging them.
    pub fn release(mut self) -> Result<()> {
        match self.key.take() {
            Some(key) => self.session.unlock(&key),
            None => Ok(()),
        }
    }
}

impl<K: EntityKey> Drop for EntityGuard<'_, '_, K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take()
            && let Err(err) = self.session.unlock(&key)
        {
            warn!("Failed to release entity {key:?}: {err}");
        }
    }
}
