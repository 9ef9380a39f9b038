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

use std::fmt;
use std::hash::Hash;

/// Bound satisfied by every type usable as an entity key.
pub trait EntityKey: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> EntityKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Identity of a lock session; ownership of every primitive is tracked by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HolderId(u64);

impl HolderId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Describes which primitive a lock request is aimed at.
#[derive(Clone, Copy)]
pub enum LockTarget<'a> {
    Entity(&'a dyn fmt::Debug),
    Global,
}

impl LockTarget<'_> {
    pub fn is_global(&self) -> bool {
        matches!(self, LockTarget::Global)
    }
}

impl fmt::Display for LockTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockTarget::Entity(key) => write!(f, "entity {key:?}"),
            LockTarget::Global => f.write_str("global lock"),
        }
    }
}

impl fmt::Debug for LockTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
