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

pub mod acquisition;
pub mod cancellation;
pub mod escalation;
pub mod global;
pub mod locker;
pub mod reentrant;
pub mod registry;
pub mod scoped_guard;
pub mod session;
pub mod target;
pub mod timeout;
pub mod wait_observer;

pub use acquisition::{AcquireBudget, WAIT_SLICE, WaitOutcome};
pub use cancellation::{CancellationToken, global_token};
pub use escalation::{AttemptCounter, DEFAULT_ESCALATION_THRESHOLD, EscalationPolicy};
pub use global::GlobalLockCoordinator;
pub use locker::EntityLocker;
pub use reentrant::ReentrantLock;
pub use registry::LockRegistry;
pub use scoped_guard::EntityGuard;
pub use session::LockSession;
pub use target::{EntityKey, HolderId, LockTarget};
pub use timeout::{TimeoutParseError, parse_timeout};
pub use wait_observer::{LockWaitObserver, LoggingLockWaitObserver, NoopLockWaitObserver};
