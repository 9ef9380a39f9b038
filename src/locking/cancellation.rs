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

//! Cancellation of pending lock waits.
//!
//! A wait that observes a cancelled token gives up and reports the
//! acquisition as failed, the same way a timeout does. Clones share one flag,
//! so a worker pool can hand the same token to every session it opens.

use log::{debug, warn};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[cfg(windows)]
use signal_hook::consts::signal::SIGBREAK;

#[cfg(not(windows))]
const CANCEL_SIGNALS: &[i32] = &[SIGINT, SIGTERM];
#[cfg(windows)]
const CANCEL_SIGNALS: &[i32] = &[SIGINT, SIGTERM, SIGBREAK];

/// Token observed by lock waits between condition-variable slices.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Cancels every wait observing this token or one of its clones.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!("Lock waits cancelled");
        }
    }

    /// Arranges for interrupt and termination signals to cancel this token.
    ///
    /// Returns how many signal handlers were installed.
    fn cancel_on_signals(&self) -> usize {
        CANCEL_SIGNALS
            .iter()
            .filter(|signal| match flag::register(**signal, Arc::clone(&self.cancelled)) {
                Ok(_) => true,
                Err(err) => {
                    warn!("Cannot cancel lock waits on signal {signal}: {err}");
                    false
                }
            })
            .count()
    }
}

static SIGNAL_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

/// Returns the process-wide token that flips on Ctrl-C or a termination signal.
///
/// Handlers are installed the first time this is called.
pub fn global_token() -> CancellationToken {
    SIGNAL_TOKEN
        .get_or_init(|| {
            let token = CancellationToken::new();
            let installed = token.cancel_on_signals();
            debug!("Installed {installed} signal handler(s) for lock wait cancellation");
            token
        })
        .clone()
}
