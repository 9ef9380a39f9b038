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

use crate::error::{LockerError, Result};
use std::fmt;
use std::time::Duration;

/// Error produced when parsing a timeout value fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutParseError {
    message: String,
}

impl fmt::Display for TimeoutParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TimeoutParseError {}

impl TimeoutParseError {
    fn invalid_value(value: &str) -> Self {
        Self {
            message: format!(
                "Timeout value '{value}' is invalid. Use milliseconds ('250' or '250ms') or \
                 seconds ('2s')."
            ),
        }
    }
}

/// Parses a timeout such as `500`, `500ms` or `2s`. Bare numbers are milliseconds.
pub fn parse_timeout(value: &str) -> std::result::Result<Duration, TimeoutParseError> {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();

    let parsed = if let Some(millis) = lowered.strip_suffix("ms") {
        millis.trim().parse::<u64>().map(Duration::from_millis)
    } else if let Some(secs) = lowered.strip_suffix('s') {
        secs.trim().parse::<u64>().map(Duration::from_secs)
    } else {
        lowered.parse::<u64>().map(Duration::from_millis)
    };

    parsed.map_err(|_| TimeoutParseError::invalid_value(trimmed))
}

/// Rejects the zero timeout; every bounded wait needs a positive budget.
pub fn ensure_positive(timeout: Duration) -> Result<Duration> {
    if timeout.is_zero() {
        return Err(LockerError::InvalidArgument(
            "timeout must be greater than zero".to_string(),
        ));
    }
    Ok(timeout)
}

pub(crate) fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
