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

use entity_locker::config::LockerConfig;
use entity_locker::error::{LockerError, get_exit_code};
use entity_locker::locking::EntityLocker;
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    )
}

#[test]
fn environment_can_disable_escalation() {
    let config = LockerConfig::load_with_env(
        None,
        env(&[("ENTITY_LOCKER_ESCALATION__ENABLED", "false")]),
    )
    .unwrap();

    let locker = EntityLocker::with_config(&config);
    let session = locker.session();
    for key in 0..20u32 {
        assert!(session.try_lock(&key, Duration::from_millis(50)).unwrap());
    }
    assert!(!session.holds_global());
}

#[test]
fn file_threshold_drives_escalation() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("locker.toml");
    fs::write(&path, "[escalation]\nthreshold = 1\n").unwrap();

    let config = LockerConfig::load_with_env(Some(&path), env(&[])).unwrap();
    let locker = EntityLocker::with_config(&config);
    let session = locker.session();
    assert!(session.try_lock(&"first", Duration::from_millis(50)).unwrap());
    assert!(!session.holds_global());
    assert!(session.try_lock(&"second", Duration::from_millis(50)).unwrap());
    assert!(session.holds_global());
}

#[test]
fn malformed_file_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("locker.toml");
    fs::write(&path, "default_timeout_ms = \"soon\"\n").unwrap();

    let err = LockerConfig::load_with_env(Some(&path), env(&[])).unwrap_err();
    assert!(matches!(err, LockerError::Config(_)));
    assert_eq!(get_exit_code(&err), 2);
}
