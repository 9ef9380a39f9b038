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

//! Worker-pool scenarios that exercise the locker end to end.

use crate::demo::entity::{EntitySnapshot, ProtectedEntity};
use crate::error::{LockerError, Result};
use crate::locking::{CancellationToken, EntityLocker, LockSession};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Barrier;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;

/// Entity the global worker updates while it holds the global lock.
pub const GLOBAL_ENTITY_ID: u32 = 0;
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_WORK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DemoSettings {
    /// Budget of every acquisition in the scenario.
    pub timeout: Duration,
    /// Time each protected operation sleeps.
    pub work: Duration,
    /// Contending workers besides the global worker.
    pub workers: usize,
    pub cancellation: CancellationToken,
}

impl DemoSettings {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            work: DEFAULT_WORK,
            workers: DEFAULT_WORKERS,
            cancellation: CancellationToken::new(),
        }
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DemoReport {
    pub scenario: String,
    pub acquired: usize,
    /// Acquisitions that timed out or were cancelled.
    pub gave_up: usize,
    /// Acquisitions served by the global lock after escalation.
    pub escalated: usize,
    pub entities: Vec<EntitySnapshot>,
}

impl DemoReport {
    fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, acquired: bool) {
        if acquired {
            self.acquired += 1;
        } else {
            self.gave_up += 1;
        }
    }
}

/// One worker takes the global lock and updates its entity while the others
/// contend for per-entity locks.
///
/// Contenders lock distinct keys `0..workers`, or all of them lock
/// `shared_entity` when given. None of them may enter before the global
/// worker releases.
pub fn run_global_scenario(
    locker: &EntityLocker<u32>,
    settings: &DemoSettings,
    shared_entity: Option<u32>,
) -> Result<DemoReport> {
    let contender_ids: Vec<u32> = (0..settings.workers)
        .map(|index| shared_entity.unwrap_or(index as u32))
        .collect();
    let entities = entity_table(
        std::iter::once(GLOBAL_ENTITY_ID).chain(contender_ids.iter().copied()),
        settings.work,
    );
    let start = Barrier::new(contender_ids.len() + 1);
    let mut report = DemoReport::new("global");

    info!(
        "Running global scenario with {} contender(s) on {}",
        contender_ids.len(),
        shared_entity.map_or_else(|| "distinct entities".to_string(), |id| format!("entity {id}"))
    );

    let outcomes = thread::scope(|scope| -> Result<Vec<bool>> {
        let entities = &entities;
        let start = &start;
        let mut handles = Vec::with_capacity(contender_ids.len() + 1);

        handles.push(spawn_worker(scope, "global-worker".to_string(), move || {
            let session = open_session(locker, settings);
            let acquired = session.try_lock_global(settings.timeout);
            start.wait();
            if !acquired? {
                return Ok(false);
            }
            update(entities, GLOBAL_ENTITY_ID);
            session.release_global()?;
            Ok(true)
        })?);

        for (index, id) in contender_ids.iter().copied().enumerate() {
            handles.push(spawn_worker(scope, format!("worker-{index}"), move || {
                start.wait();
                let session = open_session(locker, settings);
                let Some(guard) = session.lock_scoped(&id, settings.timeout)? else {
                    return Ok(false);
                };
                update(entities, id);
                guard.release()?;
                Ok(true)
            })?);
        }

        handles.into_iter().map(join_worker).collect()
    })?;

    for acquired in outcomes {
        report.record(acquired);
    }
    report.entities = entities.values().map(ProtectedEntity::snapshot).collect();
    Ok(report)
}

/// One worker locks `keys` distinct entities in sequence, each in its own scoped
/// acquisition, and counts how many were served by the global lock.
pub fn run_escalation_scenario(
    locker: &EntityLocker<u32>,
    settings: &DemoSettings,
    keys: u32,
) -> Result<DemoReport> {
    let entities = entity_table(0..keys, settings.work);
    let mut report = DemoReport::new("escalation");

    info!(
        "Running escalation scenario over {keys} key(s) with threshold {}",
        locker.escalation().threshold()
    );

    let outcomes = thread::scope(|scope| -> Result<Vec<(bool, bool)>> {
        let entities = &entities;
        let handle = spawn_worker(scope, "worker-0".to_string(), move || {
            let session = open_session(locker, settings);
            let mut outcomes = Vec::with_capacity(keys as usize);
            for id in 0..keys {
                let Some(guard) = session.lock_scoped(&id, settings.timeout)? else {
                    outcomes.push((false, false));
                    continue;
                };
                let escalated = session.escalated_holds(&id) > 0;
                if escalated {
                    debug!("Entity {id} is protected by the global lock");
                }
                update(entities, id);
                guard.release()?;
                outcomes.push((true, escalated));
            }
            Ok(outcomes)
        })?;
        join_worker(handle)
    })?;

    for (acquired, escalated) in outcomes {
        report.record(acquired);
        if escalated {
            report.escalated += 1;
        }
    }
    report.entities = entities.values().map(ProtectedEntity::snapshot).collect();
    Ok(report)
}

fn entity_table(ids: impl IntoIterator<Item = u32>, work: Duration) -> BTreeMap<u32, ProtectedEntity> {
    ids.into_iter()
        .map(|id| (id, ProtectedEntity::new(id, work)))
        .collect()
}

fn open_session<'a>(locker: &'a EntityLocker<u32>, settings: &DemoSettings) -> LockSession<'a, u32> {
    locker
        .session()
        .with_cancellation(settings.cancellation.clone())
}

fn update(entities: &BTreeMap<u32, ProtectedEntity>, id: u32) {
    if let Some(entity) = entities.get(&id) {
        entity.set_value();
        entity.check();
    }
}

fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: String,
    work: F,
) -> Result<ScopedJoinHandle<'scope, Result<T>>>
where
    T: Send + 'scope,
    F: FnOnce() -> Result<T> + Send + 'scope,
{
    Ok(thread::Builder::new().name(name).spawn_scoped(scope, work)?)
}

fn join_worker<T>(handle: ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle
        .join()
        .map_err(|_| LockerError::IllegalState("demo worker panicked".to_string()))?
}
