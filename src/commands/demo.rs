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
use crate::demo::{DEFAULT_WORK, DEFAULT_WORKERS, DemoReport, DemoSettings};
use crate::demo::{run_escalation_scenario, run_global_scenario};
use crate::error::Result;
use crate::locking::timeout::{ensure_positive, format_duration};
use crate::locking::{EntityLocker, LoggingLockWaitObserver, global_token};
use clap::Subcommand;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;

/// Flags shared by every demo scenario.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoOptions {
    pub timeout: Option<Duration>,
    pub work: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum DemoCommand {
    /// One worker holds the global lock while the others contend for entities
    Global {
        /// Make every contender lock this entity instead of its own
        #[arg(long, value_name = "ID")]
        entity: Option<u32>,

        /// Number of contending workers
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// One worker locks entities in sequence until requests escalate
    Escalation {
        /// Number of entities to lock (defaults to one past the escalation threshold)
        #[arg(long, value_name = "N")]
        keys: Option<u32>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl DemoCommand {
    pub fn execute(self, config: &LockerConfig, options: DemoOptions) -> Result<()> {
        let timeout = ensure_positive(options.timeout.unwrap_or_else(|| config.default_timeout()))?;
        let settings = DemoSettings {
            work: options.work.unwrap_or(DEFAULT_WORK),
            cancellation: global_token(),
            ..DemoSettings::new(timeout)
        };
        let locker =
            EntityLocker::with_config(config).with_observer(Arc::new(LoggingLockWaitObserver));

        match self {
            DemoCommand::Global {
                entity,
                workers,
                json,
            } => {
                let settings = DemoSettings { workers, ..settings };
                let report = run_global_scenario(&locker, &settings, entity)?;
                print_report(&report, &settings, json)
            }
            DemoCommand::Escalation { keys, json } => {
                let keys =
                    keys.unwrap_or_else(|| locker.escalation().threshold().saturating_add(1));
                let report = run_escalation_scenario(&locker, &settings, keys)?;
                print_report(&report, &settings, json)
            }
        }
    }
}

fn print_report(report: &DemoReport, settings: &DemoSettings, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{} Scenario: {} (timeout {}, work {})",
        "✓".green().bold(),
        report.scenario,
        format_duration(settings.timeout),
        format_duration(settings.work)
    );
    println!("  - {} acquired", report.acquired);
    if report.gave_up > 0 {
        println!("  - {} gave up {}", report.gave_up, "(timed out or cancelled)".yellow());
    } else {
        println!("  - 0 gave up");
    }
    println!("  - {} escalated", report.escalated);
    println!();
    println!("Entities:");
    for entity in &report.entities {
        let value = if entity.value.is_empty() {
            "(untouched)".dimmed().to_string()
        } else {
            entity.value.clone()
        };
        println!("  {:>4}  {value}", entity.id);
    }
    Ok(())
}
