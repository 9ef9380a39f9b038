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

use clap::{Parser, Subcommand};
use entity_locker::commands::config::ConfigCommand;
use entity_locker::commands::demo::{DemoCommand, DemoOptions};
use entity_locker::config::LockerConfig;
use entity_locker::error::{Result, get_exit_code};
use entity_locker::locking::parse_timeout;
use entity_locker::logging;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "entity-locker")]
#[command(author, version, about = "Reentrant per-entity locking with global escalation", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Acquisition timeout (e.g. "500", "500ms", "2s")
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout, global = true)]
    timeout: Option<Duration>,

    /// Time each protected operation takes (e.g. "100ms")
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout, global = true)]
    work: Option<Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a locking scenario with a pool of worker threads
    Demo {
        #[command(subcommand)]
        command: DemoCommand,
    },

    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    logging::setup_logger(cli.verbose);

    let config = match LockerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(get_exit_code(&e));
        }
    };

    let result: Result<()> = (|| match cli.command {
        Commands::Demo { command } => {
            let options = DemoOptions {
                timeout: cli.timeout,
                work: cli.work,
            };
            command.execute(&config, options)
        }
        Commands::Config => {
            let command = ConfigCommand::new(&config)?;
            command.execute()
        }
    })();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(get_exit_code(&e));
    }
}
