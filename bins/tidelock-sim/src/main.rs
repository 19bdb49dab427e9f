//! Tidelock scenario runner.
//!
//! Replays a JSON script of timed calls against an in-memory engine and
//! prints one JSON line per step. With `--state` (or `--persist`) the engine
//! state and token balances are loaded before the run and saved after it.

mod runner;
mod script;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use tidelock_engine::{EngineConfig, SnapshotStore};

use crate::runner::{Runner, SimSnapshot};
use crate::script::Script;

#[derive(Parser, Debug)]
#[command(name = "tidelock-sim", version, about = "Replay locking and reward scenarios against Tidelock")]
struct Args {
    /// Scenario script (JSON)
    script: PathBuf,

    /// Engine configuration file (TOML); TIDELOCK__* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshot file to resume from and save to
    #[arg(long)]
    state: Option<PathBuf>,

    /// Persist to the default snapshot location when --state is not given
    #[arg(long)]
    persist: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    fn state_path(&self) -> Option<PathBuf> {
        self.state.clone().or_else(|| self.persist.then(EngineConfig::default_state_path))
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    if let Err(e) = run(&args) {
        error!("{e:#}");
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = EngineConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let script = Script::from_file(&args.script)?;

    let store = args.state_path().map(SnapshotStore::new);
    let snapshot = match &store {
        Some(store) => store.load::<SimSnapshot>().context("failed to load snapshot")?,
        None => None,
    };
    info!(
        steps = script.steps.len(),
        resumed = snapshot.is_some(),
        epoch = config.epoch,
        month_seconds = config.month_seconds,
        "starting scenario"
    );

    let mut runner = Runner::new(config, snapshot)?;
    let mut failed = 0usize;
    for (i, step) in script.steps.iter().enumerate() {
        let line = runner.run_step(i, step);
        if line["ok"] == false {
            failed += 1;
        }
        println!("{line}");
    }
    info!(
        failed,
        total_principal = runner.engine().total_principal(),
        reward_programs = runner.engine().reward_tokens().len(),
        "scenario finished"
    );

    if let Some(store) = store {
        store.save(&runner.into_snapshot()).context("failed to save snapshot")?;
        info!(path = %store.path().display(), "snapshot saved");
    }
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout stays a clean stream of JSON lines.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
