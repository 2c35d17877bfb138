// src/main.rs

//! Recorder entry-point.
//!
//! 1. Parse configuration & set up structured logging
//! 2. Open SQLite (WAL) and build the recorder
//! 3. Start the recording and reconnection threads
//! 4. Wait for Ctrl-C or SIGTERM
//! 5. Stop the threads, flush what is buffered, log the final status
//!
//!
// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::{Context, Result};
use chrono::Local;
use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

// ───── local imports ────────────────────────────────────────────────────────
use time_recorder::{
    config::{self, Config},
    db::SqliteStore,
    logging::setup_logging,
    recorder::TimeRecorder,
    scheduler::Scheduler,
    shutdown::ShutdownSignal,
};

const DEFAULT_CONFIG: &str = "default.toml";

// ───── helpers ──────────────────────────────────────────────────────────────

/// Directory that contains the running executable.
fn exe_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("Cannot determine exe path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("Executable must live in some directory")
}

/// First CLI argument, else `default.toml` next to the executable.
fn config_path(exe_dir: &Path) -> PathBuf {
    env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| exe_dir.join(DEFAULT_CONFIG))
}

// ───── service logic ────────────────────────────────────────────────────────

fn run() -> Result<()> {
    // 1 ─ Context & configuration
    let exe_dir = exe_dir()?;
    let cfg_path = config_path(&exe_dir);
    let cfg: Config = config::load(&cfg_path)
        .with_context(|| format!("Loading {}", cfg_path.display()))?;
    let base_dir = cfg_path.parent().unwrap_or(exe_dir.as_path()).to_path_buf();

    // 2 ─ Logging
    setup_logging(&base_dir, &cfg.logging).context("Logging setup failed")?;
    log::info!("Recorder bootstrap initiated with {}", cfg_path.display());

    let stop = ShutdownSignal::install().context("Installing signal handlers")?;

    // 3 ─ Store & recorder
    let store = SqliteStore::open(&base_dir, &cfg.database).context("Opening database")?;
    let recorder = Arc::new(TimeRecorder::new(Arc::new(store), cfg.recorder.clone()));

    // 4 ─ Schedulers
    let scheduler = Scheduler::start(Arc::clone(&recorder)).context("Starting schedulers")?;
    log::info!("Recorder running. Press Ctrl-C to stop");

    // 5 ─ Wait for shutdown
    let request = stop.wait().context("Failed to listen for stop signals")?;
    log::warn!("Shutdown initiated ({:?})", request);
    scheduler.shutdown();
    recorder.shutdown();

    match serde_json::to_string(&recorder.status_snapshot()) {
        Ok(json) => log::info!("Final status: {}", json),
        Err(e) => log::warn!("Could not render final status: {}", e),
    }
    log::info!("Recorder stopped cleanly");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("[{}][ERROR][main] {:#}", Local::now().to_rfc3339(), e);
        std::process::exit(1);
    }
}
