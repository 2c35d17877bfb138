// src/scheduler.rs

//! Periodic drivers for the recorder.
//!
//! Two dedicated threads, so a long flush never delays a capture tick:
//! - `time-recorder` calls `record_now()` every `record_interval`, starting at once.
//! - `db-reconnector` calls `attempt_reconnection()` every
//!   `reconnect_interval`, starting one interval in.
//!
//! Both sleep on a channel that is closed on shutdown, so stopping does not
//! wait for a full period.

use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::recorder::TimeRecorder;

pub struct Scheduler {
    stop_tx: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn both periodic threads.
    pub fn start(recorder: Arc<TimeRecorder>) -> io::Result<Self> {
        let record_every = recorder.settings().record_interval();
        let reconnect_every = recorder.settings().reconnect_interval();
        log::info!(
            "Starting schedulers: record every {} ms, reconnect every {} ms",
            record_every.as_millis(),
            reconnect_every.as_millis()
        );

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);

        let recording = {
            let recorder = Arc::clone(&recorder);
            spawn_periodic("time-recorder", Duration::ZERO, record_every, stop_rx.clone(), move || {
                recorder.record_now()
            })?
        };
        let reconnecting = spawn_periodic(
            "db-reconnector",
            reconnect_every,
            reconnect_every,
            stop_rx,
            move || {
                let _ = recorder.attempt_reconnection();
            },
        )?;

        log::info!("Schedulers started");
        Ok(Self { stop_tx: Some(stop_tx), handles: vec![recording, reconnecting] })
    }

    /// Signal both threads and wait for the tick in flight to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else { return };
        log::info!("Shutting down schedulers...");
        drop(stop_tx);
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("scheduler").to_owned();
            if handle.join().is_err() {
                log::error!("Scheduler thread {} terminated abnormally", name);
            }
        }
        log::info!("Schedulers shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `task` at a fixed rate until `stop_rx` disconnects. Ticks that fall
/// behind are skipped rather than run back to back.
fn spawn_periodic<F>(
    name: &str,
    initial_delay: Duration,
    period: Duration,
    stop_rx: Receiver<()>,
    mut task: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    let label = name.to_owned();
    thread::Builder::new().name(name.to_owned()).spawn(move || {
        log::debug!("[{}] thread started", label);
        let mut next = Instant::now() + initial_delay;
        loop {
            let wait = next.saturating_duration_since(Instant::now());
            match stop_rx.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            if panic::catch_unwind(AssertUnwindSafe(&mut task)).is_err() {
                log::error!("[{}] unexpected panic during tick", label);
            }

            next += period;
            let now = Instant::now();
            if next < now {
                next = now;
            }
        }
        log::debug!("[{}] thread stopped", label);
    })
}
