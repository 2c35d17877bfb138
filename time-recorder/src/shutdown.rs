// src/shutdown.rs
//! Stop requests for the recorder process.
//!
//! Ctrl-C is honoured everywhere. On Unix SIGTERM is honoured too, since that
//! is what service managers and container runtimes send. Handlers are
//! registered by [`ShutdownSignal::install`], so a signal that arrives before
//! [`ShutdownSignal::wait`] is still seen and does not kill the process.

use std::io;

use tokio::runtime::{Builder, Runtime};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRequest {
    /// Ctrl-C / SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

pub struct ShutdownSignal {
    rt: Runtime,
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    pub fn install() -> io::Result<Self> {
        let rt = Builder::new_current_thread().enable_io().build()?;
        #[cfg(unix)]
        let terminate = {
            let _ctx = rt.enter();
            signal(SignalKind::terminate())?
        };
        Ok(Self {
            rt,
            #[cfg(unix)]
            terminate,
        })
    }

    /// Block until a stop request arrives.
    #[cfg(unix)]
    pub fn wait(self) -> io::Result<StopRequest> {
        let Self { rt, mut terminate } = self;
        rt.block_on(async {
            tokio::select! {
                res = tokio::signal::ctrl_c() => res.map(|()| StopRequest::Interrupt),
                _ = terminate.recv() => Ok(StopRequest::Terminate),
            }
        })
    }

    /// Block until a stop request arrives.
    #[cfg(not(unix))]
    pub fn wait(self) -> io::Result<StopRequest> {
        self.rt
            .block_on(tokio::signal::ctrl_c())
            .map(|()| StopRequest::Interrupt)
    }
}
