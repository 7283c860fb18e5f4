//! Shutdown coordination for the gateway.
//!
//! `Shutdown` is a latch: once triggered it stays triggered, so a
//! [`ShutdownSignal`] created or awaited after the trigger still fires.

use tokio::sync::watch;

use crate::lifecycle::signals;

/// Why the server is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    Requested,
}

impl ShutdownReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownReason::Interrupt => "interrupt",
            ShutdownReason::Terminate => "terminate",
            ShutdownReason::Requested => "requested",
        }
    }
}

/// Owner side of the shutdown latch.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Latch the shutdown; every signal, current or future, resolves.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Handle whose [`ShutdownSignal::wait`] also listens for OS signals.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
            os_signals: true,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of the shutdown latch.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
    os_signals: bool,
}

impl ShutdownSignal {
    /// Ignore Ctrl+C and SIGTERM; only [`Shutdown::trigger`] stops the wait.
    pub fn without_os_signals(mut self) -> Self {
        self.os_signals = false;
        self
    }

    /// Resolve once shutdown is due.
    pub async fn wait(self) -> ShutdownReason {
        let ShutdownSignal { mut rx, os_signals } = self;
        let requested = async move {
            // A dropped owner can no longer trigger; only OS signals remain.
            if rx.wait_for(|triggered| *triggered).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        if os_signals {
            tokio::select! {
                reason = signals::os_signal() => reason,
                _ = requested => ShutdownReason::Requested,
            }
        } else {
            requested.await;
            ShutdownReason::Requested
        }
    }
}
