// src/exec/signals.rs

//! Scoped OS signal subscription.
//!
//! A [`SignalSubscription`] owns one forwarding task per signal kind; all of
//! them feed a single channel. Dropping the subscription aborts the
//! forwarders, so nothing outlives the supervisor's wait.
//!
//! Tokio keeps its handlers installed after the streams go away, which means
//! the agent survives the SIGHUP it later sends to its own process group and
//! can still exit with the classified code.

use nix::sys::signal::Signal;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::errors::Result;
use crate::types::OsSignal;

/// Signals that cannot be caught, or that the runtime refuses to handle.
const NOT_SUBSCRIBABLE: [Signal; 5] = [
    Signal::SIGKILL,
    Signal::SIGSTOP,
    Signal::SIGILL,
    Signal::SIGFPE,
    Signal::SIGSEGV,
];

/// Every signal the supervisor reacts to (or explicitly ignores): all
/// catchable ones, so none of them can end or stop the agent behind the
/// supervisor's back.
pub fn subscribed_signals() -> Vec<OsSignal> {
    Signal::iterator()
        .filter(|sig| !NOT_SUBSCRIBABLE.contains(sig))
        .map(|sig| OsSignal::from_raw(sig as i32))
        .collect()
}

pub struct SignalSubscription {
    rx: mpsc::Receiver<OsSignal>,
    _forwarders: JoinSet<()>,
}

impl std::fmt::Debug for SignalSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSubscription").finish_non_exhaustive()
    }
}

impl SignalSubscription {
    /// Subscribe to every signal in [`subscribed_signals`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe_all() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<OsSignal>(16);
        let mut forwarders = JoinSet::new();
        let subscribed = subscribed_signals();

        for sig in subscribed.iter().copied() {
            let mut stream = signal(SignalKind::from_raw(sig.as_raw()))?;
            let tx = tx.clone();
            forwarders.spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(sig).await.is_err() {
                        break;
                    }
                }
            });
        }

        debug!(count = subscribed.len(), "subscribed to OS signals");
        Ok(Self {
            rx,
            _forwarders: forwarders,
        })
    }

    /// A subscription fed by hand instead of by the OS.
    pub fn manual() -> (mpsc::Sender<OsSignal>, Self) {
        let (tx, rx) = mpsc::channel::<OsSignal>(16);
        (
            tx,
            Self {
                rx,
                _forwarders: JoinSet::new(),
            },
        )
    }

    /// Next delivered signal, or `None` once no source is left.
    pub async fn recv(&mut self) -> Option<OsSignal> {
        self.rx.recv().await
    }
}
