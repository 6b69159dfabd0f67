//! Status delivery: expose the job slot to remote observers.
//!
//! ## Why a stream?
//!
//! Inference calls dominate run latency; a client that polled once and gave
//! up would sit on a stale `Processing` forever. The push shape emits a
//! snapshot immediately on subscribe and again on every transition, so a UI
//! can render the full lifecycle without re-sampling on a timer. A heartbeat
//! re-emit (no coarser than the configured cadence) runs only while the slot
//! is non-terminal, as a liveness signal for transports that need periodic
//! traffic — the transition push is the primary mechanism.
//!
//! Snapshots are broadcast, not competed for: every subscriber sees every
//! transition, and dropping one subscription releases only that receiver.
//! The pipeline never waits on any subscriber.

use crate::job::JobSnapshot;
use futures::stream;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::Stream;

/// A boxed stream of job snapshots.
pub type StatusStream = Pin<Box<dyn Stream<Item = JobSnapshot> + Send>>;

/// Read-only view of the job slot: pull snapshots or push subscriptions.
#[derive(Clone)]
pub struct StatusChannel {
    rx: watch::Receiver<JobSnapshot>,
    heartbeat: Duration,
}

impl StatusChannel {
    pub(crate) fn new(rx: watch::Receiver<JobSnapshot>, heartbeat: Duration) -> Self {
        Self { rx, heartbeat }
    }

    /// Current snapshot. Never blocks on the pipeline.
    pub fn snapshot(&self) -> JobSnapshot {
        self.rx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    ///
    /// The stream yields the current snapshot immediately, then one item per
    /// transition, plus heartbeat re-emits while the slot is non-terminal.
    /// It does not end at a terminal snapshot — the slot is reusable and a
    /// later run's transitions flow through the same subscription. The
    /// stream ends only when the solver (the writer) is dropped.
    pub fn subscribe(&self) -> StatusStream {
        let state = Subscriber {
            rx: self.rx.clone(),
            heartbeat: self.heartbeat,
            primed: false,
        };

        Box::pin(stream::unfold(state, |mut s| async move {
            if !s.primed {
                s.primed = true;
                let snap = s.rx.borrow_and_update().clone();
                return Some((snap, s));
            }

            let current = s.rx.borrow().clone();
            if current.status.is_terminal() {
                // At rest: nothing to heartbeat, just wait for the next run.
                match s.rx.changed().await {
                    Ok(()) => {
                        let snap = s.rx.borrow_and_update().clone();
                        Some((snap, s))
                    }
                    Err(_) => None,
                }
            } else {
                let event = tokio::select! {
                    changed = s.rx.changed() => Some(changed),
                    _ = tokio::time::sleep(s.heartbeat) => None,
                };
                match event {
                    Some(Ok(())) => {
                        let snap = s.rx.borrow_and_update().clone();
                        Some((snap, s))
                    }
                    Some(Err(_)) => None,
                    // Heartbeat: re-emit the current snapshot as-is.
                    None => Some((current, s)),
                }
            }
        }))
    }
}

struct Subscriber {
    rx: watch::Receiver<JobSnapshot>,
    heartbeat: Duration,
    primed: bool,
}
