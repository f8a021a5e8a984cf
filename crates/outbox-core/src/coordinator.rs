//! Connectivity-driven replay coordinator.
//!
//! The coordinator is the only component that decides when to touch the
//! network and when to defer to the queue:
//!
//! ```text
//! submit ──online──▶ AttemptingDirect ──ok──────────────▶ Idle
//!    │                     │
//!    │                     └──err──▶ Enqueuing ──▶ Idle
//!    └──offline───────────────────▶ Enqueuing ──▶ Idle
//!
//! online event ──▶ Draining: list_all → submit each, in order → clear_all ──▶ Idle
//! ```
//!
//! Every flow that touches the store holds `flow` for its whole duration, so
//! an enqueue can never land between a drain's `list_all` and `clear_all`.
//! At most one drain runs at a time; triggers that arrive mid-drain collapse
//! into a single follow-up pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::action::{ActionTarget, QueuedAction};
use crate::connectivity::{Connectivity, ConnectivitySignal, ConnectivityWatch};
use crate::error::Result;
use crate::store::QueueStore;
use crate::submit::Submitter;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    AttemptingDirect,
    Enqueuing,
    Draining,
}

/// Why an action ended up in the queue instead of being delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueReason {
    Offline,
    SubmissionFailed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Delivered,
    Queued {
        action: QueuedAction,
        reason: QueueReason,
    },
}

impl SubmitOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayFailure {
    pub action: QueuedAction,
    pub error: String,
}

/// Tally of one `drain()` call, across every pass it ran.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    pub passes: usize,
    pub attempted: usize,
    pub delivered: usize,
    /// Actions whose replay failed. They were dropped by the clear that
    /// ended their pass.
    pub failures: Vec<ReplayFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// Another drain was running; it will make one more pass on our behalf.
    AlreadyInProgress,
}

/// Notifications for consumers that render queue state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboxEvent {
    Queued {
        id: Uuid,
        target: String,
        reason: QueueReason,
    },
    Delivered {
        target: String,
    },
    DrainFinished {
        attempted: usize,
        delivered: usize,
        failed: usize,
    },
    ConnectivityChanged {
        state: Connectivity,
    },
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator {
    store: Arc<dyn QueueStore>,
    submitter: Arc<dyn Submitter>,
    signal: ConnectivitySignal,
    flow: Mutex<()>,
    draining: AtomicBool,
    redrain: AtomicBool,
    state: std::sync::Mutex<CoordinatorState>,
    events: broadcast::Sender<OutboxEvent>,
    drain_on_start: bool,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn QueueStore>,
        submitter: Arc<dyn Submitter>,
        signal: ConnectivitySignal,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            submitter,
            signal,
            flow: Mutex::new(()),
            draining: AtomicBool::new(false),
            redrain: AtomicBool::new(false),
            state: std::sync::Mutex::new(CoordinatorState::Idle),
            events,
            drain_on_start: true,
        }
    }

    /// Whether `run` drains once at startup when the signal already reads
    /// online. Defaults to `true`.
    pub fn drain_on_start(mut self, enabled: bool) -> Self {
        self.drain_on_start = enabled;
        self
    }

    pub fn signal(&self) -> &ConnectivitySignal {
        &self.signal
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(CoordinatorState::Idle)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<OutboxEvent> {
        self.events.subscribe()
    }

    /// Snapshot of pending actions, oldest first.
    pub async fn list_all(&self) -> Result<Vec<QueuedAction>> {
        self.store.list_all().await
    }

    pub async fn pending(&self) -> Result<usize> {
        self.store.len().await
    }

    fn set_state(&self, next: CoordinatorState) {
        if let Ok(mut s) = self.state.lock() {
            *s = next;
        }
    }

    fn emit(&self, event: OutboxEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // submit
    // -----------------------------------------------------------------------

    /// Accept a user action: deliver it now if online, otherwise (or if
    /// delivery fails) persist it for the next drain.
    ///
    /// Only a store failure is returned as `Err`; a failed direct attempt is
    /// reported through `SubmitOutcome::Queued`.
    pub async fn submit(
        &self,
        target: ActionTarget,
        payload: serde_json::Value,
    ) -> Result<SubmitOutcome> {
        let _flow = self.flow.lock().await;

        let reason = if self.signal.is_online() {
            self.set_state(CoordinatorState::AttemptingDirect);
            match self.submitter.submit(&target, &payload).await {
                Ok(()) => {
                    self.set_state(CoordinatorState::Idle);
                    self.emit(OutboxEvent::Delivered {
                        target: target.to_string(),
                    });
                    return Ok(SubmitOutcome::Delivered);
                }
                Err(e) => {
                    tracing::warn!(dest = %target, error = %e, "direct submission failed; queueing");
                    QueueReason::SubmissionFailed {
                        error: e.to_string(),
                    }
                }
            }
        } else {
            QueueReason::Offline
        };

        self.set_state(CoordinatorState::Enqueuing);
        let enqueued = self.store.enqueue(target, payload).await;
        self.set_state(CoordinatorState::Idle);
        let action = enqueued?;

        tracing::info!(id = %action.id, dest = %action.target, "action queued");
        self.emit(OutboxEvent::Queued {
            id: action.id,
            target: action.target.to_string(),
            reason: reason.clone(),
        });
        Ok(SubmitOutcome::Queued { action, reason })
    }

    // -----------------------------------------------------------------------
    // drain
    // -----------------------------------------------------------------------

    /// Replay every queued action in order, then clear the queue.
    ///
    /// If a drain is already running this returns
    /// `DrainOutcome::AlreadyInProgress` immediately and the running drain
    /// makes one more pass when it finishes. If `clear_all` fails the error
    /// is returned and the queue is left as it was.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        if self.draining.swap(true, Ordering::AcqRel) {
            self.redrain.store(true, Ordering::Release);
            tracing::debug!("drain already in progress; follow-up pass requested");
            return Ok(DrainOutcome::AlreadyInProgress);
        }

        let mut report = DrainReport::default();
        loop {
            if let Err(e) = self.drain_pass(&mut report).await {
                // Triggers seen during a failed pass wait for the next one.
                self.redrain.store(false, Ordering::Release);
                self.draining.store(false, Ordering::Release);
                return Err(e);
            }
            if self.redrain.swap(false, Ordering::AcqRel) {
                continue;
            }
            self.draining.store(false, Ordering::Release);
            // A trigger can land between the check above and the release.
            if self.redrain.swap(false, Ordering::AcqRel)
                && !self.draining.swap(true, Ordering::AcqRel)
            {
                continue;
            }
            break;
        }

        tracing::info!(
            passes = report.passes,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failures.len(),
            "drain finished"
        );
        self.emit(OutboxEvent::DrainFinished {
            attempted: report.attempted,
            delivered: report.delivered,
            failed: report.failures.len(),
        });
        Ok(DrainOutcome::Completed(report))
    }

    async fn drain_pass(&self, report: &mut DrainReport) -> Result<()> {
        let _flow = self.flow.lock().await;
        self.set_state(CoordinatorState::Draining);
        let result = self.replay_all(report).await;
        self.set_state(CoordinatorState::Idle);
        result
    }

    async fn replay_all(&self, report: &mut DrainReport) -> Result<()> {
        let pending = self.store.list_all().await?;
        report.passes += 1;
        if pending.is_empty() {
            tracing::debug!("queue empty; nothing to drain");
            return Ok(());
        }

        tracing::info!(count = pending.len(), "draining queued actions");
        for action in pending {
            report.attempted += 1;
            match self.submitter.submit(&action.target, &action.payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        id = %action.id,
                        dest = %action.target,
                        error = %e,
                        "replay failed; action is dropped when the queue clears"
                    );
                    report.failures.push(ReplayFailure {
                        action,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = self.store.clear_all().await {
            tracing::error!(error = %e, "clearing queue after drain failed; entries kept");
            return Err(e);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // run loop
    // -----------------------------------------------------------------------

    /// Drain on every online event until the connectivity signal is dropped.
    ///
    /// Events that arrive while a drain is running coalesce; the loop wakes
    /// once afterwards with the latest state.
    pub async fn run(&self, mut watch: ConnectivityWatch) {
        if self.drain_on_start && watch.current().is_online() {
            self.trigger_drain().await;
        }
        while let Some(state) = watch.next_change().await {
            self.emit(OutboxEvent::ConnectivityChanged { state });
            if state.is_online() {
                self.trigger_drain().await;
            }
        }
        tracing::debug!("connectivity signal closed; coordinator stopping");
    }

    /// Subscribe to the signal and run the event loop on a tokio task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let watch = this.signal.subscribe();
        tokio::spawn(async move { this.run(watch).await })
    }

    async fn trigger_drain(&self) {
        match self.drain().await {
            Ok(DrainOutcome::Completed(_)) | Ok(DrainOutcome::AlreadyInProgress) => {}
            Err(e) => {
                tracing::error!(error = %e, "drain failed; queue left for the next trigger");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
