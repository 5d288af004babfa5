//! PendingMove: the in-flight record of one move request.
//!
//! Owned by the device runtime under its critical section. At most one
//! exists per device. Finishing a move publishes the outcome to every
//! `MoveStatus` clone and disarms the deadline timer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dal_common::signal::StateLabel;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use super::handle::MoveStatus;
use super::phase::{MoveEvent, MovePhase, PhaseTransition};
use crate::error::{MoveError, MoveOutcome};

/// Move identifier. Unique across every device in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoveId(pub u64);

impl MoveId {
    /// Allocate the next identifier.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// In-flight move record.
#[derive(Debug)]
pub struct PendingMove {
    id: MoveId,
    target: StateLabel,
    phase: MovePhase,
    timeout: Duration,
    requested_at: Instant,
    timer: Option<AbortHandle>,
    outcome: watch::Sender<Option<MoveOutcome>>,
}

impl PendingMove {
    /// New move in `Idle`, plus the caller's handle.
    pub(crate) fn new(
        id: MoveId,
        device: Arc<str>,
        target: StateLabel,
        timeout: Duration,
    ) -> (Self, MoveStatus) {
        let (outcome, receiver) = watch::channel(None);
        let status = MoveStatus::new(id, device, target.clone(), receiver);
        let pending = Self {
            id,
            target,
            phase: MovePhase::Idle,
            timeout,
            requested_at: Instant::now(),
            timer: None,
            outcome,
        };
        (pending, status)
    }

    /// Move identifier.
    #[inline]
    pub fn id(&self) -> MoveId {
        self.id
    }

    /// Requested target.
    #[inline]
    pub fn target(&self) -> &StateLabel {
        &self.target
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> MovePhase {
        self.phase
    }

    /// Deadline length, counted from entering `Watching`.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since the request was made.
    pub fn elapsed(&self) -> Duration {
        self.requested_at.elapsed()
    }

    /// Apply a non-terminal event.
    pub(crate) fn advance(&mut self, event: MoveEvent) -> PhaseTransition {
        let transition = self.phase.on(event);
        match transition {
            PhaseTransition::Ok(next) if !next.is_terminal() => self.phase = next,
            PhaseTransition::Ok(_) => {
                return PhaseTransition::Rejected("terminal events must carry an outcome");
            }
            PhaseTransition::Rejected(_) => {}
        }
        transition
    }

    /// Attach the deadline timer task.
    pub(crate) fn arm_timer(&mut self, timer: AbortHandle) {
        if let Some(previous) = self.timer.replace(timer) {
            previous.abort();
        }
    }

    /// Apply a terminal event and publish `outcome`.
    ///
    /// Returns `false` (and publishes nothing) if the event is not a valid
    /// terminal transition from the current phase.
    pub(crate) fn finish(&mut self, event: MoveEvent, outcome: MoveOutcome) -> bool {
        match self.phase.on(event) {
            PhaseTransition::Ok(next) if next.is_terminal() => {
                self.phase = next;
                if let Some(timer) = self.timer.take() {
                    timer.abort();
                }
                self.outcome.send_replace(Some(outcome));
                true
            }
            _ => false,
        }
    }
}

impl Drop for PendingMove {
    fn drop(&mut self) {
        if !self.phase.is_terminal() {
            let target = self.target.clone();
            self.finish(MoveEvent::Cancel, Err(MoveError::Cancelled { target }));
        }
    }
}
