//! MovePhase transitions.
//!
//! IDLE → ISSUED → WATCHING → {DONE, TIMED_OUT, INTERLOCKED, CANCELLED}.
//! An interlock veto short-circuits IDLE → INTERLOCKED with no writes,
//! or ISSUED → INTERLOCKED if it trips before the writes go out.
//! CANCELLED is reachable from every non-terminal phase. Terminal phases
//! accept nothing.

/// Phase of one move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MovePhase {
    /// Created, not yet checked.
    #[default]
    Idle,
    /// Interlock passed, writes queued.
    Issued,
    /// Writes done, deadline running.
    Watching,
    /// Aggregate state reached the target.
    Done,
    /// Deadline elapsed first.
    TimedOut,
    /// Interlock vetoed or tripped during the move.
    Interlocked,
    /// Cancelled by the caller or superseded.
    Cancelled,
}

impl MovePhase {
    /// Whether the move has finished.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::TimedOut | Self::Interlocked | Self::Cancelled
        )
    }

    /// Apply `event` to this phase.
    pub fn on(self, event: MoveEvent) -> PhaseTransition {
        use MoveEvent::*;
        use MovePhase::*;

        if self.is_terminal() {
            return PhaseTransition::Rejected("move already finished");
        }

        match (self, event) {
            (_, Cancel) => PhaseTransition::Ok(Cancelled),

            (Idle, InterlockVeto) => PhaseTransition::Ok(Interlocked),
            (Idle, Requested) => PhaseTransition::Ok(Issued),

            (Issued, CommandsIssued) => PhaseTransition::Ok(Watching),
            (Issued, InterlockVeto) => PhaseTransition::Ok(Interlocked),

            (Watching, TargetReached) => PhaseTransition::Ok(Done),
            (Watching, DeadlineElapsed) => PhaseTransition::Ok(TimedOut),
            (Watching, InterlockTripped) => PhaseTransition::Ok(Interlocked),

            (Idle, _) => PhaseTransition::Rejected("move not yet requested"),
            (Issued, _) => PhaseTransition::Rejected("commands not yet issued"),
            (Watching, _) => PhaseTransition::Rejected("move already watching"),
            _ => PhaseTransition::Rejected("invalid move transition"),
        }
    }
}

/// Event that can trigger a MovePhase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveEvent {
    /// Interlock evaluated clear; writes queued.
    Requested,
    /// Interlock evaluated tripped before any write.
    InterlockVeto,
    /// All writes attempted.
    CommandsIssued,
    /// Aggregate state equals the target.
    TargetReached,
    /// Deadline elapsed.
    DeadlineElapsed,
    /// Interlock tripped while watching.
    InterlockTripped,
    /// Cancelled or superseded.
    Cancel,
}

/// Result of a phase transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTransition {
    /// Transition accepted - new phase.
    Ok(MovePhase),
    /// Transition rejected - reason.
    Rejected(&'static str),
}
