//! Caller-side completion handle.

use std::sync::Arc;

use dal_common::signal::StateLabel;
use tokio::sync::watch;

use super::pending::MoveId;
use crate::error::{MoveError, MoveOutcome};

/// Awaitable handle to one move request.
///
/// Cheap to clone; every clone observes the same outcome. Returned by
/// `Device::move_to` without blocking.
#[derive(Debug, Clone)]
pub struct MoveStatus {
    id: MoveId,
    device: Arc<str>,
    target: StateLabel,
    outcome: watch::Receiver<Option<MoveOutcome>>,
}

impl MoveStatus {
    pub(crate) fn new(
        id: MoveId,
        device: Arc<str>,
        target: StateLabel,
        outcome: watch::Receiver<Option<MoveOutcome>>,
    ) -> Self {
        Self {
            id,
            device,
            target,
            outcome,
        }
    }

    /// Move identifier, unique per device.
    #[inline]
    pub fn id(&self) -> MoveId {
        self.id
    }

    /// Owning device name.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Requested target.
    pub fn target(&self) -> &StateLabel {
        &self.target
    }

    /// Terminal outcome, or `None` while the move is in flight.
    pub fn outcome(&self) -> Option<MoveOutcome> {
        self.outcome.borrow().clone()
    }

    /// Whether the move has finished, successfully or not.
    pub fn is_done(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Whether the move finished at its target.
    pub fn success(&self) -> bool {
        matches!(*self.outcome.borrow(), Some(Ok(_)))
    }

    /// Wait for the terminal outcome.
    ///
    /// If the device is dropped before the move finishes the outcome is
    /// `MoveError::Cancelled`.
    pub async fn wait(&self) -> MoveOutcome {
        let mut outcome = self.outcome.clone();
        let finished = match outcome.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        finished.unwrap_or_else(|| {
            Err(MoveError::Cancelled {
                target: self.target.clone(),
            })
        })
    }
}
