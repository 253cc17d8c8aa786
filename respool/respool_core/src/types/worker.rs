//! Worker lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a worker in its single pass through the pool.
///
/// A worker moves strictly forward through
/// `WaitingForResource -> Running -> Releasing -> Done`; no state is
/// skipped and there is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Blocked until the pool hands out a resource.
    WaitingForResource,

    /// Holding a resource and doing work with it.
    Running,

    /// Handing the resource back to the pool.
    Releasing,

    /// Finished; the resource has been returned.
    Done,
}

impl WorkerState {
    /// The state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingForResource => Some(Self::Running),
            Self::Running => Some(Self::Releasing),
            Self::Releasing => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Check whether a worker in this state may move to `to`.
    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForResource => write!(f, "WAITING_FOR_RESOURCE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Releasing => write!(f, "RELEASING"),
            Self::Done => write!(f, "DONE"),
        }
    }
}
