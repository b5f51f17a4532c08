//! Task state as reported by the task queue.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest progress still reported as queued.
pub const PENDING_MAX_PROGRESS: u8 = 30;

pub const COMPLETE_PROGRESS: u8 = 100;

/// Ordered `Pending < Running < terminal`; the three terminal states share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    #[serde(alias = "RECEIVED")]
    Pending,
    #[serde(alias = "STARTED", alias = "RETRY")]
    Running,
    Success,
    Failure,
    #[serde(alias = "REVOKED")]
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Failure | TaskState::Cancelled
        )
    }

    pub fn rank(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Success | TaskState::Failure | TaskState::Cancelled => 2,
        }
    }

    /// Nominal state for a progress value on the happy path.
    pub fn for_progress(progress: u8) -> Self {
        if progress <= PENDING_MAX_PROGRESS {
            TaskState::Pending
        } else if progress < COMPLETE_PROGRESS {
            TaskState::Running
        } else {
            TaskState::Success
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Running => "RUNNING",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
            TaskState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub state: TaskState,
    pub progress: u8,
}

impl TaskRecord {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Pending,
            progress: 0,
        }
    }
}
