use crate::task::TaskRecord;

/// Notification sent to lifecycle subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// The backend accepted a request.
    Submitted { task_id: String },
    /// A poll tick changed (or re-confirmed) the record.
    Updated(TaskRecord),
    /// A poll round trip failed; the record is unchanged.
    PollFailed { task_id: String, message: String },
    /// The backend acknowledged a cancel; observed on the next tick.
    CancelAcknowledged { task_id: String },
    /// Terminal state reached; polling stops.
    Finished(TaskRecord),
    /// A non-terminal task was dropped in favour of a new one.
    Abandoned { task_id: String },
    Reset,
}

impl TaskEvent {
    pub fn label(&self) -> &'static str {
        match self {
            TaskEvent::Submitted { .. } => "submitted",
            TaskEvent::Updated(_) => "updated",
            TaskEvent::PollFailed { .. } => "poll failed",
            TaskEvent::CancelAcknowledged { .. } => "cancel acknowledged",
            TaskEvent::Finished(_) => "finished",
            TaskEvent::Abandoned { .. } => "abandoned",
            TaskEvent::Reset => "reset",
        }
    }

    pub fn record(&self) -> Option<&TaskRecord> {
        match self {
            TaskEvent::Updated(record) | TaskEvent::Finished(record) => Some(record),
            _ => None,
        }
    }
}
