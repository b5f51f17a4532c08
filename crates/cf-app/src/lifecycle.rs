//! Task lifecycle state machine.
//!
//! Pure and synchronous: the async controller feeds it backend responses
//! and asks it what to do on the next timer tick. All ordering rules
//! (monotonic progress, no state regression, cancel observed on the next
//! tick) live here so they can be tested without a runtime.

use tracing::{debug, info, warn};

use crate::backend::PollResponse;
use crate::error::{AppError, AppResult};
use crate::progress::TaskEvent;
use crate::task::{COMPLETE_PROGRESS, TaskRecord, TaskState};

pub type Subscriber = Box<dyn FnMut(&TaskEvent) + Send>;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskPhase {
    Idle,
    Submitted(String),
    Polling(TaskRecord),
    Finished(TaskRecord),
}

impl TaskPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TaskPhase::Idle => "idle",
            TaskPhase::Submitted(_) => "submitted",
            TaskPhase::Polling(_) => "polling",
            TaskPhase::Finished(_) => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickDecision {
    Poll(String),
    Stop,
}

/// What a tick did to the record.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue(TaskRecord),
    Terminal(TaskRecord),
    /// The round trip failed; the record is unchanged and polling goes on.
    PollFailed(String),
    /// Nothing to poll.
    Idle,
}

impl TickOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickOutcome::Terminal(_))
    }
}

pub struct TaskLifecycle {
    phase: TaskPhase,
    cancel_pending: bool,
    subscribers: Vec<Subscriber>,
}

impl Default for TaskLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLifecycle")
            .field("phase", &self.phase)
            .field("cancel_pending", &self.cancel_pending)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl TaskLifecycle {
    pub fn new() -> Self {
        Self {
            phase: TaskPhase::Idle,
            cancel_pending: false,
            subscribers: Vec::new(),
        }
    }

    pub fn phase(&self) -> &TaskPhase {
        &self.phase
    }

    pub fn record(&self) -> Option<&TaskRecord> {
        match &self.phase {
            TaskPhase::Polling(record) | TaskPhase::Finished(record) => Some(record),
            TaskPhase::Idle | TaskPhase::Submitted(_) => None,
        }
    }

    /// Id of the task that is still being tracked.
    pub fn active_task(&self) -> Option<&str> {
        match &self.phase {
            TaskPhase::Submitted(id) => Some(id),
            TaskPhase::Polling(record) => Some(&record.task_id),
            TaskPhase::Idle | TaskPhase::Finished(_) => None,
        }
    }

    pub fn cancel_pending(&self) -> bool {
        self.cancel_pending
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&TaskEvent) + Send + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    fn emit(&mut self, event: TaskEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
    }

    /// Start tracking `task_id`. Any task still in flight is abandoned.
    pub fn begin(&mut self, task_id: impl Into<String>) {
        let task_id = task_id.into();
        if let Some(previous) = self.active_task().map(str::to_string) {
            warn!(task_id = %previous, "abandoning unfinished task");
            self.emit(TaskEvent::Abandoned { task_id: previous });
        }
        self.cancel_pending = false;

        self.phase = TaskPhase::Submitted(task_id.clone());
        self.emit(TaskEvent::Submitted {
            task_id: task_id.clone(),
        });

        let record = TaskRecord::new(task_id);
        self.phase = TaskPhase::Polling(record.clone());
        self.emit(TaskEvent::Updated(record));
    }

    pub fn next_tick(&mut self) -> TickDecision {
        let TaskPhase::Polling(record) = &self.phase else {
            return TickDecision::Stop;
        };
        if !self.cancel_pending {
            return TickDecision::Poll(record.task_id.clone());
        }

        let finished = TaskRecord {
            state: TaskState::Cancelled,
            ..record.clone()
        };
        self.cancel_pending = false;
        self.finish(finished);
        TickDecision::Stop
    }

    pub fn apply_poll(&mut self, response: PollResponse) -> AppResult<TickOutcome> {
        let TaskPhase::Polling(current) = &self.phase else {
            return Err(AppError::InvalidTransition {
                from: self.phase.name(),
                to: "polling",
            });
        };

        let reported = response.progress.min(COMPLETE_PROGRESS);
        let mut next = TaskRecord {
            task_id: current.task_id.clone(),
            state: current.state,
            progress: current.progress.max(reported),
        };
        if response.state.rank() >= current.state.rank() {
            next.state = response.state;
        } else {
            debug!(
                task_id = %next.task_id,
                reported = %response.state,
                current = %current.state,
                "ignoring regressing state"
            );
        }

        if next.state.is_terminal() {
            if next.state == TaskState::Success {
                next.progress = COMPLETE_PROGRESS;
            }
            self.finish(next.clone());
            return Ok(TickOutcome::Terminal(next));
        }

        if next.state != current.state {
            info!(task_id = %next.task_id, state = %next.state, "task state changed");
        }
        self.phase = TaskPhase::Polling(next.clone());
        self.emit(TaskEvent::Updated(next.clone()));
        Ok(TickOutcome::Continue(next))
    }

    pub fn poll_failed(&mut self, message: impl Into<String>) -> TickOutcome {
        let message = message.into();
        if let Some(task_id) = self.active_task().map(str::to_string) {
            warn!(task_id = %task_id, error = %message, "status poll failed");
            self.emit(TaskEvent::PollFailed {
                task_id,
                message: message.clone(),
            });
        }
        TickOutcome::PollFailed(message)
    }

    /// Returns `false` when there is no running task to cancel (it may have
    /// finished between the request and the acknowledgement).
    pub fn cancel_acknowledged(&mut self) -> bool {
        let TaskPhase::Polling(record) = &self.phase else {
            return false;
        };
        let task_id = record.task_id.clone();
        info!(task_id = %task_id, "cancel acknowledged");
        self.cancel_pending = true;
        self.emit(TaskEvent::CancelAcknowledged { task_id });
        true
    }

    pub fn reset(&mut self) -> AppResult<()> {
        match self.phase {
            TaskPhase::Idle | TaskPhase::Finished(_) => {
                self.phase = TaskPhase::Idle;
                self.cancel_pending = false;
                self.emit(TaskEvent::Reset);
                Ok(())
            }
            TaskPhase::Submitted(_) | TaskPhase::Polling(_) => Err(AppError::InvalidTransition {
                from: self.phase.name(),
                to: "idle",
            }),
        }
    }

    fn finish(&mut self, record: TaskRecord) {
        info!(
            task_id = %record.task_id,
            state = %record.state,
            progress = record.progress,
            "task finished"
        );
        self.phase = TaskPhase::Finished(record.clone());
        self.emit(TaskEvent::Finished(record));
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = TaskState> {
        prop_oneof![
            Just(TaskState::Pending),
            Just(TaskState::Running),
            Just(TaskState::Success),
            Just(TaskState::Failure),
        ]
    }

    proptest! {
        #[test]
        fn record_is_monotonic(
            responses in prop::collection::vec((any_state(), 0u8..=120), 1..20)
        ) {
            let mut lc = TaskLifecycle::new();
            lc.begin("t");
            let mut last = lc.record().cloned().unwrap();
            for (state, progress) in responses {
                if lc.apply_poll(PollResponse { state, progress }).is_err() {
                    break;
                }
                let now = lc.record().cloned().unwrap();
                prop_assert!(now.progress >= last.progress);
                prop_assert!(now.progress <= 100);
                prop_assert!(now.state.rank() >= last.state.rank());
                last = now;
            }
        }
    }
}
