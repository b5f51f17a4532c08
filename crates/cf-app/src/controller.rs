//! Async task controller: one per session, owns the lifecycle and talks to
//! the backend.

use std::sync::Arc;
use std::time::Duration;

use cf_project::{CalculationRequest, validate_request};
use cf_results::ResultDocument;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::backend::TaskBackend;
use crate::error::{AppError, AppResult};
use crate::lifecycle::{TaskLifecycle, TaskPhase, TickDecision, TickOutcome};
use crate::progress::TaskEvent;
use crate::schedule::{self, PollExit, PollHandle};
use crate::task::{TaskRecord, TaskState};

/// Timer settings for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Give up (without touching the task) after this many failed polls in a row.
    pub max_consecutive_failures: Option<u32>,
}

impl PollOptions {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_consecutive_failures: None,
        }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::every(Duration::from_millis(800))
    }
}

pub struct TaskController<B: TaskBackend + ?Sized> {
    backend: Arc<B>,
    lifecycle: TaskLifecycle,
    request: Option<CalculationRequest>,
}

impl<B: TaskBackend + ?Sized> std::fmt::Debug for TaskController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskController")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl<B: TaskBackend + ?Sized> TaskController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            lifecycle: TaskLifecycle::new(),
            request: None,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn phase(&self) -> &TaskPhase {
        self.lifecycle.phase()
    }

    pub fn record(&self) -> Option<&TaskRecord> {
        self.lifecycle.record()
    }

    /// Request behind the current task, when it was submitted by this controller.
    pub fn request(&self) -> Option<&CalculationRequest> {
        self.request.as_ref()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&TaskEvent) + Send + 'static) {
        self.lifecycle.subscribe(subscriber);
    }

    /// Validate and submit. On any error the lifecycle is left as it was.
    #[instrument(skip_all, fields(strategy = %request.calculation_strategy))]
    pub async fn submit(&mut self, request: &CalculationRequest) -> AppResult<String> {
        validate_request(request)?;
        let response = self.backend.submit_task(request).await?;
        info!(task_id = %response.task_id, "task submitted");

        self.lifecycle.begin(response.task_id.clone());
        self.request = Some(request.clone());
        Ok(response.task_id)
    }

    /// Track a task that was submitted elsewhere.
    pub fn attach(&mut self, task_id: impl Into<String>) {
        self.lifecycle.begin(task_id);
        self.request = None;
    }

    pub async fn poll_once(&mut self) -> AppResult<TickOutcome> {
        let task_id = match self.lifecycle.next_tick() {
            TickDecision::Poll(task_id) => task_id,
            TickDecision::Stop => {
                return Ok(match self.lifecycle.phase() {
                    TaskPhase::Finished(record) => TickOutcome::Terminal(record.clone()),
                    _ => TickOutcome::Idle,
                });
            }
        };

        match self.backend.poll_task(&task_id).await {
            Ok(response) => self.lifecycle.apply_poll(response),
            Err(err) => Ok(self.lifecycle.poll_failed(err.to_string())),
        }
    }

    /// Ask the backend to cancel the running task. Returns whether the
    /// backend acknowledged; the state change shows up on the next tick.
    pub async fn cancel(&mut self) -> AppResult<bool> {
        let task_id = self
            .lifecycle
            .active_task()
            .map(str::to_string)
            .ok_or(AppError::NoActiveTask)?;

        info!(task_id = %task_id, "requesting cancel");
        let response = self.backend.cancel_task(&task_id).await?;
        if !response.acknowledged {
            warn!(task_id = %task_id, "cancel not acknowledged");
            return Ok(false);
        }
        Ok(self.lifecycle.cancel_acknowledged())
    }

    pub async fn fetch_result(&self) -> AppResult<ResultDocument> {
        let record = self.record().ok_or(AppError::NoActiveTask)?;
        if !matches!(self.phase(), TaskPhase::Finished(_)) || record.state != TaskState::Success {
            return Err(AppError::ResultNotReady {
                state: record.state,
            });
        }
        Ok(self.backend.fetch_result(&record.task_id).await?)
    }

    pub fn reset(&mut self) -> AppResult<()> {
        self.lifecycle.reset()?;
        self.request = None;
        info!("task controller reset");
        Ok(())
    }

    /// Poll on a fixed interval until the task ends or `stop` fires.
    pub async fn run_until_terminal(
        &mut self,
        options: &PollOptions,
        stop: &CancellationToken,
    ) -> AppResult<PollExit> {
        schedule::drive(self, options, stop, None).await
    }
}

impl<B: TaskBackend + ?Sized + 'static> TaskController<B> {
    /// Move the controller into a background poller.
    pub fn start_polling(self, options: PollOptions) -> PollHandle<B> {
        PollHandle::spawn(self, options)
    }
}
