//! Cancellable background polling.
//!
//! The poller owns its [`TaskController`]; a new task can only be submitted
//! once the handle has been finished and the controller handed back.

use std::future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::{BackendError, TaskBackend};
use crate::controller::{PollOptions, TaskController};
use crate::error::{AppError, AppResult};
use crate::lifecycle::TickOutcome;
use crate::task::TaskRecord;

/// Why a polling loop returned.
#[derive(Debug, Clone, PartialEq)]
pub enum PollExit {
    Terminal(TaskRecord),
    /// Stopped from outside; the task itself was left alone.
    Stopped,
    /// Nothing was being tracked.
    Idle,
}

pub(crate) enum PollCommand {
    Cancel {
        reply: oneshot::Sender<AppResult<bool>>,
    },
}

/// Drive `controller` on `options.interval` until a terminal state, `stop`,
/// or too many failed polls in a row. Commands are handled between ticks.
pub(crate) async fn drive<B: TaskBackend + ?Sized>(
    controller: &mut TaskController<B>,
    options: &PollOptions,
    stop: &CancellationToken,
    mut commands: Option<&mut mpsc::UnboundedReceiver<PollCommand>>,
) -> AppResult<PollExit> {
    let mut ticker = time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; polls start one interval in.
    ticker.tick().await;

    let mut failures = 0u32;
    loop {
        let command = async {
            match commands.as_deref_mut() {
                Some(rx) => rx.recv().await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                debug!("poll loop stopped");
                return Ok(PollExit::Stopped);
            }
            Some(command) = command => {
                match command {
                    PollCommand::Cancel { reply } => {
                        let result = controller.cancel().await;
                        // The requester may have gone away; nothing to do then.
                        let _ = reply.send(result);
                    }
                }
            }
            _ = ticker.tick() => {
                match controller.poll_once().await? {
                    TickOutcome::Continue(_) => failures = 0,
                    TickOutcome::Terminal(record) => return Ok(PollExit::Terminal(record)),
                    TickOutcome::Idle => return Ok(PollExit::Idle),
                    TickOutcome::PollFailed(message) => {
                        failures += 1;
                        if options.max_consecutive_failures.is_some_and(|limit| failures >= limit) {
                            warn!(failures, "giving up after repeated poll failures");
                            return Err(BackendError::Poll { message }.into());
                        }
                    }
                }
            }
        }
    }
}

/// What a finished poller hands back.
pub struct PollOutcome<B: TaskBackend + ?Sized> {
    pub controller: TaskController<B>,
    pub exit: AppResult<PollExit>,
}

pub struct PollHandle<B: TaskBackend + ?Sized + 'static> {
    stop: CancellationToken,
    commands: mpsc::UnboundedSender<PollCommand>,
    join: Option<JoinHandle<PollOutcome<B>>>,
}

impl<B: TaskBackend + ?Sized + 'static> PollHandle<B> {
    pub(crate) fn spawn(mut controller: TaskController<B>, options: PollOptions) -> Self {
        let stop = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = stop.clone();

        let join = tokio::spawn(async move {
            let exit = drive(&mut controller, &options, &token, Some(&mut rx)).await;
            PollOutcome { controller, exit }
        });

        Self {
            stop,
            commands: tx,
            join: Some(join),
        }
    }

    /// Ask the poller to cancel the task. Handled between ticks; the
    /// cancelled state is reported on the tick after acknowledgement.
    pub async fn request_cancel(&self) -> AppResult<bool> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(PollCommand::Cancel { reply })
            .map_err(|_| AppError::NoActiveTask)?;
        response.await.map_err(|_| AppError::NoActiveTask)?
    }

    /// Stop the timer. Safe to call more than once.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the poller to end. Cancel-safe: dropping the future
    /// leaves the poller running and the handle usable.
    pub async fn join(&mut self) -> AppResult<PollOutcome<B>> {
        let join = self
            .join
            .as_mut()
            .ok_or_else(|| AppError::Schedule("poller already joined".to_string()))?;
        let result = join.await;
        self.join = None;
        result.map_err(|err| AppError::Schedule(err.to_string()))
    }

    /// Wait for the poller to end on its own.
    pub async fn wait(mut self) -> AppResult<PollOutcome<B>> {
        self.join().await
    }

    /// Stop if still running and hand the controller back.
    pub async fn finish(self) -> AppResult<PollOutcome<B>> {
        self.stop();
        self.wait().await
    }
}

impl<B: TaskBackend + ?Sized + 'static> Drop for PollHandle<B> {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
