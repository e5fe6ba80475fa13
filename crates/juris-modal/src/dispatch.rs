#![forbid(unsafe_code)]

//! Action dispatcher: runs consumer callbacks with failure isolation.
//!
//! Synchronous callbacks settle inside [`ActionDispatcher::run`].
//! Asynchronous ones are queued and polled by [`ActionDispatcher::tick`],
//! which the host calls once per frame. Each task carries a [`FollowUp`]
//! that the engine applies when the task succeeds (and another for when it
//! fails), so the dispatcher itself never touches the registry.
//!
//! # Invariants
//!
//! - A failing or panicking callback is logged with `modal_id`, `action_id`
//!   and `error`, and never propagates to the caller.
//! - Every queued task settles exactly once.
//! - No retries, no timeouts, no cancellation. Closing a modal does not
//!   cancel its pending tasks; their follow-ups are dropped by the engine.
//! - Disabled or loading actions are not dispatched.

use std::fmt;
use std::future::Future;
use std::task::{Context, Poll, Waker};

use juris_core::{LogCategory, LogLevel, Logger};

use crate::approval::ApprovalEntry;
use crate::callback::{CallbackError, CallbackResult, Completion, LocalFuture, isolate};
use crate::variant::{CaptureStatus, ModalAction};

/// Identifier of a queued asynchronous task.
pub type TaskId = u64;

/// Where a callback came from, for logging and follow-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub modal_id: String,
    /// Sequence number of the modal when the task started.
    pub modal_seq: Option<u64>,
    pub action_id: String,
    pub category: LogCategory,
}

impl TaskContext {
    pub fn new(modal_id: impl Into<String>, action_id: impl Into<String>) -> Self {
        Self {
            modal_id: modal_id.into(),
            modal_seq: None,
            action_id: action_id.into(),
            category: LogCategory::Dispatch,
        }
    }

    #[must_use]
    pub fn seq(mut self, seq: Option<u64>) -> Self {
        self.modal_seq = seq;
        self
    }

    #[must_use]
    pub fn category(mut self, category: LogCategory) -> Self {
        self.category = category;
        self
    }
}

/// State change to apply to the originating modal once a task settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Nothing,
    Close,
    /// Leave workflow step `step` (its gate passed).
    AdvanceWorkflow {
        step: usize,
    },
    RecordApproval(ApprovalEntry),
    CaptureStatus(CaptureStatus),
}

/// Result of [`ActionDispatcher::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Succeeded synchronously; apply the follow-up now.
    Completed(FollowUp),
    /// A gate answered `false`.
    Rejected,
    /// Failed synchronously; apply the failure follow-up now.
    Failed(FollowUp),
    Pending(TaskId),
    /// Not run (disabled or loading action).
    Skipped,
}

/// A task that settled during [`ActionDispatcher::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub task: TaskId,
    pub context: TaskContext,
    pub follow_up: FollowUp,
}

/// Callback outputs the dispatcher understands.
///
/// `()` always passes; `bool` is a gate verdict.
pub trait Verdict: 'static {
    fn passed(&self) -> bool;
}

impl Verdict for () {
    fn passed(&self) -> bool {
        true
    }
}

impl Verdict for bool {
    fn passed(&self) -> bool {
        *self
    }
}

struct PendingTask {
    id: TaskId,
    context: TaskContext,
    future: LocalFuture<CallbackResult<bool>>,
    on_success: FollowUp,
    on_failure: FollowUp,
}

/// Runs callbacks and tracks the asynchronous ones.
pub struct ActionDispatcher {
    pending: Vec<PendingTask>,
    next_task: TaskId,
    logger: Logger,
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("pending", &self.pending.len())
            .field("next_task", &self.next_task)
            .finish()
    }
}

impl ActionDispatcher {
    pub fn new(logger: Logger) -> Self {
        Self {
            pending: Vec::new(),
            next_task: 1,
            logger,
        }
    }

    /// Number of tasks still running.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Run an action's `on_click`.
    pub fn dispatch(&mut self, context: TaskContext, action: &ModalAction) -> DispatchOutcome {
        if !action.is_actionable() {
            self.logger
                .event(LogLevel::Debug, LogCategory::Dispatch, "action not dispatched")
                .field("modal_id", &context.modal_id)
                .field("action_id", &action.id)
                .field("disabled", action.disabled)
                .field("loading", action.loading)
                .emit();
            return DispatchOutcome::Skipped;
        }
        let completion = action.on_click.invoke(());
        self.run(context, completion, FollowUp::Nothing, FollowUp::Nothing)
    }

    /// Settle `completion` now, or queue it when it is still pending.
    pub fn run<T: Verdict>(
        &mut self,
        context: TaskContext,
        completion: Completion<T>,
        on_success: FollowUp,
        on_failure: FollowUp,
    ) -> DispatchOutcome {
        match completion {
            Completion::Ready(Ok(value)) if value.passed() => {
                self.log_success(&context);
                DispatchOutcome::Completed(on_success)
            }
            Completion::Ready(Ok(_)) => {
                self.log_rejected(&context);
                DispatchOutcome::Rejected
            }
            Completion::Ready(Err(error)) => {
                self.log_failure(&context, &error);
                DispatchOutcome::Failed(on_failure)
            }
            Completion::Pending(future) => {
                let id = self.next_task;
                self.next_task += 1;
                self.logger
                    .event(LogLevel::Debug, context.category, "callback pending")
                    .field("modal_id", &context.modal_id)
                    .field("action_id", &context.action_id)
                    .field("task", id)
                    .emit();
                self.pending.push(PendingTask {
                    id,
                    context,
                    future: Box::pin(async move { future.await.map(|v| v.passed()) }),
                    on_success,
                    on_failure,
                });
                DispatchOutcome::Pending(id)
            }
        }
    }

    /// Poll every pending task once and return those that settled with a
    /// follow-up to apply.
    ///
    /// Rejected gates settle without a follow-up and are not returned.
    pub fn tick(&mut self) -> Vec<Settled> {
        let mut cx = Context::from_waker(Waker::noop());
        let tasks = std::mem::take(&mut self.pending);
        let mut settled = Vec::new();

        for mut task in tasks {
            let polled = isolate(|| task.future.as_mut().poll(&mut cx));
            let follow_up = match polled {
                Ok(Poll::Pending) => {
                    self.pending.push(task);
                    continue;
                }
                Ok(Poll::Ready(Ok(true))) => {
                    self.log_success(&task.context);
                    task.on_success
                }
                Ok(Poll::Ready(Ok(false))) => {
                    self.log_rejected(&task.context);
                    continue;
                }
                Ok(Poll::Ready(Err(error))) | Err(error) => {
                    self.log_failure(&task.context, &error);
                    task.on_failure
                }
            };
            settled.push(Settled {
                task: task.id,
                context: task.context,
                follow_up,
            });
        }
        settled
    }

    fn log_success(&self, context: &TaskContext) {
        self.logger
            .event(LogLevel::Debug, context.category, "callback completed")
            .field("modal_id", &context.modal_id)
            .field("action_id", &context.action_id)
            .emit();
    }

    fn log_rejected(&self, context: &TaskContext) {
        self.logger
            .event(LogLevel::Info, context.category, "validation rejected")
            .field("modal_id", &context.modal_id)
            .field("action_id", &context.action_id)
            .emit();
    }

    fn log_failure(&self, context: &TaskContext, error: &CallbackError) {
        self.logger
            .event(LogLevel::Error, context.category, "callback execution failed")
            .field("modal_id", &context.modal_id)
            .field("action_id", &context.action_id)
            .field("error", error)
            .emit();
    }
}
