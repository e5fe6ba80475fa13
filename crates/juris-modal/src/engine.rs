#![forbid(unsafe_code)]

//! The engine context: registry, dispatcher and focus contract behind one
//! handle.
//!
//! Hosts create a single [`ModalEngine`] with [`ModalEngine::init`], route
//! user gestures into [`ModalEngine::handle_intent`] and key events into
//! [`ModalEngine::handle_event`], call [`ModalEngine::tick`] once per frame
//! to settle asynchronous callbacks, and draw with [`ModalEngine::render`].
//!
//! # Invariants
//!
//! - Every registry mutation is followed by a focus/scroll sync before the
//!   call returns.
//! - Follow-ups from asynchronous callbacks only apply to the same open
//!   cycle of the modal that started them. A modal closed (or closed and
//!   re-opened) in the meantime drops them.
//! - Teardown runs once: on [`ModalEngine::shutdown`], or on drop.
//!
//! # Failure Modes
//!
//! - Intents for an unknown id, or that do not apply to the modal's
//!   variant, log a warning and return [`IntentOutcome::Ignored`].
//! - Callback failures surface only as [`IntentOutcome::Failed`] and an
//!   error log record.

use std::rc::Rc;

use juris_core::{ConfigError, EngineConfig, Event, LogCategory, LogLevel, LogSink, Logger};

use crate::approval::{ApprovalAction, ApprovalEntry, ApprovalInput};
use crate::callback::{Completion, Handler};
use crate::dispatch::{
    ActionDispatcher, DispatchOutcome, FollowUp, Settled, TaskContext, TaskId, Verdict,
};
use crate::focus::{FocusCoordinator, FocusHost, FocusId, HeadlessHost};
use crate::instance::{ModalInstance, ModalPatch};
use crate::registry::{ModalRegistry, OpenOutcome};
use crate::render::{ModalRenderer, ModalView, Surface, describe};
use crate::variant::{CaptureStatus, FormData, ModalVariant, WorkflowModal};
use crate::workflow::StepTransition;

/// A user gesture aimed at one modal.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalIntent {
    /// Confirmation: run `on_confirm`, close on success.
    Confirm,
    /// Run `on_cancel` if present, then close.
    Cancel,
    /// Close if the modal is closable.
    Dismiss,
    /// Form: run `on_submit(data)`, close on success.
    Submit(FormData),
    NextStep,
    PreviousStep,
    GoToStep(usize),
    /// Workflow: merge data collected by the current step.
    MergeStepData(FormData),
    /// Click on a header or footer action.
    ClickAction(String),
    Approve(ApprovalInput),
    Reject(ApprovalInput),
    RequestChanges(ApprovalInput),
    Search(String),
    /// Search: pick a result, close on success.
    Select(String),
    Save(FormData),
    /// Capture: run `on_validate` on the extracted data.
    Validate,
    /// Capture: run `on_extract` on the selected file.
    Extract,
    Export,
}

impl ModalIntent {
    /// Stable name used as `action_id` in log records.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Dismiss => "dismiss",
            Self::Submit(_) => "submit",
            Self::NextStep => "next_step",
            Self::PreviousStep => "previous_step",
            Self::GoToStep(_) => "go_to_step",
            Self::MergeStepData(_) => "merge_step_data",
            Self::ClickAction(id) => id.as_str(),
            Self::Approve(_) => "approve",
            Self::Reject(_) => "reject",
            Self::RequestChanges(_) => "request_changes",
            Self::Search(_) => "search",
            Self::Select(_) => "select",
            Self::Save(_) => "save",
            Self::Validate => "validate",
            Self::Extract => "extract",
            Self::Export => "export",
        }
    }
}

/// What [`ModalEngine::handle_intent`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// State changed or a callback succeeded.
    Applied,
    /// A callback is still running; [`ModalEngine::tick`] settles it.
    Pending(TaskId),
    /// A validation gate answered `false`.
    Blocked,
    /// A callback failed; the failure was logged.
    Failed,
    Ignored,
}

/// What [`ModalEngine::handle_event`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Closed(String),
    FocusMoved(FocusId),
    Ignored,
}

/// Modal engine context.
pub struct ModalEngine<H: FocusHost = HeadlessHost> {
    registry: ModalRegistry,
    dispatcher: ActionDispatcher,
    focus: FocusCoordinator,
    host: H,
    logger: Logger,
    config: EngineConfig,
    shut_down: bool,
}

impl<H: FocusHost> std::fmt::Debug for ModalEngine<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalEngine")
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H: FocusHost> ModalEngine<H> {
    /// Build the engine context.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`EngineConfig::validate`].
    pub fn init(config: EngineConfig, sink: Rc<dyn LogSink>, host: H) -> Result<Self, ConfigError> {
        config.validate()?;
        let logger = Logger::new(sink, &config.log_source);
        logger
            .event(LogLevel::Info, LogCategory::Lifecycle, "modal engine initialized")
            .field("max_concurrent_modals", config.max_concurrent_modals)
            .field("default_size", config.default_size.as_str())
            .emit();
        Ok(Self {
            registry: ModalRegistry::new(config.max_concurrent_modals, logger.clone()),
            dispatcher: ActionDispatcher::new(logger.clone()),
            focus: FocusCoordinator::new(logger.clone(), config.restore_focus, config.trap_focus),
            host,
            logger,
            config,
            shut_down: false,
        })
    }

    /// Close every modal and release the context.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let closed = self.registry.close_all();
        self.sync_focus();
        self.logger
            .event(LogLevel::Info, LogCategory::Lifecycle, "modal engine shut down")
            .field("closed", closed)
            .field("abandoned_tasks", self.dispatcher.pending_len())
            .emit();
    }

    // --- Accessors ---

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ModalRegistry {
        &self.registry
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Asynchronous callbacks not yet settled.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.dispatcher.pending_len()
    }

    // --- Registry operations ---

    pub fn open(&mut self, instance: ModalInstance) -> OpenOutcome {
        let outcome = self.registry.open(instance);
        self.sync_focus();
        outcome
    }

    /// Shallow-merge `patch` into `id`; `false` when `id` is not open.
    pub fn update(&mut self, id: &str, patch: ModalPatch) -> bool {
        let updated = self.registry.update(id, patch);
        if updated {
            self.sync_focus();
        }
        updated
    }

    pub fn close(&mut self, id: &str) -> bool {
        let closed = self.registry.close(id);
        if closed {
            self.sync_focus();
        }
        closed
    }

    pub fn close_all(&mut self) -> usize {
        let closed = self.registry.close_all();
        self.sync_focus();
        closed
    }

    #[must_use]
    pub fn is_open(&self, id: &str) -> bool {
        self.registry.is_open(id)
    }

    fn sync_focus(&mut self) {
        let ids = self.registry.ids();
        self.focus.sync(&ids, &mut self.host);
    }

    // --- Dispatch ---

    /// Run the `on_click` of action `action_id` on modal `modal_id`.
    pub fn click_action(&mut self, modal_id: &str, action_id: &str) -> IntentOutcome {
        self.handle_intent(modal_id, ModalIntent::ClickAction(action_id.to_string()))
    }

    /// Apply a user intent to `modal_id`.
    pub fn handle_intent(&mut self, modal_id: &str, intent: ModalIntent) -> IntentOutcome {
        let Some(instance) = self.registry.get(modal_id) else {
            self.logger
                .event(LogLevel::Warn, LogCategory::Dispatch, "intent for unknown modal ignored")
                .field("modal_id", modal_id)
                .field("intent", intent.name())
                .emit();
            return IntentOutcome::Ignored;
        };
        let ctx = TaskContext::new(modal_id, intent.name()).seq(self.registry.seq_of(modal_id));

        match (intent, &instance.variant) {
            (ModalIntent::Confirm, ModalVariant::Confirmation(c)) => {
                let completion = c.on_confirm.invoke(());
                self.run(ctx, completion, FollowUp::Close, FollowUp::Nothing)
            }
            (ModalIntent::Cancel, variant) => {
                let on_cancel = match variant {
                    ModalVariant::Confirmation(c) => c.on_cancel.clone(),
                    ModalVariant::Form(f) => f.on_cancel.clone(),
                    _ => None,
                };
                let outcome = match on_cancel {
                    Some(handler) => self.run(
                        ctx,
                        handler.invoke(()),
                        FollowUp::Nothing,
                        FollowUp::Nothing,
                    ),
                    None => IntentOutcome::Applied,
                };
                self.close(modal_id);
                match outcome {
                    IntentOutcome::Failed => IntentOutcome::Failed,
                    _ => IntentOutcome::Applied,
                }
            }
            (ModalIntent::Dismiss, _) => {
                if !instance.closable {
                    self.logger
                        .event(LogLevel::Debug, LogCategory::Close, "dismiss ignored, modal not closable")
                        .field("modal_id", modal_id)
                        .emit();
                    return IntentOutcome::Ignored;
                }
                self.close(modal_id);
                IntentOutcome::Applied
            }
            (ModalIntent::Submit(data), ModalVariant::Form(f)) => {
                let completion = f.on_submit.invoke(data);
                self.run(ctx, completion, FollowUp::Close, FollowUp::Nothing)
            }
            (ModalIntent::NextStep, ModalVariant::Workflow(_)) => {
                self.step_workflow(ctx, |w| w.machine.next())
            }
            (ModalIntent::PreviousStep, ModalVariant::Workflow(_)) => {
                self.step_workflow(ctx, |w| w.machine.previous())
            }
            (ModalIntent::GoToStep(index), ModalVariant::Workflow(_)) => {
                self.step_workflow(ctx, move |w| w.machine.go_to(index, w.can_navigate))
            }
            (ModalIntent::MergeStepData(data), ModalVariant::Workflow(_)) => {
                if let Some(ModalVariant::Workflow(w)) = self.variant_mut(modal_id) {
                    w.machine.merge_data(data);
                }
                IntentOutcome::Applied
            }
            (ModalIntent::ClickAction(action_id), _) => {
                let Some(action) = instance.find_action(&action_id).cloned() else {
                    self.logger
                        .event(LogLevel::Warn, LogCategory::Dispatch, "click on unknown action ignored")
                        .field("modal_id", modal_id)
                        .field("action_id", &action_id)
                        .emit();
                    return IntentOutcome::Ignored;
                };
                let outcome = self.dispatcher.dispatch(ctx.clone(), &action);
                self.settle(ctx, outcome)
            }
            (ModalIntent::Approve(input), ModalVariant::Approval(a)) => {
                let handler = a.on_approve.clone();
                self.review(ctx, ApprovalAction::Approved, &handler, input)
            }
            (ModalIntent::Reject(input), ModalVariant::Approval(a)) => {
                let handler = a.on_reject.clone();
                self.review(ctx, ApprovalAction::Rejected, &handler, input)
            }
            (ModalIntent::RequestChanges(input), ModalVariant::Approval(a)) => {
                let handler = a.on_request_changes.clone();
                self.review(ctx, ApprovalAction::RequestedChanges, &handler, input)
            }
            (ModalIntent::Search(query), ModalVariant::Search(s)) => {
                let handler = s.on_search.clone();
                if let Some(ModalVariant::Search(s)) = self.variant_mut(modal_id) {
                    s.query.clone_from(&query);
                }
                self.run(ctx, handler.invoke(query), FollowUp::Nothing, FollowUp::Nothing)
            }
            (ModalIntent::Select(result_id), ModalVariant::Search(s)) => {
                let completion = s.on_select.invoke(result_id);
                self.run(ctx, completion, FollowUp::Close, FollowUp::Nothing)
            }
            (ModalIntent::Save(data), ModalVariant::Capture(c)) => {
                let completion = c.on_save.invoke(data);
                self.run(ctx, completion, FollowUp::Close, FollowUp::Nothing)
            }
            (ModalIntent::Save(data), ModalVariant::Record(r)) if r.editable => {
                let Some(on_save) = r.on_save.clone() else {
                    return IntentOutcome::Ignored;
                };
                self.run(ctx, on_save.invoke(data), FollowUp::Nothing, FollowUp::Nothing)
            }
            (ModalIntent::Validate, ModalVariant::Capture(c)) => {
                let Some(on_validate) = c.on_validate.clone() else {
                    return IntentOutcome::Ignored;
                };
                let data = c.extracted.clone().unwrap_or_default();
                self.run(
                    ctx,
                    on_validate.invoke(data),
                    FollowUp::CaptureStatus(CaptureStatus::Validated),
                    FollowUp::Nothing,
                )
            }
            (ModalIntent::Extract, ModalVariant::Capture(c)) => {
                let (Some(on_extract), Some(file)) = (c.on_extract.clone(), c.file.clone()) else {
                    return IntentOutcome::Ignored;
                };
                if let Some(ModalVariant::Capture(c)) = self.variant_mut(modal_id) {
                    c.status = CaptureStatus::Extracting;
                    c.set_progress(0);
                }
                self.run(
                    ctx,
                    on_extract.invoke(file),
                    FollowUp::CaptureStatus(CaptureStatus::Extracted),
                    FollowUp::CaptureStatus(CaptureStatus::Failed),
                )
            }
            (ModalIntent::Export, ModalVariant::Analytics(a)) => {
                let Some(on_export) = a.on_export.clone() else {
                    return IntentOutcome::Ignored;
                };
                self.run(ctx, on_export.invoke(()), FollowUp::Nothing, FollowUp::Nothing)
            }
            (intent, variant) => {
                self.logger
                    .event(LogLevel::Warn, LogCategory::Dispatch, "intent does not apply to modal")
                    .field("modal_id", modal_id)
                    .field("intent", intent.name())
                    .field("type", variant.kind().as_str())
                    .emit();
                IntentOutcome::Ignored
            }
        }
    }

    fn variant_mut(&mut self, modal_id: &str) -> Option<&mut ModalVariant> {
        self.registry.get_mut(modal_id).map(|m| &mut m.variant)
    }

    fn run<T: Verdict>(
        &mut self,
        ctx: TaskContext,
        completion: Completion<T>,
        on_success: FollowUp,
        on_failure: FollowUp,
    ) -> IntentOutcome {
        let outcome = self.dispatcher.run(ctx.clone(), completion, on_success, on_failure);
        self.settle(ctx, outcome)
    }

    fn settle(&mut self, ctx: TaskContext, outcome: DispatchOutcome) -> IntentOutcome {
        match outcome {
            DispatchOutcome::Completed(follow_up) => {
                self.apply_follow_up(ctx, follow_up);
                IntentOutcome::Applied
            }
            DispatchOutcome::Failed(follow_up) => {
                self.apply_follow_up(ctx, follow_up);
                IntentOutcome::Failed
            }
            DispatchOutcome::Rejected => IntentOutcome::Blocked,
            DispatchOutcome::Pending(task) => IntentOutcome::Pending(task),
            DispatchOutcome::Skipped => IntentOutcome::Ignored,
        }
    }

    fn review(
        &mut self,
        ctx: TaskContext,
        action: ApprovalAction,
        handler: &Handler<ApprovalInput>,
        input: ApprovalInput,
    ) -> IntentOutcome {
        let ctx = ctx.category(LogCategory::Approval);
        let entry = ApprovalEntry::now(action, input.actor.clone(), input.comment.clone());
        let completion = handler.invoke(input);
        self.run(ctx, completion, FollowUp::RecordApproval(entry), FollowUp::Nothing)
    }

    /// Apply a workflow transition and run the callbacks it calls for.
    fn step_workflow(
        &mut self,
        ctx: TaskContext,
        step: impl FnOnce(&mut WorkflowModal) -> StepTransition,
    ) -> IntentOutcome {
        let ctx = ctx.category(LogCategory::Workflow);
        let Some(ModalVariant::Workflow(workflow)) = self.variant_mut(&ctx.modal_id) else {
            return IntentOutcome::Ignored;
        };
        let transition = step(&mut *workflow);
        let on_step_change = workflow.on_step_change.clone();
        let on_complete = workflow.on_complete.clone();
        let data = matches!(transition, StepTransition::Completed)
            .then(|| workflow.machine.data().clone());

        match transition {
            StepTransition::Moved { from, to } => {
                self.logger
                    .event(LogLevel::Info, LogCategory::Workflow, "workflow step changed")
                    .field("modal_id", &ctx.modal_id)
                    .field("from", from)
                    .field("to", to)
                    .emit();
                if let Some(handler) = on_step_change {
                    let ctx = TaskContext {
                        action_id: "step_change".to_string(),
                        ..ctx
                    };
                    self.run(ctx, handler.invoke(to), FollowUp::Nothing, FollowUp::Nothing);
                }
                IntentOutcome::Applied
            }
            StepTransition::Completed => {
                self.logger
                    .event(LogLevel::Info, LogCategory::Workflow, "workflow completed")
                    .field("modal_id", &ctx.modal_id)
                    .emit();
                let ctx = TaskContext {
                    action_id: "complete".to_string(),
                    ..ctx
                };
                let completion = on_complete.invoke(data.unwrap_or_default());
                self.run(ctx, completion, FollowUp::Nothing, FollowUp::Nothing)
            }
            StepTransition::Unchanged => IntentOutcome::Ignored,
            StepTransition::Blocked { step } => {
                self.logger
                    .event(LogLevel::Info, LogCategory::Workflow, "validation rejected")
                    .field("modal_id", &ctx.modal_id)
                    .field("step", step)
                    .emit();
                IntentOutcome::Blocked
            }
            StepTransition::Failed { step, error } => {
                self.logger
                    .event(LogLevel::Error, LogCategory::Workflow, "callback execution failed")
                    .field("modal_id", &ctx.modal_id)
                    .field("action_id", &ctx.action_id)
                    .field("step", step)
                    .field("error", error)
                    .emit();
                IntentOutcome::Failed
            }
            StepTransition::Validating { step, gate } => self.run(
                ctx,
                Completion::<bool>::Pending(gate),
                FollowUp::AdvanceWorkflow { step },
                FollowUp::Nothing,
            ),
        }
    }

    /// Apply a follow-up if its modal is still in the same open cycle.
    fn apply_follow_up(&mut self, ctx: TaskContext, follow_up: FollowUp) {
        if follow_up == FollowUp::Nothing {
            return;
        }
        if ctx.modal_seq.is_none() || self.registry.seq_of(&ctx.modal_id) != ctx.modal_seq {
            self.logger
                .event(LogLevel::Debug, ctx.category, "follow-up dropped, modal no longer open")
                .field("modal_id", &ctx.modal_id)
                .field("action_id", &ctx.action_id)
                .emit();
            return;
        }

        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::Close => {
                self.close(&ctx.modal_id);
            }
            FollowUp::AdvanceWorkflow { step } => {
                let ctx = TaskContext {
                    action_id: "next_step".to_string(),
                    ..ctx
                };
                self.step_workflow(ctx, move |w| w.machine.advance_from(step));
            }
            FollowUp::RecordApproval(entry) => {
                self.logger
                    .event(LogLevel::Info, LogCategory::Approval, "approval recorded")
                    .field("modal_id", &ctx.modal_id)
                    .field("action", entry.action().as_str())
                    .field("actor", entry.actor())
                    .emit();
                if let Some(ModalVariant::Approval(a)) = self.variant_mut(&ctx.modal_id) {
                    if entry.action() == ApprovalAction::Approved {
                        let next = a.current_step + 1;
                        a.set_current_step(next);
                    }
                    a.history.push(entry);
                }
            }
            FollowUp::CaptureStatus(status) => {
                if let Some(ModalVariant::Capture(c)) = self.variant_mut(&ctx.modal_id) {
                    c.status = status;
                    if status == CaptureStatus::Extracted {
                        c.set_progress(100);
                    }
                }
            }
        }
    }

    /// Poll pending callbacks once and apply the follow-ups of those that
    /// settled.
    pub fn tick(&mut self) -> Vec<Settled> {
        let settled = self.dispatcher.tick();
        for s in &settled {
            self.apply_follow_up(s.context.clone(), s.follow_up.clone());
        }
        settled
    }

    // --- Input ---

    /// Escape closes the closable top modal; Tab / Shift+Tab cycle focus
    /// inside it.
    pub fn handle_event(&mut self, event: &Event) -> EventOutcome {
        let Event::Key(key) = event else {
            return EventOutcome::Ignored;
        };
        let Some(top) = self.registry.top() else {
            return EventOutcome::Ignored;
        };

        if key.is_escape_press() {
            if !top.closable {
                return EventOutcome::Ignored;
            }
            let id = top.id.clone();
            self.close(&id);
            return EventOutcome::Closed(id);
        }
        if let Some(forward) = key.tab_direction()
            && let Some(focused) = self.focus.cycle(forward, &mut self.host)
        {
            return EventOutcome::FocusMoved(focused);
        }
        EventOutcome::Ignored
    }

    // --- Rendering ---

    /// Hand one view per open modal, bottom to top, to `renderer`.
    pub fn render(&self, renderer: &mut dyn ModalRenderer) {
        let _span = tracing::debug_span!("modal_render", count = self.registry.len()).entered();
        let top = self.registry.len().saturating_sub(1);
        let views: Vec<ModalView<'_>> = self
            .registry
            .iter()
            .enumerate()
            .map(|(layer, instance)| ModalView {
                instance,
                layer,
                is_top: layer == top,
                surface: describe(instance).unwrap_or_else(|err| {
                    self.logger
                        .event(LogLevel::Error, LogCategory::Render, "modal body failed to render")
                        .field("modal_id", &instance.id)
                        .field("type", instance.kind().as_str())
                        .field("error", &err)
                        .emit();
                    Surface::render_failed(&instance.title)
                }),
            })
            .collect();
        renderer.render(&views);
    }
}

impl<H: FocusHost> Drop for ModalEngine<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
