#![forbid(unsafe_code)]

//! Step state machine embedded in workflow modals.
//!
//! States are the step indices `0..N`, plus an implicit terminal state
//! entered when `next()` is called on the last step. The machine never runs
//! step-change or completion callbacks itself; it reports a
//! [`StepTransition`] and the engine runs the callbacks through the
//! dispatcher.
//!
//! # Invariants
//!
//! - `current_step() < len()` at all times.
//! - `previous()` at step 0 is a no-op.
//! - `next()` on the last step reports `Completed` exactly once; afterwards
//!   every transition is `Unchanged`.
//! - A step's validation gate must pass before `next()` leaves that step.
//!   A failing, erroring, or panicking gate leaves `current_step` unchanged.
//!
//! # Failure Modes
//!
//! - Constructing a machine with no steps returns [`WorkflowError::NoSteps`].
//! - `go_to()` outside `0..N` is ignored.

use crate::callback::{CallbackError, Completion, Handler, LocalFuture, CallbackResult};
use crate::render::BodyRenderer;
use crate::variant::FormData;

/// One stage of a workflow.
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub body: BodyRenderer,
    /// Gate consulted before `next()` leaves this step.
    pub validate: Option<Handler<FormData, bool>>,
    pub is_complete: bool,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: BodyRenderer) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            body,
            validate: None,
            is_complete: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn validate(mut self, gate: Handler<FormData, bool>) -> Self {
        self.validate = Some(gate);
        self
    }
}

/// Errors from building a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowError {
    NoSteps,
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSteps => write!(f, "a workflow needs at least one step"),
        }
    }
}

impl std::error::Error for WorkflowError {}

/// Result of a transition request.
pub enum StepTransition {
    Moved { from: usize, to: usize },
    /// `next()` left the last step; run the completion callback.
    Completed,
    Unchanged,
    /// The gate returned `false`.
    Blocked { step: usize },
    /// The gate errored or panicked.
    Failed { step: usize, error: CallbackError },
    /// The gate is asynchronous; apply [`WorkflowMachine::advance_from`]
    /// with `step` once it resolves to `true`.
    Validating {
        step: usize,
        gate: LocalFuture<CallbackResult<bool>>,
    },
}

impl std::fmt::Debug for StepTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Moved { from, to } => f
                .debug_struct("Moved")
                .field("from", from)
                .field("to", to)
                .finish(),
            Self::Completed => f.write_str("Completed"),
            Self::Unchanged => f.write_str("Unchanged"),
            Self::Blocked { step } => f.debug_struct("Blocked").field("step", step).finish(),
            Self::Failed { step, error } => f
                .debug_struct("Failed")
                .field("step", step)
                .field("error", error)
                .finish(),
            Self::Validating { step, .. } => {
                f.debug_struct("Validating").field("step", step).finish_non_exhaustive()
            }
        }
    }
}

/// Step state machine.
#[derive(Debug, Clone)]
pub struct WorkflowMachine {
    steps: Vec<WorkflowStep>,
    current: usize,
    data: FormData,
    finished: bool,
}

impl WorkflowMachine {
    /// Build a machine positioned at step 0.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::NoSteps`] when `steps` is empty.
    pub fn new(steps: Vec<WorkflowStep>) -> Result<Self, WorkflowError> {
        if steps.is_empty() {
            return Err(WorkflowError::NoSteps);
        }
        Ok(Self {
            steps,
            current: 0,
            data: FormData::new(),
            finished: false,
        })
    }

    /// Start at `index`, clamped into range.
    #[must_use]
    pub fn starting_at(mut self, index: usize) -> Self {
        self.current = index.min(self.last_index());
        self
    }

    #[inline]
    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> &WorkflowStep {
        &self.steps[self.current]
    }

    #[must_use]
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Data accumulated across steps.
    #[must_use]
    pub fn data(&self) -> &FormData {
        &self.data
    }

    /// Whether the terminal state has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `(current + 1, len)` for "Step 2/5" style labels.
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.current + 1, self.steps.len())
    }

    /// Shallow-merge step data into the accumulated data.
    pub fn merge_data(&mut self, data: FormData) {
        for (key, value) in data {
            self.data.insert(key, value);
        }
    }

    fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn previous(&mut self) -> StepTransition {
        if self.finished || self.current == 0 {
            return StepTransition::Unchanged;
        }
        let from = self.current;
        self.current -= 1;
        StepTransition::Moved {
            from,
            to: self.current,
        }
    }

    /// Request to leave the current step, consulting its gate.
    pub fn next(&mut self) -> StepTransition {
        if self.finished {
            return StepTransition::Unchanged;
        }
        let step = self.current;
        let Some(gate) = self.steps[step].validate.clone() else {
            return self.advance_from(step);
        };
        match gate.invoke(self.data.clone()) {
            Completion::Ready(Ok(true)) => self.advance_from(step),
            Completion::Ready(Ok(false)) => StepTransition::Blocked { step },
            Completion::Ready(Err(error)) => StepTransition::Failed { step, error },
            Completion::Pending(gate) => StepTransition::Validating { step, gate },
        }
    }

    /// Leave `step` after its gate passed.
    ///
    /// Ignored when the machine already moved away from `step` (for example
    /// `previous()` ran while an asynchronous gate was pending) or finished.
    pub fn advance_from(&mut self, step: usize) -> StepTransition {
        if self.finished || self.current != step {
            return StepTransition::Unchanged;
        }
        self.steps[step].is_complete = true;
        if step == self.last_index() {
            self.finished = true;
            return StepTransition::Completed;
        }
        self.current = (step + 1).min(self.last_index());
        StepTransition::Moved {
            from: step,
            to: self.current,
        }
    }

    /// Jump to `index` when free navigation is allowed.
    ///
    /// Backward jumps are always allowed; forward jumps only across steps
    /// already marked complete. Gates are not consulted.
    pub fn go_to(&mut self, index: usize, can_navigate: bool) -> StepTransition {
        if self.finished || !can_navigate || index >= self.steps.len() || index == self.current {
            return StepTransition::Unchanged;
        }
        if index > self.current && !self.steps[self.current..index].iter().all(|s| s.is_complete) {
            return StepTransition::Unchanged;
        }
        let from = self.current;
        self.current = index;
        StepTransition::Moved { from, to: index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(n: usize) -> Vec<WorkflowStep> {
        (0..n)
            .map(|i| {
                WorkflowStep::new(
                    format!("s{i}"),
                    format!("Step {i}"),
                    BodyRenderer::static_text([format!("body {i}")]),
                )
            })
            .collect()
    }

    #[test]
    fn empty_workflow_rejected() {
        assert_eq!(WorkflowMachine::new(Vec::new()).unwrap_err(), WorkflowError::NoSteps);
    }

    #[test]
    fn previous_at_zero_is_noop() {
        let mut m = WorkflowMachine::new(steps(3)).unwrap();
        assert!(matches!(m.previous(), StepTransition::Unchanged));
        assert_eq!(m.current_step(), 0);
    }

    #[test]
    fn next_walks_then_completes_once() {
        let mut m = WorkflowMachine::new(steps(3)).unwrap();
        assert!(matches!(m.next(), StepTransition::Moved { from: 0, to: 1 }));
        assert!(matches!(m.next(), StepTransition::Moved { from: 1, to: 2 }));
        assert!(matches!(m.next(), StepTransition::Completed));
        assert!(matches!(m.next(), StepTransition::Unchanged));
        assert_eq!(m.current_step(), 2);
        assert!(m.is_finished());
        assert!(m.steps().iter().all(|s| s.is_complete));
    }

    #[test]
    fn failing_gate_blocks() {
        let mut s = steps(2);
        s[0].validate = Some(Handler::sync(|_| Ok(false)));
        let mut m = WorkflowMachine::new(s).unwrap();
        assert!(matches!(m.next(), StepTransition::Blocked { step: 0 }));
        assert_eq!(m.current_step(), 0);
        assert!(!m.steps()[0].is_complete);
    }

    #[test]
    fn erroring_and_panicking_gates_block() {
        let mut s = steps(2);
        s[0].validate = Some(Handler::sync(|_| Err("bad bar number".into())));
        let mut m = WorkflowMachine::new(s).unwrap();
        assert!(matches!(m.next(), StepTransition::Failed { step: 0, .. }));

        let mut s = steps(2);
        s[0].validate = Some(Handler::sync(|_| panic!("gate bug")));
        let mut m = WorkflowMachine::new(s).unwrap();
        assert!(matches!(m.next(), StepTransition::Failed { step: 0, .. }));
        assert_eq!(m.current_step(), 0);
    }

    #[test]
    fn gate_sees_accumulated_data() {
        let mut s = steps(2);
        s[0].validate = Some(Handler::sync(|data: FormData| {
            Ok(data.get("docket").is_some())
        }));
        let mut m = WorkflowMachine::new(s).unwrap();
        assert!(matches!(m.next(), StepTransition::Blocked { .. }));

        let mut data = FormData::new();
        data.insert("docket".into(), serde_json::json!("24-118"));
        m.merge_data(data);
        assert!(matches!(m.next(), StepTransition::Moved { from: 0, to: 1 }));
    }

    #[test]
    fn stale_async_advance_is_ignored() {
        let mut m = WorkflowMachine::new(steps(3)).unwrap();
        m.next();
        // Gate for step 1 resolves after the user went back.
        m.previous();
        assert!(matches!(m.advance_from(1), StepTransition::Unchanged));
        assert_eq!(m.current_step(), 0);
    }

    #[test]
    fn go_to_rules() {
        let mut m = WorkflowMachine::new(steps(4)).unwrap();
        assert!(matches!(m.go_to(2, false), StepTransition::Unchanged));
        // Forward across incomplete steps is refused.
        assert!(matches!(m.go_to(2, true), StepTransition::Unchanged));
        m.next();
        m.next();
        assert_eq!(m.current_step(), 2);
        assert!(matches!(m.go_to(0, true), StepTransition::Moved { from: 2, to: 0 }));
        assert!(matches!(m.go_to(2, true), StepTransition::Moved { from: 0, to: 2 }));
        assert!(matches!(m.go_to(9, true), StepTransition::Unchanged));
    }

    #[test]
    fn starting_at_clamps() {
        let m = WorkflowMachine::new(steps(3)).unwrap().starting_at(10);
        assert_eq!(m.current_step(), 2);
        assert_eq!(m.progress(), (3, 3));
    }
}
