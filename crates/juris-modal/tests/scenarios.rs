// End-to-end behavior of the modal engine through its public API.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use juris_core::{
    EngineConfig, Event, KeyCode, KeyEvent, LogCategory, LogLevel, Modifiers, RecordingSink,
};
use juris_modal::{
    ApprovalAction, ApprovalInput, ApprovalItem, ApprovalModal, BodyRenderer, CallbackError,
    CallbackResult, CaptureFile, CaptureModal, CaptureStatus, CloseHook, ConfirmationModal,
    EventOutcome, FocusHost, FormData, FormModal, Handler, HeadlessHost, IntentOutcome,
    ModalAction, ModalEngine, ModalInstance, ModalIntent, ModalPatch, ModalVariant, TextRenderer,
    VariantPatch, WorkflowMachine, WorkflowModal, WorkflowStep,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine_with(config: EngineConfig) -> (ModalEngine, RecordingSink) {
    let sink = RecordingSink::new();
    let engine = ModalEngine::init(config, Rc::new(sink.clone()), HeadlessHost::new())
        .expect("valid config");
    (engine, sink)
}

fn engine() -> (ModalEngine, RecordingSink) {
    engine_with(EngineConfig::default())
}

fn confirmation(id: &str) -> ModalInstance {
    ModalInstance::new(id, id, ConfirmationModal::new("Proceed?", Handler::noop()))
}

fn counting_hook(counter: &Rc<Cell<u32>>) -> CloseHook {
    let c = Rc::clone(counter);
    CloseHook::new(move || {
        c.set(c.get() + 1);
        Ok(())
    })
}

/// Resolves with `result` after being polled `remaining` more times.
struct Later<T> {
    remaining: u32,
    result: Option<CallbackResult<T>>,
}

fn later<T>(polls: u32, result: CallbackResult<T>) -> Later<T> {
    Later {
        remaining: polls,
        result: Some(result),
    }
}

impl<T: Unpin> Future for Later<T> {
    type Output = CallbackResult<T>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Poll::Pending;
        }
        Poll::Ready(
            self.result
                .take()
                .unwrap_or_else(|| Err(CallbackError::new("polled after completion"))),
        )
    }
}

fn workflow(steps: usize, on_complete: Handler<FormData>) -> WorkflowModal {
    let steps = (0..steps)
        .map(|i| {
            WorkflowStep::new(
                format!("step-{i}"),
                format!("Step {i}"),
                BodyRenderer::static_text([format!("body {i}")]),
            )
        })
        .collect();
    WorkflowModal::new(WorkflowMachine::new(steps).expect("non-empty"), on_complete)
}

fn current_step(engine: &ModalEngine, id: &str) -> Option<usize> {
    match &engine.registry().get(id)?.variant {
        ModalVariant::Workflow(w) => Some(w.machine.current_step()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn capacity_evicts_oldest_before_append() {
    let (mut engine, sink) = engine();
    let a_closed = Rc::new(Cell::new(0));
    let hook_saw_records = Rc::new(Cell::new(0usize));

    let seen = Rc::clone(&hook_saw_records);
    let probe = sink.clone();
    let counter = Rc::clone(&a_closed);
    engine.open(confirmation("A").on_close(CloseHook::new(move || {
        counter.set(counter.get() + 1);
        seen.set(probe.len());
        Ok(())
    })));
    engine.open(confirmation("B"));
    engine.open(confirmation("C"));
    engine.open(confirmation("D"));

    assert_eq!(engine.registry().ids(), ["B", "C", "D"]);
    assert_eq!(a_closed.get(), 1);

    let records = sink.records();
    let d_opened = records
        .iter()
        .position(|r| r.message == "modal opened" && r.field("modal_id") == Some("D"))
        .expect("open of D logged");
    assert!(hook_saw_records.get() <= d_opened);
    assert_eq!(sink.of_category(LogCategory::Evict).len(), 1);
}

#[test]
fn update_of_unknown_id_changes_nothing() {
    let (mut engine, sink) = engine();
    engine.open(confirmation("A"));
    engine.open(confirmation("B"));
    let before = format!("{:?}", engine.registry());

    assert!(!engine.update("ghost", ModalPatch::new().title("x").closable(false)));

    assert_eq!(format!("{:?}", engine.registry()), before);
    let warning = sink
        .records()
        .into_iter()
        .find(|r| r.level == LogLevel::Warn)
        .expect("warning logged");
    assert_eq!(warning.field("modal_id"), Some("ghost"));
}

#[test]
fn close_runs_on_close_at_most_once_even_when_it_fails() {
    let (mut engine, sink) = engine();
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    engine.open(confirmation("A").on_close(CloseHook::new(move || {
        c.set(c.get() + 1);
        Err("audit log unreachable".into())
    })));

    assert!(engine.close("A"));
    assert!(!engine.close("A"));
    engine.close_all();

    assert_eq!(calls.get(), 1);
    assert_eq!(sink.count_at_least(LogLevel::Error), 1);
}

#[test]
fn reopen_keeps_position() {
    let (mut engine, _) = engine();
    engine.open(confirmation("A"));
    engine.open(confirmation("B"));
    engine.open(confirmation("C"));
    engine.open(confirmation("A").closable(false));

    assert_eq!(engine.registry().ids(), ["A", "B", "C"]);
    assert_eq!(engine.registry().get("A").map(|m| m.closable), Some(false));
}

#[test]
fn close_all_survives_a_failing_hook() {
    let (mut engine, sink) = engine();
    let calls = Rc::new(Cell::new(0));
    engine.open(confirmation("A").on_close(counting_hook(&calls)));
    let c = Rc::clone(&calls);
    engine.open(confirmation("B").on_close(CloseHook::new(move || {
        c.set(c.get() + 1);
        panic!("hook bug");
    })));
    engine.open(confirmation("C").on_close(counting_hook(&calls)));

    assert_eq!(engine.close_all(), 3);

    assert_eq!(calls.get(), 3);
    assert!(engine.registry().is_empty());
    let errors: Vec<_> = sink
        .records()
        .into_iter()
        .filter(|r| r.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("modal_id"), Some("B"));
}

#[test]
fn mismatched_variant_patch_is_ignored_but_base_fields_apply() {
    let (mut engine, sink) = engine();
    engine.open(confirmation("A"));
    let patch = ModalPatch::new()
        .title("Renamed")
        .variant_patch(VariantPatch::Approval { current_step: 2 });

    assert!(engine.update("A", patch));

    assert_eq!(engine.registry().get("A").map(|m| m.title.as_str()), Some("Renamed"));
    assert!(
        sink.records()
            .iter()
            .any(|r| r.level == LogLevel::Warn && r.message == "variant patch ignored")
    );
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[test]
fn throwing_action_leaves_registry_untouched() {
    let (mut engine, sink) = engine();
    let action = ModalAction::new(
        "export",
        "Export PDF",
        Handler::sync(|_| Err("renderer crashed".into())),
    );
    let panicking = ModalAction::new("print", "Print", Handler::sync(|_| panic!("no printer")));
    engine.open(confirmation("A").action(action).action(panicking));
    let before = format!("{:?}", engine.registry());

    assert_eq!(engine.click_action("A", "export"), IntentOutcome::Failed);
    assert_eq!(engine.click_action("A", "print"), IntentOutcome::Failed);

    assert_eq!(format!("{:?}", engine.registry()), before);
    let errors: Vec<_> = sink
        .of_category(LogCategory::Dispatch)
        .into_iter()
        .filter(|r| r.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].field("action_id"), Some("export"));
    assert_eq!(errors[0].field("error"), Some("renderer crashed"));
}

#[test]
fn async_submit_closes_on_a_later_tick() {
    let (mut engine, _) = engine();
    let submitted = Rc::new(RefCell::new(None));
    let s = Rc::clone(&submitted);
    let on_submit = Handler::new(move |data: FormData| {
        *s.borrow_mut() = Some(data);
        juris_modal::Completion::pending(later(1, Ok(())))
    });
    engine.open(ModalInstance::new(
        "intake",
        "New matter",
        FormModal::new(BodyRenderer::static_text(["Client"]), on_submit),
    ));

    let mut data = FormData::new();
    data.insert("client".into(), serde_json::json!("Acme LLP"));
    assert!(matches!(
        engine.handle_intent("intake", ModalIntent::Submit(data)),
        IntentOutcome::Pending(_)
    ));
    assert!(engine.is_open("intake"));

    assert!(engine.tick().is_empty());
    assert_eq!(engine.tick().len(), 1);
    assert!(!engine.is_open("intake"));
    assert_eq!(
        submitted
            .borrow()
            .as_ref()
            .and_then(|d| d.get("client"))
            .and_then(|v| v.as_str()),
        Some("Acme LLP")
    );
}

#[test]
fn follow_up_is_dropped_after_modal_was_reopened() {
    let (mut engine, _) = engine();
    let on_confirm = Handler::future(|_| later(1, Ok(())));
    engine.open(ModalInstance::new(
        "A",
        "Archive",
        ConfirmationModal::new("Archive case?", on_confirm),
    ));
    assert!(matches!(
        engine.handle_intent("A", ModalIntent::Confirm),
        IntentOutcome::Pending(_)
    ));

    // Closed and opened again before the callback settles.
    engine.close("A");
    engine.open(confirmation("A"));
    engine.tick();
    engine.tick();

    assert!(engine.is_open("A"));
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn disabled_action_is_not_run() {
    let (mut engine, _) = engine();
    let runs = Rc::new(Cell::new(0));
    let r = Rc::clone(&runs);
    let action = ModalAction::new(
        "sign",
        "Sign",
        Handler::sync(move |_| {
            r.set(r.get() + 1);
            Ok(())
        }),
    )
    .disabled(true);
    engine.open(confirmation("A").action(action));

    assert_eq!(engine.click_action("A", "sign"), IntentOutcome::Ignored);
    assert_eq!(runs.get(), 0);
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[test]
fn workflow_next_five_times_completes_once_on_third_call() {
    let (mut engine, _) = engine();
    let completed_on = Rc::new(RefCell::new(Vec::new()));
    let call = Rc::new(Cell::new(0));
    let (done, at) = (Rc::clone(&completed_on), Rc::clone(&call));
    let on_complete = Handler::sync(move |_: FormData| {
        done.borrow_mut().push(at.get());
        Ok(())
    });
    let changes = Rc::new(RefCell::new(Vec::new()));
    let ch = Rc::clone(&changes);
    let wf = workflow(3, on_complete).on_step_change(Handler::sync(move |index| {
        ch.borrow_mut().push(index);
        Ok(())
    }));
    engine.open(ModalInstance::new("wf", "Filing", wf));

    for n in 1..=5 {
        call.set(n);
        engine.handle_intent("wf", ModalIntent::NextStep);
        let step = current_step(&engine, "wf").expect("workflow open");
        assert!(step <= 2);
    }

    assert_eq!(current_step(&engine, "wf"), Some(2));
    assert_eq!(*completed_on.borrow(), [3]);
    assert_eq!(*changes.borrow(), [1, 2]);
    // The caller closes a completed workflow.
    assert!(engine.is_open("wf"));
}

#[test]
fn previous_at_first_step_is_silent() {
    let (mut engine, _) = engine();
    let changes = Rc::new(Cell::new(0));
    let c = Rc::clone(&changes);
    let wf = workflow(2, Handler::noop()).on_step_change(Handler::sync(move |_| {
        c.set(c.get() + 1);
        Ok(())
    }));
    engine.open(ModalInstance::new("wf", "Filing", wf));

    assert_eq!(
        engine.handle_intent("wf", ModalIntent::PreviousStep),
        IntentOutcome::Ignored
    );
    assert_eq!(changes.get(), 0);
}

#[test]
fn async_gate_advances_only_if_still_on_step() {
    let (mut engine, _) = engine();
    let mut wf = workflow(3, Handler::noop());
    let steps: Vec<WorkflowStep> = wf
        .machine
        .steps()
        .iter()
        .cloned()
        .map(|s| s.validate(Handler::future(|_| later(1, Ok(true)))))
        .collect();
    wf.machine = WorkflowMachine::new(steps).expect("non-empty");
    wf.can_navigate = true;
    engine.open(ModalInstance::new("wf", "Filing", wf));

    // Gate passes on a later tick.
    assert!(matches!(
        engine.handle_intent("wf", ModalIntent::NextStep),
        IntentOutcome::Pending(_)
    ));
    assert_eq!(current_step(&engine, "wf"), Some(0));
    engine.tick();
    engine.tick();
    assert_eq!(current_step(&engine, "wf"), Some(1));

    // User goes back while the gate for step 1 is pending.
    engine.handle_intent("wf", ModalIntent::NextStep);
    engine.handle_intent("wf", ModalIntent::GoToStep(0));
    engine.tick();
    engine.tick();
    assert_eq!(current_step(&engine, "wf"), Some(0));
}

#[test]
fn rejecting_gate_blocks_transition() {
    let (mut engine, _) = engine();
    let mut wf = workflow(2, Handler::noop());
    let steps: Vec<WorkflowStep> = wf
        .machine
        .steps()
        .iter()
        .cloned()
        .map(|s| {
            s.validate(Handler::sync(|data: FormData| {
                Ok(data.contains_key("bar_number"))
            }))
        })
        .collect();
    wf.machine = WorkflowMachine::new(steps).expect("non-empty");
    engine.open(ModalInstance::new("wf", "Admission", wf));

    assert_eq!(
        engine.handle_intent("wf", ModalIntent::NextStep),
        IntentOutcome::Blocked
    );
    let mut data = FormData::new();
    data.insert("bar_number".into(), serde_json::json!("NY-4471"));
    engine.handle_intent("wf", ModalIntent::MergeStepData(data));
    assert_eq!(
        engine.handle_intent("wf", ModalIntent::NextStep),
        IntentOutcome::Applied
    );
    assert_eq!(current_step(&engine, "wf"), Some(1));
}

// ---------------------------------------------------------------------------
// Approval and capture
// ---------------------------------------------------------------------------

#[test]
fn approvals_append_history_in_order() {
    let (mut engine, _) = engine();
    let modal = ApprovalModal::new(
        ApprovalItem::new("nda-7", "Mutual NDA"),
        Handler::noop(),
        Handler::sync(|_| Err("reviewer locked".into())),
        Handler::future(|_| later(0, Ok(()))),
    )
    .steps(["associate", "partner"]);
    engine.open(ModalInstance::new("ap", "Review", modal));

    assert_eq!(
        engine.handle_intent(
            "ap",
            ModalIntent::RequestChanges(ApprovalInput::new("partner").comment("fix clause 4"))
        ),
        IntentOutcome::Pending(1)
    );
    engine.tick();
    assert_eq!(
        engine.handle_intent("ap", ModalIntent::Reject(ApprovalInput::new("partner"))),
        IntentOutcome::Failed
    );
    assert_eq!(
        engine.handle_intent("ap", ModalIntent::Approve(ApprovalInput::new("associate"))),
        IntentOutcome::Applied
    );

    let Some(ModalVariant::Approval(a)) = engine.registry().get("ap").map(|m| &m.variant) else {
        panic!("approval modal missing");
    };
    let actions: Vec<_> = a.history.iter().map(|e| e.action()).collect();
    assert_eq!(
        actions,
        [ApprovalAction::RequestedChanges, ApprovalAction::Approved]
    );
    assert_eq!(a.history.entries()[0].comment(), Some("fix clause 4"));
    assert_eq!(a.current_step, 1);
}

#[test]
fn failed_extraction_marks_capture_failed() {
    let (mut engine, _) = engine();
    let capture = CaptureModal::new(Handler::noop())
        .file(CaptureFile::new("lease.pdf", "application/pdf", 48_213))
        .on_extract(Handler::future(|_| later::<()>(0, Err("ocr timeout".into()))));
    engine.open(ModalInstance::new("cap", "Extract lease", capture));

    assert!(matches!(
        engine.handle_intent("cap", ModalIntent::Extract),
        IntentOutcome::Pending(_)
    ));
    let status = |e: &ModalEngine| match e.registry().get("cap").map(|m| &m.variant) {
        Some(ModalVariant::Capture(c)) => Some(c.status),
        _ => None,
    };
    assert_eq!(status(&engine), Some(CaptureStatus::Extracting));
    engine.tick();
    assert_eq!(status(&engine), Some(CaptureStatus::Failed));
}

// ---------------------------------------------------------------------------
// Focus, keyboard and rendering
// ---------------------------------------------------------------------------

#[test]
fn focus_moves_in_and_is_restored_on_close() {
    let (mut engine, _) = engine();
    engine.host_mut().register("A", vec![10, 11]);
    engine.host_mut().register("B", vec![20]);
    engine.host_mut().set_focused(Some(1));

    engine.open(confirmation("A"));
    assert_eq!(engine.host().focused(), Some(10));
    assert!(engine.host().is_scroll_locked());

    engine.open(confirmation("B"));
    assert_eq!(engine.host().focused(), Some(20));

    let escape = Event::Key(KeyEvent::press(KeyCode::Escape));
    assert_eq!(engine.handle_event(&escape), EventOutcome::Closed("B".into()));
    assert_eq!(engine.host().focused(), Some(10));

    let tab = Event::Key(KeyEvent::press(KeyCode::Tab));
    assert_eq!(engine.handle_event(&tab), EventOutcome::FocusMoved(11));
    assert_eq!(engine.handle_event(&tab), EventOutcome::FocusMoved(10));
    let shift_tab = Event::Key(KeyEvent::press(KeyCode::Tab).with_modifiers(Modifiers::SHIFT));
    assert_eq!(engine.handle_event(&shift_tab), EventOutcome::FocusMoved(11));

    assert_eq!(engine.handle_event(&escape), EventOutcome::Closed("A".into()));
    assert_eq!(engine.host().focused(), Some(1));
    assert!(!engine.host().is_scroll_locked());
}

#[test]
fn render_emits_one_view_per_modal_with_top_marked() {
    let (mut engine, _) = engine();
    engine.open(confirmation("A"));
    engine.open(ModalInstance::new(
        "wf",
        "Filing",
        workflow(3, Handler::noop()),
    ));

    let mut renderer = TextRenderer::new();
    engine.render(&mut renderer);

    let headers: Vec<&String> = renderer
        .lines()
        .iter()
        .filter(|l| !l.starts_with("    "))
        .collect();
    assert_eq!(headers.len(), 2);
    assert!(headers[0].starts_with(" [0] A (confirmation, md)"));
    assert!(headers[1].starts_with("*[1] Filing (workflow, md)"));
    assert!(renderer.output().contains("Step 1/3: Step 0"));
}

#[test]
fn shutdown_closes_everything() {
    let (mut engine, sink) = engine_with(EngineConfig::default().with_max_concurrent_modals(2));
    let closes = Rc::new(Cell::new(0));
    engine.open(confirmation("A").on_close(counting_hook(&closes)));
    engine.open(confirmation("B").on_close(counting_hook(&closes)));

    engine.shutdown();

    assert_eq!(closes.get(), 2);
    assert!(
        sink.of_category(LogCategory::Lifecycle)
            .iter()
            .any(|r| r.message == "modal engine shut down")
    );
}
