#![forbid(unsafe_code)]

//! The closed set of modal variants.
//!
//! Each variant carries its own payload and callbacks. Consumers match on
//! [`ModalVariant`] exhaustively; adding a variant is a compile error for
//! every consumer that has not handled it.

use crate::approval::{ApprovalHistory, ApprovalInput, ApprovalItem};
use crate::callback::Handler;
use crate::render::BodyRenderer;
use crate::workflow::WorkflowMachine;

/// Free-form key/value data submitted by forms and workflows.
pub type FormData = serde_json::Map<String, serde_json::Value>;

/// Variant discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalKind {
    Confirmation,
    Form,
    Display,
    Workflow,
    Approval,
    Capture,
    Search,
    Record,
    Analytics,
}

impl ModalKind {
    pub const ALL: [ModalKind; 9] = [
        Self::Confirmation,
        Self::Form,
        Self::Display,
        Self::Workflow,
        Self::Approval,
        Self::Capture,
        Self::Search,
        Self::Record,
        Self::Analytics,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Form => "form",
            Self::Display => "display",
            Self::Workflow => "workflow",
            Self::Approval => "approval",
            Self::Capture => "capture",
            Self::Search => "search",
            Self::Record => "record",
            Self::Analytics => "analytics",
        }
    }

    /// Parse a tag; `None` for tags outside the closed set.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

/// Visual emphasis of an action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionTone {
    #[default]
    Default,
    Primary,
    Secondary,
    Destructive,
    Ghost,
}

/// A button attached to a modal or its footer.
///
/// `disabled` and `loading` belong to the caller; the engine only reads them.
#[derive(Debug, Clone)]
pub struct ModalAction {
    pub id: String,
    pub label: String,
    pub tone: ActionTone,
    pub on_click: Handler<()>,
    pub disabled: bool,
    pub loading: bool,
}

impl ModalAction {
    pub fn new(id: impl Into<String>, label: impl Into<String>, on_click: Handler<()>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tone: ActionTone::Default,
            on_click,
            disabled: false,
            loading: false,
        }
    }

    #[must_use]
    pub fn tone(mut self, tone: ActionTone) -> Self {
        self.tone = tone;
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Whether a click should reach `on_click`.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        !self.disabled && !self.loading
    }
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmTone {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone)]
pub struct ConfirmationModal {
    pub message: String,
    pub confirm_text: String,
    pub cancel_text: String,
    pub tone: ConfirmTone,
    pub on_confirm: Handler<()>,
    pub on_cancel: Option<Handler<()>>,
}

impl ConfirmationModal {
    pub fn new(message: impl Into<String>, on_confirm: Handler<()>) -> Self {
        Self {
            message: message.into(),
            confirm_text: "Confirm".to_string(),
            cancel_text: "Cancel".to_string(),
            tone: ConfirmTone::Default,
            on_confirm,
            on_cancel: None,
        }
    }

    #[must_use]
    pub fn destructive(mut self) -> Self {
        self.tone = ConfirmTone::Destructive;
        self
    }

    #[must_use]
    pub fn labels(mut self, confirm: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.confirm_text = confirm.into();
        self.cancel_text = cancel.into();
        self
    }

    #[must_use]
    pub fn on_cancel(mut self, handler: Handler<()>) -> Self {
        self.on_cancel = Some(handler);
        self
    }
}

// ---------------------------------------------------------------------------
// Form / Display
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FormModal {
    pub body: BodyRenderer,
    pub form_props: FormData,
    pub submit_text: String,
    pub cancel_text: String,
    pub on_submit: Handler<FormData>,
    pub on_cancel: Option<Handler<()>>,
}

impl FormModal {
    pub fn new(body: BodyRenderer, on_submit: Handler<FormData>) -> Self {
        Self {
            body,
            form_props: FormData::new(),
            submit_text: "Submit".to_string(),
            cancel_text: "Cancel".to_string(),
            on_submit,
            on_cancel: None,
        }
    }

    #[must_use]
    pub fn props(mut self, props: FormData) -> Self {
        self.form_props = props;
        self
    }

    #[must_use]
    pub fn labels(mut self, submit: impl Into<String>, cancel: impl Into<String>) -> Self {
        self.submit_text = submit.into();
        self.cancel_text = cancel.into();
        self
    }

    #[must_use]
    pub fn on_cancel(mut self, handler: Handler<()>) -> Self {
        self.on_cancel = Some(handler);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DisplayModal {
    pub content: BodyRenderer,
    pub scrollable: bool,
    pub footer_actions: Vec<ModalAction>,
}

impl DisplayModal {
    pub fn new(content: BodyRenderer) -> Self {
        Self {
            content,
            scrollable: true,
            footer_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn scrollable(mut self, scrollable: bool) -> Self {
        self.scrollable = scrollable;
        self
    }

    #[must_use]
    pub fn footer_action(mut self, action: ModalAction) -> Self {
        self.footer_actions.push(action);
        self
    }
}

// ---------------------------------------------------------------------------
// Workflow / Approval
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkflowModal {
    pub machine: WorkflowMachine,
    pub on_step_change: Option<Handler<usize>>,
    pub on_complete: Handler<FormData>,
    /// Allow jumping between steps with `go_to`.
    pub can_navigate: bool,
}

impl WorkflowModal {
    pub fn new(machine: WorkflowMachine, on_complete: Handler<FormData>) -> Self {
        Self {
            machine,
            on_step_change: None,
            on_complete,
            can_navigate: false,
        }
    }

    #[must_use]
    pub fn on_step_change(mut self, handler: Handler<usize>) -> Self {
        self.on_step_change = Some(handler);
        self
    }

    #[must_use]
    pub fn can_navigate(mut self, can_navigate: bool) -> Self {
        self.can_navigate = can_navigate;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApprovalModal {
    pub item: ApprovalItem,
    pub approval_steps: Vec<String>,
    pub current_step: usize,
    pub on_approve: Handler<ApprovalInput>,
    pub on_reject: Handler<ApprovalInput>,
    pub on_request_changes: Handler<ApprovalInput>,
    pub history: ApprovalHistory,
}

impl ApprovalModal {
    pub fn new(
        item: ApprovalItem,
        on_approve: Handler<ApprovalInput>,
        on_reject: Handler<ApprovalInput>,
        on_request_changes: Handler<ApprovalInput>,
    ) -> Self {
        Self {
            item,
            approval_steps: Vec::new(),
            current_step: 0,
            on_approve,
            on_reject,
            on_request_changes,
            history: ApprovalHistory::new(),
        }
    }

    #[must_use]
    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approval_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn history(mut self, history: ApprovalHistory) -> Self {
        self.history = history;
        self
    }

    /// Clamp `index` to the known stages.
    pub(crate) fn set_current_step(&mut self, index: usize) {
        self.current_step = index.min(self.approval_steps.len().saturating_sub(1));
    }
}

// ---------------------------------------------------------------------------
// Capture (OCR-style extraction)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFile {
    pub name: String,
    pub mime: String,
    pub size_bytes: u64,
}

impl CaptureFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureStatus {
    #[default]
    Idle,
    Extracting,
    Extracted,
    Validated,
    Failed,
}

impl CaptureStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::Validated => "validated",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureModal {
    pub file: Option<CaptureFile>,
    pub extracted: Option<FormData>,
    /// Percent complete, `0..=100`.
    pub progress: u8,
    pub status: CaptureStatus,
    pub on_extract: Option<Handler<CaptureFile>>,
    pub on_save: Handler<FormData>,
    pub on_validate: Option<Handler<FormData, bool>>,
}

impl CaptureModal {
    pub fn new(on_save: Handler<FormData>) -> Self {
        Self {
            file: None,
            extracted: None,
            progress: 0,
            status: CaptureStatus::Idle,
            on_extract: None,
            on_save,
            on_validate: None,
        }
    }

    #[must_use]
    pub fn file(mut self, file: CaptureFile) -> Self {
        self.file = Some(file);
        self
    }

    #[must_use]
    pub fn on_extract(mut self, handler: Handler<CaptureFile>) -> Self {
        self.on_extract = Some(handler);
        self
    }

    #[must_use]
    pub fn on_validate(mut self, handler: Handler<FormData, bool>) -> Self {
        self.on_validate = Some(handler);
        self
    }

    pub(crate) fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }
}

// ---------------------------------------------------------------------------
// Search / Record / Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub snippet: Option<String>,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            snippet: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchModal {
    pub query: String,
    pub filters: Vec<String>,
    pub results: Vec<SearchHit>,
    pub on_search: Handler<String>,
    pub on_select: Handler<String>,
}

impl SearchModal {
    pub fn new(on_search: Handler<String>, on_select: Handler<String>) -> Self {
        Self {
            query: String::new(),
            filters: Vec::new(),
            results: Vec::new(),
            on_search,
            on_select,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub label: String,
    pub value: String,
}

impl RecordField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A legal-domain record (case, contract, filing) shown as labelled fields.
#[derive(Debug, Clone)]
pub struct RecordModal {
    pub record_type: String,
    pub fields: Vec<RecordField>,
    pub editable: bool,
    pub on_save: Option<Handler<FormData>>,
}

impl RecordModal {
    pub fn new(record_type: impl Into<String>, fields: Vec<RecordField>) -> Self {
        Self {
            record_type: record_type.into(),
            fields,
            editable: false,
            on_save: None,
        }
    }

    /// Make the record editable with a save callback.
    #[must_use]
    pub fn editable(mut self, on_save: Handler<FormData>) -> Self {
        self.editable = true;
        self.on_save = Some(on_save);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: f64,
    pub unit: Option<String>,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            unit: None,
        }
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsModal {
    pub period: String,
    pub metrics: Vec<Metric>,
    pub on_export: Option<Handler<()>>,
}

impl AnalyticsModal {
    pub fn new(period: impl Into<String>, metrics: Vec<Metric>) -> Self {
        Self {
            period: period.into(),
            metrics,
            on_export: None,
        }
    }

    #[must_use]
    pub fn on_export(mut self, handler: Handler<()>) -> Self {
        self.on_export = Some(handler);
        self
    }
}

// ---------------------------------------------------------------------------
// The sum type
// ---------------------------------------------------------------------------

/// Variant payload of a modal instance.
#[derive(Debug, Clone)]
pub enum ModalVariant {
    Confirmation(ConfirmationModal),
    Form(FormModal),
    Display(DisplayModal),
    Workflow(WorkflowModal),
    Approval(ApprovalModal),
    Capture(CaptureModal),
    Search(SearchModal),
    Record(RecordModal),
    Analytics(AnalyticsModal),
}

impl ModalVariant {
    #[must_use]
    pub fn kind(&self) -> ModalKind {
        match self {
            Self::Confirmation(_) => ModalKind::Confirmation,
            Self::Form(_) => ModalKind::Form,
            Self::Display(_) => ModalKind::Display,
            Self::Workflow(_) => ModalKind::Workflow,
            Self::Approval(_) => ModalKind::Approval,
            Self::Capture(_) => ModalKind::Capture,
            Self::Search(_) => ModalKind::Search,
            Self::Record(_) => ModalKind::Record,
            Self::Analytics(_) => ModalKind::Analytics,
        }
    }
}

macro_rules! variant_from {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for ModalVariant {
                fn from(payload: $payload) -> Self {
                    Self::$variant(payload)
                }
            }
        )*
    };
}

variant_from! {
    ConfirmationModal => Confirmation,
    FormModal => Form,
    DisplayModal => Display,
    WorkflowModal => Workflow,
    ApprovalModal => Approval,
    CaptureModal => Capture,
    SearchModal => Search,
    RecordModal => Record,
    AnalyticsModal => Analytics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_for_every_kind() {
        for kind in ModalKind::ALL {
            assert_eq!(ModalKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(ModalKind::from_tag("ocr"), None);
        assert_eq!(ModalKind::from_tag(""), None);
    }

    #[test]
    fn action_actionable_flags() {
        let action = ModalAction::new("export", "Export", Handler::noop());
        assert!(action.is_actionable());
        assert!(!action.clone().disabled(true).is_actionable());
        assert!(!action.loading(true).is_actionable());
    }

    #[test]
    fn capture_progress_clamps() {
        let mut capture = CaptureModal::new(Handler::noop());
        capture.set_progress(250);
        assert_eq!(capture.progress, 100);
    }

    #[test]
    fn approval_step_clamps() {
        let mut approval = ApprovalModal::new(
            ApprovalItem::new("c-9", "Settlement draft"),
            Handler::noop(),
            Handler::noop(),
            Handler::noop(),
        )
        .steps(["associate", "partner"]);
        approval.set_current_step(7);
        assert_eq!(approval.current_step, 1);
    }

    #[test]
    fn from_payload_sets_kind() {
        let v: ModalVariant = ConfirmationModal::new("Delete?", Handler::noop()).into();
        assert_eq!(v.kind(), ModalKind::Confirmation);
        let v: ModalVariant = AnalyticsModal::new("Q3", Vec::new()).into();
        assert_eq!(v.kind(), ModalKind::Analytics);
    }
}
