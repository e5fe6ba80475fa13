#![forbid(unsafe_code)]

//! Modal instances and partial updates.

use juris_core::ModalSize;

use crate::callback::CloseHook;
use crate::variant::{
    CaptureFile, CaptureStatus, FormData, Metric, ModalAction, ModalKind, ModalVariant,
    RecordField, SearchHit,
};

/// One active overlay: base fields plus a variant payload.
#[derive(Debug, Clone)]
pub struct ModalInstance {
    /// Caller-supplied id, unique within the registry.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub size: ModalSize,
    /// Whether Escape and dismiss intents may close the modal.
    pub closable: bool,
    pub actions: Vec<ModalAction>,
    pub on_close: Option<CloseHook>,
    pub variant: ModalVariant,
}

impl ModalInstance {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        variant: impl Into<ModalVariant>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            size: ModalSize::default(),
            closable: true,
            actions: Vec::new(),
            on_close: None,
            variant: variant.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ModalKind {
        self.variant.kind()
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn size(mut self, size: ModalSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = closable;
        self
    }

    #[must_use]
    pub fn action(mut self, action: ModalAction) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn on_close(mut self, hook: CloseHook) -> Self {
        self.on_close = Some(hook);
        self
    }

    /// Find an action by id among the header actions and, for display
    /// modals, the footer actions.
    #[must_use]
    pub fn find_action(&self, action_id: &str) -> Option<&ModalAction> {
        let footer: &[ModalAction] = match &self.variant {
            ModalVariant::Display(d) => &d.footer_actions,
            _ => &[],
        };
        self.actions
            .iter()
            .chain(footer.iter())
            .find(|a| a.id == action_id)
    }

    /// Shallow-merge `patch` into this instance.
    ///
    /// Every base field present in the patch is replaced. A `variant_patch`
    /// for a different kind is skipped and reported; the rest still applies.
    pub(crate) fn apply_patch(&mut self, patch: ModalPatch) -> Result<(), PatchMismatch> {
        let ModalPatch {
            title,
            description,
            size,
            closable,
            actions,
            on_close,
            variant,
            variant_patch,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(size) = size {
            self.size = size;
        }
        if let Some(closable) = closable {
            self.closable = closable;
        }
        if let Some(actions) = actions {
            self.actions = actions;
        }
        if let Some(on_close) = on_close {
            self.on_close = on_close;
        }
        if let Some(variant) = variant {
            self.variant = variant;
        }
        match variant_patch {
            Some(vp) => vp.apply(&mut self.variant),
            None => Ok(()),
        }
    }
}

/// Partial update for [`ModalInstance`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ModalPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub size: Option<ModalSize>,
    pub closable: Option<bool>,
    pub actions: Option<Vec<ModalAction>>,
    /// `Some(None)` removes the hook.
    pub on_close: Option<Option<CloseHook>>,
    /// Replace the whole variant payload.
    pub variant: Option<ModalVariant>,
    /// Change selected fields of the current variant.
    pub variant_patch: Option<VariantPatch>,
}

impl ModalPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn size(mut self, size: ModalSize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = Some(closable);
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: Vec<ModalAction>) -> Self {
        self.actions = Some(actions);
        self
    }

    #[must_use]
    pub fn on_close(mut self, hook: Option<CloseHook>) -> Self {
        self.on_close = Some(hook);
        self
    }

    #[must_use]
    pub fn variant(mut self, variant: impl Into<ModalVariant>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    #[must_use]
    pub fn variant_patch(mut self, patch: VariantPatch) -> Self {
        self.variant_patch = Some(patch);
        self
    }

    /// Names of the keys this patch touches, for logging.
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.title.is_some() {
            keys.push("title");
        }
        if self.description.is_some() {
            keys.push("description");
        }
        if self.size.is_some() {
            keys.push("size");
        }
        if self.closable.is_some() {
            keys.push("closable");
        }
        if self.actions.is_some() {
            keys.push("actions");
        }
        if self.on_close.is_some() {
            keys.push("on_close");
        }
        if self.variant.is_some() {
            keys.push("variant");
        }
        if self.variant_patch.is_some() {
            keys.push("variant_patch");
        }
        keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// In-place changes to the fields hosts update while a modal is open.
#[derive(Debug, Clone)]
pub enum VariantPatch {
    Confirmation {
        message: Option<String>,
    },
    Form {
        form_props: FormData,
    },
    Display {
        scrollable: Option<bool>,
        footer_actions: Option<Vec<ModalAction>>,
    },
    /// Merged into the accumulated workflow data.
    Workflow {
        data: FormData,
    },
    Approval {
        current_step: usize,
    },
    Capture {
        file: Option<CaptureFile>,
        extracted: Option<FormData>,
        progress: Option<u8>,
        status: Option<CaptureStatus>,
    },
    Search {
        query: Option<String>,
        results: Option<Vec<SearchHit>>,
    },
    Record {
        fields: Vec<RecordField>,
    },
    Analytics {
        period: Option<String>,
        metrics: Option<Vec<Metric>>,
    },
}

impl VariantPatch {
    /// Progress/status update for capture modals.
    #[must_use]
    pub fn capture_progress(progress: u8, status: CaptureStatus) -> Self {
        Self::Capture {
            file: None,
            extracted: None,
            progress: Some(progress),
            status: Some(status),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ModalKind {
        match self {
            Self::Confirmation { .. } => ModalKind::Confirmation,
            Self::Form { .. } => ModalKind::Form,
            Self::Display { .. } => ModalKind::Display,
            Self::Workflow { .. } => ModalKind::Workflow,
            Self::Approval { .. } => ModalKind::Approval,
            Self::Capture { .. } => ModalKind::Capture,
            Self::Search { .. } => ModalKind::Search,
            Self::Record { .. } => ModalKind::Record,
            Self::Analytics { .. } => ModalKind::Analytics,
        }
    }

    fn apply(self, target: &mut ModalVariant) -> Result<(), PatchMismatch> {
        let mismatch = PatchMismatch {
            instance: target.kind(),
            patch: self.kind(),
        };
        match (self, target) {
            (Self::Confirmation { message }, ModalVariant::Confirmation(c)) => {
                if let Some(message) = message {
                    c.message = message;
                }
            }
            (Self::Form { form_props }, ModalVariant::Form(f)) => f.form_props = form_props,
            (
                Self::Display {
                    scrollable,
                    footer_actions,
                },
                ModalVariant::Display(d),
            ) => {
                if let Some(scrollable) = scrollable {
                    d.scrollable = scrollable;
                }
                if let Some(actions) = footer_actions {
                    d.footer_actions = actions;
                }
            }
            (Self::Workflow { data }, ModalVariant::Workflow(w)) => w.machine.merge_data(data),
            (Self::Approval { current_step }, ModalVariant::Approval(a)) => {
                a.set_current_step(current_step);
            }
            (
                Self::Capture {
                    file,
                    extracted,
                    progress,
                    status,
                },
                ModalVariant::Capture(c),
            ) => {
                if let Some(file) = file {
                    c.file = Some(file);
                }
                if let Some(extracted) = extracted {
                    c.extracted = Some(extracted);
                }
                if let Some(progress) = progress {
                    c.set_progress(progress);
                }
                if let Some(status) = status {
                    c.status = status;
                }
            }
            (Self::Search { query, results }, ModalVariant::Search(s)) => {
                if let Some(query) = query {
                    s.query = query;
                }
                if let Some(results) = results {
                    s.results = results;
                }
            }
            (Self::Record { fields }, ModalVariant::Record(r)) => r.fields = fields,
            (Self::Analytics { period, metrics }, ModalVariant::Analytics(a)) => {
                if let Some(period) = period {
                    a.period = period;
                }
                if let Some(metrics) = metrics {
                    a.metrics = metrics;
                }
            }
            _ => return Err(mismatch),
        }
        Ok(())
    }
}

/// A [`VariantPatch`] targeted a different variant than the instance has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchMismatch {
    pub instance: ModalKind,
    pub patch: ModalKind,
}

impl std::fmt::Display for PatchMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} patch cannot apply to a {} modal",
            self.patch.as_str(),
            self.instance.as_str()
        )
    }
}

impl std::error::Error for PatchMismatch {}
