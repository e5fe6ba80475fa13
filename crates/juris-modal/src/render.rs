#![forbid(unsafe_code)]

//! Renderer contract.
//!
//! The engine does not draw anything. It hands the renderer one
//! [`ModalView`] per active instance, bottom to top, each carrying a
//! [`Surface`] that describes what the instance shows. Bodies that the caller
//! owns (form bodies, display content, workflow steps) come from a
//! [`RenderStrategy`], so the contract with the render layer stays typed.
//!
//! # Invariants
//!
//! - Exactly one view per active instance, in insertion order.
//! - Exactly one view has `is_top == true` when the registry is non-empty.
//! - A variant tag the engine does not know renders an `Unsupported`
//!   surface; it is never silently skipped.
//!
//! # Failure Modes
//!
//! - A [`RenderStrategy`] that panics is caught; [`describe`] reports a
//!   [`CallbackError`] and the engine shows [`Surface::render_failed`] in
//!   place of that modal.
//!
//! Focusable elements are not part of a surface. The focus contract reads
//! them from the [`FocusHost`](crate::focus::FocusHost) only.

use std::fmt;
use std::rc::Rc;

use crate::callback::{CallbackError, isolate};
use crate::instance::ModalInstance;
use crate::variant::{ConfirmTone, FormData, ModalKind, ModalVariant};

/// Semantic role of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    Dialog,
    /// Destructive confirmations.
    AlertDialog,
    /// Fallback for unknown variant tags.
    Unsupported,
    /// A caller-supplied body failed to render.
    Failed,
}

/// Renderer-agnostic description of what a modal shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub role: SurfaceRole,
    pub heading: Option<String>,
    pub lines: Vec<String>,
}

impl Surface {
    #[must_use]
    pub fn new(role: SurfaceRole) -> Self {
        Self {
            role,
            heading: None,
            lines: Vec::new(),
        }
    }

    /// A dialog surface made of plain text lines.
    pub fn text<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut surface = Self::new(SurfaceRole::Dialog);
        surface.lines = lines.into_iter().map(Into::into).collect();
        surface
    }

    /// Visible fallback for a variant tag the engine does not support.
    #[must_use]
    pub fn unsupported(tag: &str) -> Self {
        let mut surface = Self::new(SurfaceRole::Unsupported);
        surface.heading = Some("Unsupported modal".to_string());
        surface.lines.push(format!("modal type '{tag}' is not supported"));
        surface
    }

    /// Visible fallback for a modal whose body renderer panicked.
    #[must_use]
    pub fn render_failed(heading: &str) -> Self {
        let mut surface = Self::new(SurfaceRole::Failed);
        surface.heading = Some(heading.to_string());
        surface.lines.push("content failed to render".to_string());
        surface
    }

    #[must_use]
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Append another surface's lines.
    pub fn extend(&mut self, other: Surface) {
        self.lines.extend(other.lines);
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.role == SurfaceRole::Unsupported
    }
}

/// Inputs handed to a [`RenderStrategy`].
#[derive(Debug, Clone, Copy)]
pub struct BodyProps<'a> {
    pub modal_id: &'a str,
    /// Form props, accumulated workflow data, or an empty map.
    pub props: &'a FormData,
}

/// Produces the body of a form, display content, or workflow step.
pub trait RenderStrategy {
    fn render_body(&self, props: &BodyProps<'_>) -> Surface;
}

impl<F> RenderStrategy for F
where
    F: Fn(&BodyProps<'_>) -> Surface,
{
    fn render_body(&self, props: &BodyProps<'_>) -> Surface {
        self(props)
    }
}

/// Shared handle to a [`RenderStrategy`].
#[derive(Clone)]
pub struct BodyRenderer(Rc<dyn RenderStrategy>);

impl fmt::Debug for BodyRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyRenderer(..)")
    }
}

impl BodyRenderer {
    pub fn new(strategy: impl RenderStrategy + 'static) -> Self {
        Self(Rc::new(strategy))
    }

    /// Fixed text lines, no focusable elements.
    pub fn static_text<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let surface = Surface::text(lines);
        Self::new(move |_: &BodyProps<'_>| surface.clone())
    }

    /// Run the strategy; a panic comes back as an error.
    pub fn render(&self, props: &BodyProps<'_>) -> Result<Surface, CallbackError> {
        isolate(|| self.0.render_body(props))
    }
}

/// Describe an instance; every variant is handled.
///
/// Fails only when a caller-supplied body renderer panics.
pub fn describe(instance: &ModalInstance) -> Result<Surface, CallbackError> {
    let empty = FormData::new();

    let mut surface = match &instance.variant {
        ModalVariant::Confirmation(c) => {
            let role = match c.tone {
                ConfirmTone::Default => SurfaceRole::Dialog,
                ConfirmTone::Destructive => SurfaceRole::AlertDialog,
            };
            let mut s = Surface::new(role);
            s.push_line(c.message.clone());
            s.push_line(format!("[ {} ]  [ {} ]", c.confirm_text, c.cancel_text));
            s
        }
        ModalVariant::Form(f) => {
            let mut s = f.body.render(&body_props(instance, &f.form_props))?;
            s.push_line(format!("[ {} ]  [ {} ]", f.submit_text, f.cancel_text));
            s
        }
        ModalVariant::Display(d) => {
            let mut s = d.content.render(&body_props(instance, &empty))?;
            if !d.footer_actions.is_empty() {
                s.push_line(action_row(d.footer_actions.iter().map(|a| a.label.as_str())));
            }
            s
        }
        ModalVariant::Workflow(w) => {
            let (position, total) = w.machine.progress();
            let step = w.machine.current();
            let mut s = Surface::new(SurfaceRole::Dialog);
            s.push_line(format!("Step {position}/{total}: {}", step.title));
            if let Some(desc) = &step.description {
                s.push_line(desc.clone());
            }
            s.extend(step.body.render(&body_props(instance, w.machine.data()))?);
            s
        }
        ModalVariant::Approval(a) => {
            let mut s = Surface::new(SurfaceRole::Dialog);
            s.push_line(a.item.title.clone());
            if let Some(summary) = &a.item.summary {
                s.push_line(summary.clone());
            }
            if let Some(stage) = a.approval_steps.get(a.current_step) {
                s.push_line(format!(
                    "Stage {}/{}: {stage}",
                    a.current_step + 1,
                    a.approval_steps.len()
                ));
            }
            for entry in a.history.iter() {
                s.push_line(format!("{} by {}", entry.action().as_str(), entry.actor()));
            }
            s
        }
        ModalVariant::Capture(c) => {
            let mut s = Surface::new(SurfaceRole::Dialog);
            match &c.file {
                Some(file) => s.push_line(format!("File: {}", file.name)),
                None => s.push_line("No file selected"),
            }
            s.push_line(format!("Status: {} ({}%)", c.status.as_str(), c.progress));
            if let Some(data) = &c.extracted {
                s.push_line(format!("Extracted fields: {}", data.len()));
            }
            s
        }
        ModalVariant::Search(q) => {
            let mut s = Surface::new(SurfaceRole::Dialog);
            s.push_line(format!("Search: {}", q.query));
            for hit in &q.results {
                s.push_line(format!("- {}", hit.title));
            }
            s
        }
        ModalVariant::Record(r) => {
            let mut s = Surface::new(SurfaceRole::Dialog);
            s.push_line(r.record_type.clone());
            for field in &r.fields {
                s.push_line(format!("{}: {}", field.label, field.value));
            }
            s
        }
        ModalVariant::Analytics(a) => {
            let mut s = Surface::new(SurfaceRole::Dialog);
            s.push_line(format!("Period: {}", a.period));
            for metric in &a.metrics {
                match &metric.unit {
                    Some(unit) => s.push_line(format!("{}: {} {unit}", metric.label, metric.value)),
                    None => s.push_line(format!("{}: {}", metric.label, metric.value)),
                }
            }
            s
        }
    };

    if !instance.actions.is_empty() {
        surface.push_line(action_row(instance.actions.iter().map(|a| a.label.as_str())));
    }
    surface.heading = Some(instance.title.clone());
    Ok(surface)
}

/// Describe a variant known only by its tag (e.g. from serialized layouts).
pub fn describe_tag(tag: &str) -> Surface {
    match ModalKind::from_tag(tag) {
        Some(kind) => Surface::new(SurfaceRole::Dialog).with_heading(kind.as_str()),
        None => Surface::unsupported(tag),
    }
}

fn body_props<'a>(instance: &'a ModalInstance, props: &'a FormData) -> BodyProps<'a> {
    BodyProps {
        modal_id: &instance.id,
        props,
    }
}

fn action_row<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels
        .map(|label| format!("[ {label} ]"))
        .collect::<Vec<_>>()
        .join("  ")
}

/// One active instance as seen by the renderer.
#[derive(Debug)]
pub struct ModalView<'a> {
    pub instance: &'a ModalInstance,
    /// Position in insertion order, 0 at the bottom.
    pub layer: usize,
    pub is_top: bool,
    pub surface: Surface,
}

/// Host rendering surface.
pub trait ModalRenderer {
    fn render(&mut self, views: &[ModalView<'_>]);
}

/// Reference renderer producing plain text lines.
#[derive(Debug, Default)]
pub struct TextRenderer {
    lines: Vec<String>,
}

impl TextRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines from the last render.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}

impl ModalRenderer for TextRenderer {
    fn render(&mut self, views: &[ModalView<'_>]) {
        self.lines.clear();
        for view in views {
            let marker = if view.is_top { '*' } else { ' ' };
            let heading = view.surface.heading.as_deref().unwrap_or_default();
            self.lines.push(format!(
                "{marker}[{}] {heading} ({}, {})",
                view.layer,
                view.instance.kind().as_str(),
                view.instance.size.as_str()
            ));
            for line in &view.surface.lines {
                self.lines.push(format!("    {line}"));
            }
        }
    }
}
