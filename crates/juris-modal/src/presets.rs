#![forbid(unsafe_code)]

//! Preset constructors for the common modal shapes.
//!
//! Each preset builds a well-formed instance, opens it, and returns the
//! generated id (`"<kind>_<unix-millis>"`, with a `-<n>` suffix when that id
//! is already open).

use juris_core::clock::unix_millis;

use crate::callback::Handler;
use crate::engine::ModalEngine;
use crate::focus::FocusHost;
use crate::instance::ModalInstance;
use crate::render::BodyRenderer;
use crate::variant::{ConfirmationModal, DisplayModal, FormData, FormModal, ModalKind, ModalVariant};

impl<H: FocusHost> ModalEngine<H> {
    /// Open a confirmation (message + Confirm/Cancel).
    pub fn confirm(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        on_confirm: Handler<()>,
    ) -> String {
        self.open_preset(title, ConfirmationModal::new(message, on_confirm))
    }

    /// Open a form with a caller-supplied body.
    pub fn form(
        &mut self,
        title: impl Into<String>,
        body: BodyRenderer,
        on_submit: Handler<FormData>,
    ) -> String {
        self.open_preset(title, FormModal::new(body, on_submit))
    }

    /// Open a read-only display modal.
    pub fn display(&mut self, title: impl Into<String>, content: BodyRenderer) -> String {
        self.open_preset(title, DisplayModal::new(content))
    }

    fn open_preset(&mut self, title: impl Into<String>, variant: impl Into<ModalVariant>) -> String {
        let variant = variant.into();
        let id = self.fresh_id(variant.kind());
        let instance = ModalInstance::new(id.clone(), title, variant).size(self.config().default_size);
        self.open(instance);
        id
    }

    fn fresh_id(&self, kind: ModalKind) -> String {
        let base = format!("{}_{}", kind.as_str(), unix_millis());
        if !self.is_open(&base) {
            return base;
        }
        (1u32..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !self.is_open(candidate))
            .unwrap_or(base)
    }
}
