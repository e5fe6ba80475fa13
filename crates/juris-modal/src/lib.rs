#![forbid(unsafe_code)]

//! Modal and workflow orchestration for the Juris portal.
//!
//! The crate is headless. It owns the set of open modals, their variant
//! payloads and callbacks, and leaves drawing to a [`ModalRenderer`].
//!
//! # Pieces
//!
//! - [`ModalRegistry`]: bounded, insertion-ordered set of open modals with
//!   FIFO eviction at capacity.
//! - [`ModalVariant`]: the closed set of modal shapes (confirmation, form,
//!   display, workflow, approval, capture, search, record, analytics).
//! - [`ActionDispatcher`]: runs consumer callbacks, isolates failures and
//!   settles asynchronous ones on [`ModalEngine::tick`].
//! - [`WorkflowMachine`]: step state machine with validation gates.
//! - [`FocusCoordinator`]: focus save/restore, Tab trap and scroll lock
//!   through a [`FocusHost`].
//! - [`ModalEngine`]: one handle over all of the above, plus the
//!   `confirm` / `form` / `display` presets.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use juris_core::{EngineConfig, TracingSink};
//! use juris_modal::{Handler, HeadlessHost, ModalEngine, ModalIntent, TextRenderer};
//!
//! let mut engine = ModalEngine::init(
//!     EngineConfig::default(),
//!     Rc::new(TracingSink),
//!     HeadlessHost::new(),
//! )?;
//! let id = engine.confirm("Withdraw filing", "This cannot be undone.", Handler::noop());
//!
//! let mut renderer = TextRenderer::new();
//! engine.render(&mut renderer);
//!
//! engine.handle_intent(&id, ModalIntent::Confirm);
//! engine.tick();
//! ```

pub mod approval;
pub mod callback;
pub mod dispatch;
pub mod engine;
pub mod focus;
pub mod instance;
mod presets;
pub mod registry;
pub mod render;
pub mod variant;
pub mod workflow;

pub use approval::{ApprovalAction, ApprovalEntry, ApprovalHistory, ApprovalInput, ApprovalItem};
pub use callback::{CallbackError, CallbackResult, CloseHook, Completion, Handler, LocalFuture};
pub use dispatch::{ActionDispatcher, DispatchOutcome, FollowUp, Settled, TaskContext, TaskId};
pub use engine::{EventOutcome, IntentOutcome, ModalEngine, ModalIntent};
pub use focus::{FocusCoordinator, FocusHost, FocusId, HeadlessHost};
pub use instance::{ModalInstance, ModalPatch, PatchMismatch, VariantPatch};
pub use registry::{ModalRegistry, OpenOutcome};
pub use render::{
    BodyProps, BodyRenderer, ModalRenderer, ModalView, RenderStrategy, Surface, SurfaceRole,
    TextRenderer, describe, describe_tag,
};
pub use variant::{
    ActionTone, AnalyticsModal, ApprovalModal, CaptureFile, CaptureModal, CaptureStatus,
    ConfirmTone, ConfirmationModal, DisplayModal, FormData, FormModal, Metric, ModalAction,
    ModalKind, ModalVariant, RecordField, RecordModal, SearchHit, SearchModal, WorkflowModal,
};
pub use workflow::{StepTransition, WorkflowError, WorkflowMachine, WorkflowStep};
