#![forbid(unsafe_code)]

//! Bounded registry of active modal instances.
//!
//! The registry keeps open modals in insertion order, bottom to top. Only
//! the last entry is top-most; renderers draw from the first to the last.
//!
//! # Invariants
//!
//! - `len() <= capacity()` after every operation; capacity is at least 1.
//! - Ids are unique. Opening an existing id replaces its configuration in
//!   place and keeps its position and sequence number.
//! - At capacity, opening a new id evicts exactly one instance: the oldest
//!   inserted. Eviction is FIFO only.
//! - `on_close` runs at most once per removal, inside the operation that
//!   removes the instance, and its failure never aborts that operation.
//!
//! # Failure Modes
//!
//! - `update()` / `close()` for an unknown id log a warning and change
//!   nothing.
//! - A failing or panicking `on_close` is logged at error level; the
//!   instance is still removed.

use juris_core::{LogCategory, LogLevel, Logger};

use crate::instance::{ModalInstance, ModalPatch};

/// What [`ModalRegistry::open`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Inserted,
    /// The id was already open; its configuration was replaced.
    Replaced,
    /// The registry was full; `evicted` was closed first.
    InsertedAfterEviction { evicted: String },
}

#[derive(Debug)]
struct Slot {
    /// Monotonic insertion number, used to tell re-opened ids apart.
    seq: u64,
    instance: ModalInstance,
}

/// Ordered, bounded set of open modals.
#[derive(Debug)]
pub struct ModalRegistry {
    slots: Vec<Slot>,
    capacity: usize,
    next_seq: u64,
    logger: Logger,
}

impl ModalRegistry {
    /// Create an empty registry. `capacity` is raised to 1 if zero.
    pub fn new(capacity: usize, logger: Logger) -> Self {
        Self {
            slots: Vec::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            next_seq: 1,
            logger,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.instance.id == id)
    }

    // --- Mutations ---

    /// Open `instance`, replacing or evicting as needed.
    pub fn open(&mut self, instance: ModalInstance) -> OpenOutcome {
        if let Some(idx) = self.position(&instance.id) {
            let kind = instance.kind();
            let id = instance.id.clone();
            self.slots[idx].instance = instance;
            self.logger
                .event(LogLevel::Info, LogCategory::Open, "modal replaced")
                .field("modal_id", &id)
                .field("type", kind.as_str())
                .field("count", self.slots.len())
                .emit();
            return OpenOutcome::Replaced;
        }

        let evicted = if self.slots.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let kind = instance.kind();
        let id = instance.id.clone();
        self.slots.push(Slot {
            seq: self.next_seq,
            instance,
        });
        self.next_seq += 1;
        self.logger
            .event(LogLevel::Info, LogCategory::Open, "modal opened")
            .field("modal_id", &id)
            .field("type", kind.as_str())
            .field("count", self.slots.len())
            .emit();

        match evicted {
            Some(evicted) => OpenOutcome::InsertedAfterEviction { evicted },
            None => OpenOutcome::Inserted,
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        if self.slots.is_empty() {
            return None;
        }
        let slot = self.slots.remove(0);
        self.logger
            .event(LogLevel::Info, LogCategory::Evict, "capacity reached, evicting oldest modal")
            .field("modal_id", &slot.instance.id)
            .field("type", slot.instance.kind().as_str())
            .field("count", self.slots.len())
            .emit();
        self.run_close_hook(&slot.instance);
        Some(slot.instance.id)
    }

    /// Shallow-merge `patch` into the instance `id`.
    ///
    /// Returns `false` (after a warning) when `id` is not open.
    pub fn update(&mut self, id: &str, patch: ModalPatch) -> bool {
        let Some(idx) = self.position(id) else {
            self.logger
                .event(LogLevel::Warn, LogCategory::Update, "update for unknown modal ignored")
                .field("modal_id", id)
                .field("count", self.slots.len())
                .emit();
            return false;
        };

        let keys = patch.keys().join(",");
        let applied = self.slots[idx].instance.apply_patch(patch);
        let instance = &self.slots[idx].instance;
        if let Err(mismatch) = applied {
            self.logger
                .event(LogLevel::Warn, LogCategory::Update, "variant patch ignored")
                .field("modal_id", id)
                .field("error", mismatch)
                .emit();
        }
        self.logger
            .event(LogLevel::Info, LogCategory::Update, "modal updated")
            .field("modal_id", id)
            .field("type", instance.kind().as_str())
            .field("count", self.slots.len())
            .field("keys", keys)
            .emit();
        true
    }

    /// Close `id`, running its `on_close` hook.
    ///
    /// Returns `false` (after a warning) when `id` is not open.
    pub fn close(&mut self, id: &str) -> bool {
        let Some(idx) = self.position(id) else {
            self.logger
                .event(LogLevel::Warn, LogCategory::Close, "close for unknown modal ignored")
                .field("modal_id", id)
                .field("count", self.slots.len())
                .emit();
            return false;
        };

        self.run_close_hook(&self.slots[idx].instance);
        let slot = self.slots.remove(idx);
        self.logger
            .event(LogLevel::Info, LogCategory::Close, "modal closed")
            .field("modal_id", &slot.instance.id)
            .field("type", slot.instance.kind().as_str())
            .field("count", self.slots.len())
            .emit();
        true
    }

    /// Close every modal, top first. Returns how many were closed.
    ///
    /// Each hook is isolated; one failing hook does not stop the others.
    pub fn close_all(&mut self) -> usize {
        let closed = self.slots.len();
        while let Some(slot) = self.slots.last() {
            self.run_close_hook(&slot.instance);
            if let Some(slot) = self.slots.pop() {
                self.logger
                    .event(LogLevel::Info, LogCategory::Close, "modal closed")
                    .field("modal_id", &slot.instance.id)
                    .field("type", slot.instance.kind().as_str())
                    .field("count", self.slots.len())
                    .emit();
            }
        }
        if closed > 0 {
            self.logger
                .event(LogLevel::Info, LogCategory::Close, "all modals closed")
                .field("closed", closed)
                .field("count", 0)
                .emit();
        }
        closed
    }

    fn run_close_hook(&self, instance: &ModalInstance) {
        let Some(hook) = &instance.on_close else {
            return;
        };
        if let Err(error) = hook.run() {
            self.logger
                .event(LogLevel::Error, LogCategory::Close, "callback execution failed")
                .field("modal_id", &instance.id)
                .field("callback", "on_close")
                .field("error", error)
                .emit();
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn is_open(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModalInstance> {
        self.slots
            .iter()
            .find(|s| s.instance.id == id)
            .map(|s| &s.instance)
    }

    /// The top-most (most recently inserted) instance.
    #[must_use]
    pub fn top(&self) -> Option<&ModalInstance> {
        self.slots.last().map(|s| &s.instance)
    }

    #[must_use]
    pub fn top_id(&self) -> Option<&str> {
        self.top().map(|m| m.id.as_str())
    }

    /// Instances bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &ModalInstance> {
        self.slots.iter().map(|s| &s.instance)
    }

    /// Ids bottom to top.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|m| m.id.as_str()).collect()
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ModalInstance> {
        self.slots
            .iter_mut()
            .find(|s| s.instance.id == id)
            .map(|s| &mut s.instance)
    }

    /// Sequence number of the open instance `id`.
    pub(crate) fn seq_of(&self, id: &str) -> Option<u64> {
        self.slots
            .iter()
            .find(|s| s.instance.id == id)
            .map(|s| s.seq)
    }
}
