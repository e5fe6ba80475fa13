#![forbid(unsafe_code)]

//! Focus and scroll-lock contract for stacked modals.
//!
//! The coordinator never touches a real UI. It asks a [`FocusHost`] for the
//! focusable elements of a modal and tells it where focus goes, mirroring
//! the focus-trap protocol a modal stack follows:
//!
//! 1. When a modal becomes top-most, remember what was focused and move
//!    focus to the modal's first focusable element.
//! 2. Tab / Shift+Tab cycle inside the top modal only.
//! 3. When the top modal goes away, restore the element remembered in (1).
//!    If nothing can be restored, focus the new top's first focusable.
//!
//! # Invariants
//!
//! - One saved entry per modal that has been top-most, in registry order.
//! - Background scroll is locked iff at least one modal is open. The host
//!   is only told when the lock state changes.
//! - When a lower modal leaves, its remembered focus is handed to the entry
//!   above it, so closing the top later still restores the element focused
//!   before the whole stack opened.
//!
//! # Failure Modes
//!
//! - A modal with no focusables keeps the host's current focus.
//! - A remembered element of `None` (nothing was focused), or
//!   `restore_focus` off, falls back to the new top's first focusable; with
//!   no modal left, focus stays where it is.

use ahash::AHashMap;
use juris_core::{LogCategory, LogLevel, Logger};

/// Host-defined identifier of a focusable element.
pub type FocusId = u64;

/// Focus and scroll primitives supplied by the host.
pub trait FocusHost {
    /// Focusable elements of `modal_id` in tab order.
    fn focusables(&self, modal_id: &str) -> Vec<FocusId>;

    /// Currently focused element, if any.
    fn focused(&self) -> Option<FocusId>;

    fn focus(&mut self, id: FocusId);

    fn set_scroll_locked(&mut self, locked: bool);
}

/// In-memory [`FocusHost`] for tests and headless hosts.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    focusables: AHashMap<String, Vec<FocusId>>,
    focused: Option<FocusId>,
    scroll_locked: bool,
    history: Vec<FocusId>,
}

impl HeadlessHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the focusable elements rendered for `modal_id`.
    pub fn register(&mut self, modal_id: impl Into<String>, ids: Vec<FocusId>) {
        self.focusables.insert(modal_id.into(), ids);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_modal(mut self, modal_id: impl Into<String>, ids: Vec<FocusId>) -> Self {
        self.register(modal_id, ids);
        self
    }

    /// Simulate the user focusing an element outside the engine.
    pub fn set_focused(&mut self, id: Option<FocusId>) {
        self.focused = id;
    }

    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// Every element the engine focused, oldest first.
    #[must_use]
    pub fn focus_history(&self) -> &[FocusId] {
        &self.history
    }
}

impl FocusHost for HeadlessHost {
    fn focusables(&self, modal_id: &str) -> Vec<FocusId> {
        self.focusables.get(modal_id).cloned().unwrap_or_default()
    }

    fn focused(&self) -> Option<FocusId> {
        self.focused
    }

    fn focus(&mut self, id: FocusId) {
        self.focused = Some(id);
        self.history.push(id);
    }

    fn set_scroll_locked(&mut self, locked: bool) {
        self.scroll_locked = locked;
    }
}

#[derive(Debug, Clone)]
struct SavedFocus {
    modal_id: String,
    previous: Option<FocusId>,
}

/// Tracks remembered focus across registry changes.
#[derive(Debug)]
pub struct FocusCoordinator {
    saved: Vec<SavedFocus>,
    top: Option<String>,
    scroll_locked: bool,
    restore_focus: bool,
    trap_focus: bool,
    logger: Logger,
}

impl FocusCoordinator {
    pub fn new(logger: Logger, restore_focus: bool, trap_focus: bool) -> Self {
        Self {
            saved: Vec::new(),
            top: None,
            scroll_locked: false,
            restore_focus,
            trap_focus,
            logger,
        }
    }

    /// Id of the modal the coordinator considers top-most.
    #[must_use]
    pub fn top(&self) -> Option<&str> {
        self.top.as_deref()
    }

    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    /// Whether focus to restore is remembered for `modal_id`.
    #[must_use]
    pub fn is_tracking(&self, modal_id: &str) -> bool {
        self.saved.iter().any(|s| s.modal_id == modal_id)
    }

    /// Reconcile with the registry after a mutation.
    ///
    /// `open_ids` lists the open modals in insertion order. Returns the
    /// element focused by this call, if any.
    pub fn sync(&mut self, open_ids: &[&str], host: &mut dyn FocusHost) -> Option<FocusId> {
        let restore = self.forget_closed(open_ids);
        let new_top = open_ids.last().copied();
        let mut moved = None;

        if new_top != self.top.as_deref() {
            match new_top {
                Some(id) if !self.is_tracking(id) => {
                    let previous = restore.unwrap_or_else(|| host.focused());
                    self.saved.push(SavedFocus {
                        modal_id: id.to_string(),
                        previous,
                    });
                    if let Some(&first) = host.focusables(id).first() {
                        host.focus(first);
                        moved = Some(first);
                    }
                    self.logger
                        .event(LogLevel::Debug, LogCategory::Focus, "focus moved into modal")
                        .field("modal_id", id)
                        .field_opt("previous", previous)
                        .field_opt("focused", moved)
                        .emit();
                }
                _ => {
                    if let Some(Some(target)) = restore
                        && self.restore_focus
                    {
                        host.focus(target);
                        moved = Some(target);
                        self.logger
                            .event(LogLevel::Debug, LogCategory::Focus, "focus restored")
                            .field("focused", target)
                            .field_opt("modal_id", new_top)
                            .emit();
                    } else if let Some(id) = new_top
                        && let Some(&first) = host.focusables(id).first()
                    {
                        host.focus(first);
                        moved = Some(first);
                        self.logger
                            .event(LogLevel::Debug, LogCategory::Focus, "focus moved into modal")
                            .field("modal_id", id)
                            .field("focused", first)
                            .emit();
                    }
                }
            }
            self.top = new_top.map(str::to_string);
        }

        let locked = !open_ids.is_empty();
        if locked != self.scroll_locked {
            host.set_scroll_locked(locked);
            self.scroll_locked = locked;
            self.logger
                .event(LogLevel::Debug, LogCategory::Focus, "background scroll lock changed")
                .field("locked", locked)
                .emit();
        }
        moved
    }

    /// Drop entries of modals that are no longer open.
    ///
    /// Returns the remembered focus of the removed top-most entry, if the
    /// top-most entry was removed.
    fn forget_closed(&mut self, open_ids: &[&str]) -> Option<Option<FocusId>> {
        let mut restore = None;
        let mut i = 0;
        while i < self.saved.len() {
            if open_ids.contains(&self.saved[i].modal_id.as_str()) {
                i += 1;
                continue;
            }
            let removed = self.saved.remove(i);
            match self.saved.get_mut(i) {
                Some(above) => above.previous = removed.previous,
                None => restore = Some(removed.previous),
            }
        }
        restore
    }

    /// Move focus within the top modal (Tab when `forward`, Shift+Tab
    /// otherwise), wrapping at both ends.
    pub fn cycle(&self, forward: bool, host: &mut dyn FocusHost) -> Option<FocusId> {
        if !self.trap_focus {
            return None;
        }
        let top = self.top.as_deref()?;
        let ids = host.focusables(top);
        if ids.is_empty() {
            return None;
        }
        let len = ids.len();
        let position = host.focused().and_then(|f| ids.iter().position(|&id| id == f));
        let next = match (position, forward) {
            (Some(p), true) => (p + 1) % len,
            (Some(p), false) => (p + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        let target = ids[next];
        host.focus(target);
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juris_core::RecordingSink;
    use std::rc::Rc;

    fn coordinator() -> FocusCoordinator {
        let logger = Logger::new(Rc::new(RecordingSink::new()), "test");
        FocusCoordinator::new(logger, true, true)
    }

    #[test]
    fn open_focuses_first_and_close_restores() {
        let mut host = HeadlessHost::new().with_modal("a", vec![10, 11]);
        host.set_focused(Some(1));
        let mut focus = coordinator();

        assert_eq!(focus.sync(&["a"], &mut host), Some(10));
        assert!(host.is_scroll_locked());

        assert_eq!(focus.sync(&[], &mut host), Some(1));
        assert_eq!(host.focused(), Some(1));
        assert!(!host.is_scroll_locked());
    }

    #[test]
    fn stacked_close_restores_previous_layer() {
        let mut host = HeadlessHost::new()
            .with_modal("a", vec![10])
            .with_modal("b", vec![20]);
        host.set_focused(Some(1));
        let mut focus = coordinator();
        focus.sync(&["a"], &mut host);
        focus.sync(&["a", "b"], &mut host);
        assert_eq!(host.focused(), Some(20));

        focus.sync(&["a"], &mut host);
        assert_eq!(host.focused(), Some(10));
    }

    #[test]
    fn evicted_lower_modal_hands_focus_up() {
        let mut host = HeadlessHost::new()
            .with_modal("a", vec![10])
            .with_modal("b", vec![20]);
        host.set_focused(Some(1));
        let mut focus = coordinator();
        focus.sync(&["a"], &mut host);
        focus.sync(&["a", "b"], &mut host);
        // "a" evicted, "b" stays on top.
        assert_eq!(focus.sync(&["b"], &mut host), None);
        assert_eq!(focus.sync(&[], &mut host), Some(1));
    }

    #[test]
    fn uncovered_modal_regains_focus_without_restore() {
        let mut host = HeadlessHost::new()
            .with_modal("a", vec![10])
            .with_modal("b", vec![20]);
        let logger = Logger::new(Rc::new(RecordingSink::new()), "test");
        let mut focus = FocusCoordinator::new(logger, false, true);
        focus.sync(&["a"], &mut host);
        focus.sync(&["a", "b"], &mut host);
        host.set_focused(Some(99));

        assert_eq!(focus.sync(&["a"], &mut host), Some(10));
        assert_eq!(host.focused(), Some(10));
    }

    #[test]
    fn nothing_remembered_falls_back_to_first_focusable() {
        let mut host = HeadlessHost::new()
            .with_modal("a", vec![10, 11])
            .with_modal("b", vec![]);
        let mut focus = coordinator();
        focus.sync(&["a"], &mut host);
        host.set_focused(None);
        focus.sync(&["a", "b"], &mut host);

        assert_eq!(focus.sync(&["a"], &mut host), Some(10));
    }

    #[test]
    fn tab_wraps_inside_top() {
        let mut host = HeadlessHost::new().with_modal("a", vec![10, 11, 12]);
        let mut focus = coordinator();
        focus.sync(&["a"], &mut host);
        assert_eq!(focus.cycle(true, &mut host), Some(11));
        assert_eq!(focus.cycle(true, &mut host), Some(12));
        assert_eq!(focus.cycle(true, &mut host), Some(10));
        assert_eq!(focus.cycle(false, &mut host), Some(12));
    }

    #[test]
    fn no_trap_when_disabled_or_empty() {
        let mut host = HeadlessHost::new();
        let logger = Logger::new(Rc::new(RecordingSink::new()), "test");
        let mut focus = FocusCoordinator::new(logger, true, false);
        focus.sync(&["a"], &mut host);
        assert_eq!(focus.cycle(true, &mut host), None);

        let mut focus = coordinator();
        focus.sync(&["a"], &mut host);
        assert_eq!(focus.cycle(true, &mut host), None);
    }

    #[test]
    fn scroll_lock_only_reported_on_change() {
        let mut host = HeadlessHost::new();
        let sink = RecordingSink::new();
        let logger = Logger::new(Rc::new(sink.clone()), "test");
        let mut focus = FocusCoordinator::new(logger, true, true);
        focus.sync(&["a"], &mut host);
        focus.sync(&["a", "b"], &mut host);
        let lock_logs = sink
            .of_category(LogCategory::Focus)
            .into_iter()
            .filter(|r| r.message == "background scroll lock changed")
            .count();
        assert_eq!(lock_logs, 1);
    }
}
