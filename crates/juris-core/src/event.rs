#![forbid(unsafe_code)]

//! Host input events consumed by the modal engine.
//!
//! The engine only needs the keyboard subset that drives the accessibility
//! contract: Escape to dismiss and Tab / Shift+Tab for the focus trap. Hosts
//! translate their native key events into [`Event`] before forwarding them.

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

/// Key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Enter,
    Tab,
    /// Shift+Tab as reported by hosts that do not set the modifier.
    BackTab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Char(char),
}

/// Press / release phase of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// A single keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A press of `code` with no modifiers.
    #[must_use]
    pub const fn press(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
            kind: KeyEventKind::Press,
        }
    }

    /// Add modifiers to this event.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether this is a press of Escape.
    #[must_use]
    pub fn is_escape_press(&self) -> bool {
        self.code == KeyCode::Escape && self.kind == KeyEventKind::Press
    }

    /// Resolve Tab navigation: `Some(true)` forward, `Some(false)` backward.
    #[must_use]
    pub fn tab_direction(&self) -> Option<bool> {
        if self.kind == KeyEventKind::Release {
            return None;
        }
        match self.code {
            KeyCode::Tab => Some(!self.modifiers.contains(Modifiers::SHIFT)),
            KeyCode::BackTab => Some(false),
            _ => None,
        }
    }
}

/// Input events forwarded by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// The host window lost or regained focus.
    Focus(bool),
}

impl From<KeyEvent> for Event {
    fn from(key: KeyEvent) -> Self {
        Self::Key(key)
    }
}
