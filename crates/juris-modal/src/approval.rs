#![forbid(unsafe_code)]

//! Append-only approval audit trail.
//!
//! # Invariants
//!
//! - Entries are never mutated, removed, or reordered once appended.
//! - Iteration order is append order (oldest first).

use juris_core::clock::unix_millis;

/// Kind of approval event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalAction {
    Approved,
    Rejected,
    RequestedChanges,
    Submitted,
}

impl ApprovalAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RequestedChanges => "requested_changes",
            Self::Submitted => "submitted",
        }
    }
}

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalEntry {
    action: ApprovalAction,
    actor: String,
    timestamp_ms: u64,
    comment: Option<String>,
}

impl ApprovalEntry {
    pub fn new(
        action: ApprovalAction,
        actor: impl Into<String>,
        timestamp_ms: u64,
        comment: Option<String>,
    ) -> Self {
        Self {
            action,
            actor: actor.into(),
            timestamp_ms,
            comment,
        }
    }

    /// An entry stamped with the current wall-clock time.
    pub fn now(action: ApprovalAction, actor: impl Into<String>, comment: Option<String>) -> Self {
        Self::new(action, actor, unix_millis(), comment)
    }

    #[must_use]
    pub fn action(&self) -> ApprovalAction {
        self.action
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// Append-only list of [`ApprovalEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalHistory {
    entries: Vec<ApprovalEntry>,
}

impl ApprovalHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ApprovalEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApprovalEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entries(&self) -> &[ApprovalEntry] {
        &self.entries
    }

    #[must_use]
    pub fn last(&self) -> Option<&ApprovalEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ApprovalEntry> for ApprovalHistory {
    fn from_iter<I: IntoIterator<Item = ApprovalEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The item under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalItem {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
}

impl ApprovalItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: None,
        }
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Argument passed to approve / reject / request-changes callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalInput {
    pub actor: String,
    pub comment: Option<String>,
}

impl ApprovalInput {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            comment: None,
        }
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
