#![forbid(unsafe_code)]

//! Structured logging sink for engine lifecycle events.
//!
//! Every registry mutation, dispatch failure and focus transition produces a
//! [`LogRecord`] of the shape `{level, category, message, fields, source}`.
//! Records go to a [`LogSink`]; the default [`TracingSink`] forwards them to
//! `tracing`, and [`RecordingSink`] keeps them in memory for tests and
//! devtools panels.
//!
//! # Invariants
//!
//! 1. Field order is preserved exactly as emitted.
//! 2. A sink never fails: recording is infallible from the engine's side.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use juris_core::logging::{LogCategory, LogLevel, Logger, RecordingSink};
//!
//! let sink = RecordingSink::new();
//! let logger = Logger::new(Rc::new(sink.clone()), "juris-modal");
//! logger
//!     .event(LogLevel::Info, LogCategory::Open, "modal opened")
//!     .field("modal_id", "confirm-delete")
//!     .field("count", 1)
//!     .emit();
//!
//! assert_eq!(sink.len(), 1);
//! assert_eq!(sink.records()[0].field("modal_id"), Some("confirm-delete"));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Which engine transition produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Open,
    Update,
    Close,
    Evict,
    Dispatch,
    Workflow,
    Approval,
    Focus,
    Render,
    Lifecycle,
}

impl LogCategory {
    /// Stable lowercase name used as the `category` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Update => "update",
            Self::Close => "close",
            Self::Evict => "evict",
            Self::Dispatch => "dispatch",
            Self::Workflow => "workflow",
            Self::Approval => "approval",
            Self::Focus => "focus",
            Self::Render => "render",
            Self::Lifecycle => "lifecycle",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    /// Key/value pairs in emission order.
    pub fields: Vec<(&'static str, String)>,
    pub source: String,
}

impl LogRecord {
    /// Look up a field value by key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render fields as `key=value` pairs separated by spaces.
    #[must_use]
    pub fn fields_display(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }
}

/// Destination for structured records.
///
/// The engine is single-threaded; sinks take `&self` and use interior
/// mutability when they need to store anything.
pub trait LogSink {
    fn record(&self, record: LogRecord);
}

/// Field keys [`TracingSink`] forwards as their own `tracing` fields.
/// Anything else is folded into a single `extra` field.
const STRUCTURED_KEYS: [&str; 8] = [
    "modal_id",
    "type",
    "action_id",
    "count",
    "error",
    "callback",
    "intent",
    "step",
];

macro_rules! forward_record {
    ($macro:ident, $record:expr, $extra:expr) => {
        tracing::$macro!(
            category = $record.category.as_str(),
            source = $record.source.as_str(),
            modal_id = $record.field("modal_id"),
            "type" = $record.field("type"),
            action_id = $record.field("action_id"),
            count = $record.field("count").and_then(|c| c.parse::<u64>().ok()),
            error = $record.field("error"),
            callback = $record.field("callback"),
            intent = $record.field("intent"),
            step = $record.field("step"),
            extra = $extra,
            "{}",
            $record.message
        )
    };
}

/// Forwards records to the `tracing` facade.
///
/// Well-known keys (`modal_id`, `type`, `action_id`, `count`, ...) become
/// structured `tracing` fields; absent ones are not recorded. `count` is
/// forwarded as an integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    fn extra(record: &LogRecord) -> Option<String> {
        let rest: Vec<String> = record
            .fields
            .iter()
            .filter(|(k, _)| !STRUCTURED_KEYS.contains(k))
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        (!rest.is_empty()).then(|| rest.join(" "))
    }
}

impl LogSink for TracingSink {
    fn record(&self, record: LogRecord) {
        let extra = Self::extra(&record);
        let extra = extra.as_deref();
        match record.level {
            LogLevel::Trace => forward_record!(trace, record, extra),
            LogLevel::Debug => forward_record!(debug, record, extra),
            LogLevel::Info => forward_record!(info, record, extra),
            LogLevel::Warn => forward_record!(warn, record, extra),
            LogLevel::Error => forward_record!(error, record, extra),
        }
    }
}

/// In-memory sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<LogRecord>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    /// Records of one category, in emission order.
    #[must_use]
    pub fn of_category(&self, category: LogCategory) -> Vec<LogRecord> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    /// Number of records at `level` or above.
    #[must_use]
    pub fn count_at_least(&self, level: LogLevel) -> usize {
        self.records.borrow().iter().filter(|r| r.level >= level).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl LogSink for RecordingSink {
    fn record(&self, record: LogRecord) {
        self.records.borrow_mut().push(record);
    }
}

/// Cheap handle pairing a sink with the `source` stamped on every record.
#[derive(Clone)]
pub struct Logger {
    sink: Rc<dyn LogSink>,
    source: Rc<str>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Logger {
    pub fn new(sink: Rc<dyn LogSink>, source: impl AsRef<str>) -> Self {
        Self {
            sink,
            source: Rc::from(source.as_ref()),
        }
    }

    /// A logger that forwards to `tracing`.
    pub fn tracing(source: impl AsRef<str>) -> Self {
        Self::new(Rc::new(TracingSink), source)
    }

    /// The `source` stamped on records.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Start building a record.
    pub fn event(
        &self,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
    ) -> RecordBuilder<'_> {
        RecordBuilder {
            logger: self,
            record: LogRecord {
                level,
                category,
                message: message.into(),
                fields: Vec::new(),
                source: self.source.to_string(),
            },
        }
    }
}

/// Builder returned by [`Logger::event`]; nothing is recorded until
/// [`emit`](Self::emit).
#[must_use = "records are only written by `emit()`"]
pub struct RecordBuilder<'a> {
    logger: &'a Logger,
    record: LogRecord,
}

impl RecordBuilder<'_> {
    /// Append a field.
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.record.fields.push((key, value.to_string()));
        self
    }

    /// Append a field only when `value` is present.
    pub fn field_opt(self, key: &'static str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    pub fn emit(self) {
        self.logger.sink.record(self.record);
    }
}

/// Install a global JSON `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`).
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
#[cfg(feature = "tracing-json")]
pub fn install_json_subscriber() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
{
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
}
