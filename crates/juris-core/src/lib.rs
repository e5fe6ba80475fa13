#![forbid(unsafe_code)]

//! Shared plumbing for the Juris modal engine: host input events, the
//! structured logging sink, configuration, and a wasm-safe clock.

pub mod clock;
pub mod config;
pub mod event;
pub mod logging;

pub use config::{ConfigError, DEFAULT_MAX_CONCURRENT_MODALS, EngineConfig, ModalSize};
pub use event::{Event, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use logging::{
    LogCategory, LogLevel, LogRecord, LogSink, Logger, RecordBuilder, RecordingSink, TracingSink,
};
