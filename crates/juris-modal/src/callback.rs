#![forbid(unsafe_code)]

//! Consumer-supplied callbacks and their failure isolation.
//!
//! Every callback the engine runs on behalf of a caller goes through this
//! module. A callback either finishes immediately ([`Completion::Ready`]) or
//! hands back a local future ([`Completion::Pending`]) that the dispatcher
//! polls on each engine tick.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `Err(CallbackError)` | Callback reported failure | Returned as-is |
//! | Panic while invoking | Bug in callback | Caught, turned into `CallbackError` |
//! | Panic while polling | Bug in future | Caught by the dispatcher |
//!
//! Panics are caught with `catch_unwind`, so isolation only holds in builds
//! that unwind.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::rc::Rc;

/// A boxed, single-threaded future.
pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T> + 'static>>;

/// Result type produced by callbacks.
pub type CallbackResult<T = ()> = Result<T, CallbackError>;

/// Failure reported by (or caught around) a consumer callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build an error from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(format!("callback panicked: {detail}"))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CallbackError {}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Run `f`, turning a panic into a [`CallbackError`].
pub(crate) fn isolate<R>(f: impl FnOnce() -> R) -> Result<R, CallbackError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(CallbackError::from_panic)
}

/// What a callback hands back when invoked.
pub enum Completion<T = ()> {
    /// Finished synchronously.
    Ready(CallbackResult<T>),
    /// Still running; the dispatcher polls it.
    Pending(LocalFuture<CallbackResult<T>>),
}

impl<T> Completion<T> {
    pub fn ok(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    pub fn err(error: impl Into<CallbackError>) -> Self {
        Self::Ready(Err(error.into()))
    }

    pub fn pending(future: impl Future<Output = CallbackResult<T>> + 'static) -> Self {
        Self::Pending(Box::pin(future))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// A shared callback taking `A` and completing with `T`.
///
/// Cloning is cheap (reference counted). Invocation never panics: a panic
/// inside the callback becomes `Completion::Ready(Err(..))`.
pub struct Handler<A, T = ()> {
    f: Rc<dyn Fn(A) -> Completion<T>>,
}

impl<A, T> Clone for Handler<A, T> {
    fn clone(&self) -> Self {
        Self {
            f: Rc::clone(&self.f),
        }
    }
}

impl<A, T> fmt::Debug for Handler<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

impl<A: 'static, T: 'static> Handler<A, T> {
    /// Wrap a callback that decides per call whether to finish now or later.
    pub fn new(f: impl Fn(A) -> Completion<T> + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Wrap a synchronous callback.
    pub fn sync(f: impl Fn(A) -> CallbackResult<T> + 'static) -> Self {
        Self::new(move |arg| Completion::Ready(f(arg)))
    }

    /// Wrap a callback returning a future.
    pub fn future<Fut>(f: impl Fn(A) -> Fut + 'static) -> Self
    where
        Fut: Future<Output = CallbackResult<T>> + 'static,
    {
        Self::new(move |arg| Completion::Pending(Box::pin(f(arg))))
    }

    /// Invoke the callback with panic isolation.
    pub fn invoke(&self, arg: A) -> Completion<T> {
        isolate(|| (self.f)(arg)).unwrap_or_else(|e| Completion::Ready(Err(e)))
    }
}

impl<A: 'static> Handler<A, ()> {
    /// A callback that does nothing and succeeds.
    pub fn noop() -> Self {
        Self::sync(|_| Ok(()))
    }
}

/// Synchronous zero-argument hook run when a modal leaves the registry.
#[derive(Clone)]
pub struct CloseHook {
    f: Rc<dyn Fn() -> CallbackResult>,
}

impl fmt::Debug for CloseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CloseHook(..)")
    }
}

impl CloseHook {
    pub fn new(f: impl Fn() -> CallbackResult + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Run the hook; panics are reported as errors.
    pub fn run(&self) -> CallbackResult {
        isolate(|| (self.f)()).and_then(|r| r)
    }
}
