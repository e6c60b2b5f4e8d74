//! Handler records and the registry that holds one per outcome kind.
//!
//! A registry starts with no-op defaults. Registering a handler of a kind
//! replaces that kind outright; there is no merging. Registrations can be
//! chained on the registry or collected from [`Registration`] values, which
//! apply in order so the last one of a kind wins.

use std::fmt;

use catcher_core::{Error, Result};
use tracing::debug;

use crate::binder::{BindOutcome, Bound, Destination, LastResult, bind};

/// Outcome kinds that produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Failure,
    Success,
    Finally,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure => write!(f, "failure"),
            Self::Success => write!(f, "success"),
            Self::Finally => write!(f, "finally"),
        }
    }
}

type ObserverCallback<'a> = dyn FnMut(&Error) + 'a;

/// Failure callback with its destination already captured.
pub type FailureCallback<'a> = dyn FnOnce(&Error) -> BindOutcome + 'a;

/// Success or finally callback with its destination already captured.
pub type ProduceCallback<'a> = dyn FnOnce() -> BindOutcome + 'a;

/// Observer for faults and binding errors.
#[derive(Default)]
pub struct ErrorObserver<'a> {
    callback: Option<Box<ObserverCallback<'a>>>,
}

impl ErrorObserver<'_> {
    /// Whether a callback was registered.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn notify(&mut self, error: &Error) {
        match self.callback.as_mut() {
            Some(callback) => callback(error),
            None => debug!(error = %error, "No error observer registered, discarding"),
        }
    }
}

impl fmt::Debug for ErrorObserver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorObserver")
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// A value-producing handler: callback and destination, plus the last
/// value it produced when there was no destination to hold it.
pub struct HandlerRecord<C: ?Sized> {
    kind: HandlerKind,
    callback: Option<Box<C>>,
    last_result: Option<LastResult>,
}

/// Handler run when the operation fails or faults.
pub type FailureHandler<'a> = HandlerRecord<FailureCallback<'a>>;

/// Handler run when the operation succeeds.
pub type SuccessHandler<'a> = HandlerRecord<ProduceCallback<'a>>;

/// Handler run on every path, last.
pub type FinallyHandler<'a> = HandlerRecord<ProduceCallback<'a>>;

impl<C: ?Sized> HandlerRecord<C> {
    const fn empty(kind: HandlerKind) -> Self {
        Self {
            kind,
            callback: None,
            last_result: None,
        }
    }

    fn with_callback(kind: HandlerKind, callback: Box<C>) -> Self {
        Self {
            kind,
            callback: Some(callback),
            last_result: None,
        }
    }

    /// Which outcome this handler serves.
    #[must_use]
    pub const fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// Whether a callback was registered (as opposed to the no-op default).
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.callback.is_some()
    }

    /// The value produced on the last run, if it was discarded.
    #[must_use]
    pub const fn last_result(&self) -> Option<&LastResult> {
        self.last_result.as_ref()
    }

    pub(crate) const fn take_last_result(&mut self) -> Option<LastResult> {
        self.last_result.take()
    }

    fn settle(&mut self, outcome: BindOutcome) -> Result<()> {
        match outcome? {
            Bound::Discarded(value) => {
                debug!(
                    handler = %self.kind,
                    produced = value.type_name(),
                    "Keeping discarded result"
                );
                self.last_result = Some(value);
            }
            Bound::Written => debug!(handler = %self.kind, "Result written to destination"),
            Bound::Unchanged => debug!(handler = %self.kind, "Destination left unchanged"),
        }
        Ok(())
    }
}

impl HandlerRecord<FailureCallback<'_>> {
    /// Run the callback once with `error` and bind what it produced.
    ///
    /// The no-op default does nothing.
    pub(crate) fn invoke(&mut self, error: &Error) -> Result<()> {
        match self.callback.take() {
            Some(callback) => {
                let outcome = callback(error);
                self.settle(outcome)
            }
            None => Ok(()),
        }
    }
}

impl HandlerRecord<ProduceCallback<'_>> {
    /// Run the callback once and bind what it produced.
    ///
    /// The no-op default does nothing.
    pub(crate) fn invoke(&mut self) -> Result<()> {
        match self.callback.take() {
            Some(callback) => {
                let outcome = callback();
                self.settle(outcome)
            }
            None => Ok(()),
        }
    }
}

impl<C: ?Sized> fmt::Debug for HandlerRecord<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("kind", &self.kind)
            .field("registered", &self.is_registered())
            .field("last_result", &self.last_result)
            .finish()
    }
}

/// The four handlers for one guarded run.
#[derive(Debug)]
pub struct HandlerRegistry<'a> {
    pub(crate) observer: ErrorObserver<'a>,
    pub(crate) failure: FailureHandler<'a>,
    pub(crate) success: SuccessHandler<'a>,
    pub(crate) finally: FinallyHandler<'a>,
}

impl Default for HandlerRegistry<'_> {
    fn default() -> Self {
        Self {
            observer: ErrorObserver::default(),
            failure: HandlerRecord::empty(HandlerKind::Failure),
            success: HandlerRecord::empty(HandlerKind::Success),
            finally: HandlerRecord::empty(HandlerKind::Finally),
        }
    }
}

impl<'a> HandlerRegistry<'a> {
    /// Create a registry of no-op handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe faults and binding errors.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Error) + 'a,
    {
        self.observer = ErrorObserver {
            callback: Some(Box::new(callback)),
        };
        self
    }

    /// Handle a failed or faulted operation, binding the result into `destination`.
    #[must_use]
    pub fn on_failure<D, R, F>(mut self, destination: D, callback: F) -> Self
    where
        D: Destination<R> + 'a,
        F: FnOnce(&Error) -> R + 'a,
    {
        let run: Box<FailureCallback<'a>> =
            Box::new(move |error: &Error| bind(destination, callback(error)));
        self.failure = HandlerRecord::with_callback(HandlerKind::Failure, run);
        self
    }

    /// Handle a successful operation, binding the result into `destination`.
    #[must_use]
    pub fn on_success<D, R, F>(mut self, destination: D, callback: F) -> Self
    where
        D: Destination<R> + 'a,
        F: FnOnce() -> R + 'a,
    {
        self.success =
            HandlerRecord::with_callback(HandlerKind::Success, produce(destination, callback));
        self
    }

    /// Run on every path after the outcome handler, binding the result into `destination`.
    #[must_use]
    pub fn finally<D, R, F>(mut self, destination: D, callback: F) -> Self
    where
        D: Destination<R> + 'a,
        F: FnOnce() -> R + 'a,
    {
        self.finally =
            HandlerRecord::with_callback(HandlerKind::Finally, produce(destination, callback));
        self
    }

    /// Apply `registration` on top of the current handlers.
    #[must_use]
    pub fn with(self, registration: Registration<'a>) -> Self {
        registration.apply(self)
    }

    /// The error observer.
    #[must_use]
    pub const fn observer(&self) -> &ErrorObserver<'a> {
        &self.observer
    }

    /// Whether a callback is registered for `kind`.
    #[must_use]
    pub const fn is_registered(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Failure => self.failure.is_registered(),
            HandlerKind::Success => self.success.is_registered(),
            HandlerKind::Finally => self.finally.is_registered(),
        }
    }
}

fn produce<'a, D, R, F>(destination: D, callback: F) -> Box<ProduceCallback<'a>>
where
    D: Destination<R> + 'a,
    F: FnOnce() -> R + 'a,
{
    Box::new(move || bind(destination, callback()))
}

/// A deferred change to a [`HandlerRegistry`].
pub struct Registration<'a> {
    apply: Box<dyn FnOnce(HandlerRegistry<'a>) -> HandlerRegistry<'a> + 'a>,
}

impl<'a> Registration<'a> {
    fn new(apply: impl FnOnce(HandlerRegistry<'a>) -> HandlerRegistry<'a> + 'a) -> Self {
        Self {
            apply: Box::new(apply),
        }
    }

    /// Apply this registration to `registry`.
    #[must_use]
    pub fn apply(self, registry: HandlerRegistry<'a>) -> HandlerRegistry<'a> {
        (self.apply)(registry)
    }
}

impl fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").finish_non_exhaustive()
    }
}

impl<'a> FromIterator<Registration<'a>> for HandlerRegistry<'a> {
    fn from_iter<I: IntoIterator<Item = Registration<'a>>>(iter: I) -> Self {
        iter.into_iter()
            .fold(HandlerRegistry::new(), |registry, registration| {
                registration.apply(registry)
            })
    }
}

/// Register an error observer.
pub fn on_error<'a, F>(callback: F) -> Registration<'a>
where
    F: FnMut(&Error) + 'a,
{
    Registration::new(move |registry| registry.on_error(callback))
}

/// Register a failure handler.
pub fn on_failure<'a, D, R, F>(destination: D, callback: F) -> Registration<'a>
where
    D: Destination<R> + 'a,
    F: FnOnce(&Error) -> R + 'a,
{
    Registration::new(move |registry| registry.on_failure(destination, callback))
}

/// Register a success handler.
pub fn on_success<'a, D, R, F>(destination: D, callback: F) -> Registration<'a>
where
    D: Destination<R> + 'a,
    F: FnOnce() -> R + 'a,
{
    Registration::new(move |registry| registry.on_success(destination, callback))
}

/// Register a finally handler.
pub fn finally<'a, D, R, F>(destination: D, callback: F) -> Registration<'a>
where
    D: Destination<R> + 'a,
    F: FnOnce() -> R + 'a,
{
    Registration::new(move |registry| registry.finally(destination, callback))
}
