//! Structured try / failure / success / finally for fallible operations.
//!
//! `catcher` runs an operation once, intercepts any panic it raises, and
//! dispatches the outcome to optional handlers:
//!
//! - **on_error**: observes faults and binding errors
//! - **on_failure**: runs when the operation returns `Err` or panics
//! - **on_success**: runs when the operation returns `Ok(())`
//! - **finally**: runs on every path, last
//!
//! Each value-producing handler binds its return value into a destination:
//! a typed `&mut T`, a runtime-checked [`AnySlot`], or [`Discard`].
//!
//! # Example
//!
//! ```ignore
//! use catcher::{Discard, catch, finally, on_error, on_failure, on_success};
//!
//! let mut fallback = String::new();
//! let mut manifest_ready = false;
//!
//! let result = catch(
//!     || fetch_manifest(),
//!     [
//!         on_error(|e| eprintln!("fault: {e}")),
//!         on_failure(&mut fallback, |e| format!("using cached manifest: {e}")),
//!         on_success(&mut manifest_ready, || true),
//!         finally(Discard, || release_lock()),
//!     ],
//! );
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod binder;
pub mod diagnostics;
pub mod executor;
pub mod fault;
pub mod handler;

pub use binder::{
    AnySlot, AnyValue, Bind, BindOutcome, Bound, Destination, Discard, LastResult, bind,
};
pub use catcher_core::{Error, ErrorSlotExt, Result, ResultExt};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use executor::{Branch, Executor, ExecutorConfig, Report, Stage, catch, catch_result};
pub use fault::{FaultEvent, intercept};
pub use handler::{
    ErrorObserver, FailureHandler, FinallyHandler, HandlerKind, HandlerRecord, HandlerRegistry,
    Registration, SuccessHandler, finally, on_error, on_failure, on_success,
};
