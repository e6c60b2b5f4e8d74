//! Core error types and Result helpers for catcher.
//!
//! All errors are explicit and typed. Panics raised inside a guarded run are
//! converted into [`Error::RuntimeFault`] before anyone sees them.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{ErrorSlotExt, Result, ResultExt};
