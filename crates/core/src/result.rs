//! Result alias and extension traits used across the workspace.
//!
//! Provides small combinators so reporting paths never need unwrap/expect.

use crate::error::Error;

/// The standard Result type for guarded runs.
///
/// # Examples
///
/// ```ignore
/// fn load() -> Result<()> {
///     catch(|| read_config(), [on_error(|e| eprintln!("{e}"))])?;
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait providing side-effecting combinators for Results.
pub trait ResultExt<T> {
    /// Inspect the error without consuming the Result.
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self;

    /// Drop the success value, keeping only the error.
    fn err_or_none(self) -> Option<Error>;
}

impl<T> ResultExt<T> for Result<T> {
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }

    fn err_or_none(self) -> Option<Error> {
        self.err()
    }
}

/// Extension trait for optional errors collected from successive steps.
pub trait ErrorSlotExt {
    /// Keep `self` if set, otherwise fall back to the earlier error.
    ///
    /// Later steps are the last writer, so they win.
    fn or_earlier(self, earlier: Option<Error>) -> Option<Error>;

    /// Turn the slot into a `Result`, `Ok(())` when empty.
    fn into_result(self) -> Result<()>;
}

impl ErrorSlotExt for Option<Error> {
    fn or_earlier(self, earlier: Option<Error>) -> Option<Error> {
        self.or(earlier)
    }

    fn into_result(self) -> Result<()> {
        self.map_or(Ok(()), Err)
    }
}
