//! Panic interception.
//!
//! Only panics unwinding on the calling thread are seen here. Work the guarded
//! closure hands to other threads or tasks faults on its own.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use catcher_core::Error;

/// Message used when a panic payload is neither `&str` nor `String`.
pub const UNKNOWN_PAYLOAD: &str = "unknown panic payload";

/// A panic captured while running guarded code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultEvent {
    message: String,
}

impl FaultEvent {
    /// Convert a raw panic payload.
    #[must_use]
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast::<String>()
            .map(|message| *message)
            .or_else(|payload| {
                payload
                    .downcast::<&'static str>()
                    .map(|message| (*message).to_owned())
            })
            .unwrap_or_else(|_| UNKNOWN_PAYLOAD.to_owned());
        Self { message }
    }

    /// The panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Turn the fault into the unified error channel.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::runtime_fault(self.message)
    }
}

/// Run `f`, capturing a panic instead of letting it unwind further.
///
/// Unwind safety is asserted: callers only observe state through the returned
/// error after a fault, never through half-updated values.
///
/// # Errors
///
/// Returns the captured [`FaultEvent`] if `f` panicked.
pub fn intercept<T>(f: impl FnOnce() -> T) -> Result<T, FaultEvent> {
    catch_unwind(AssertUnwindSafe(f)).map_err(FaultEvent::from_payload)
}

/// Run a fallible step, folding a panic into its error.
pub(crate) fn guarded(step: impl FnOnce() -> Result<(), Error>) -> Result<(), Error> {
    intercept(step).unwrap_or_else(|fault| Err(fault.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intercept_passes_value_through() {
        assert_eq!(intercept(|| 7), Ok(7));
    }

    fn fault_message(f: impl FnOnce()) -> Option<String> {
        intercept(f).err().map(|fault| fault.message().to_owned())
    }

    #[test]
    fn test_intercept_static_str_payload() {
        let message = fault_message(|| std::panic::panic_any("static message"));
        assert_eq!(message.as_deref(), Some("static message"));
    }

    #[test]
    fn test_intercept_string_payload() {
        let message = fault_message(|| std::panic::panic_any(String::from("owned message")));
        assert_eq!(message.as_deref(), Some("owned message"));
    }

    #[test]
    fn test_intercept_unknown_payload() {
        let message = fault_message(|| std::panic::panic_any(42_u8));
        assert_eq!(message.as_deref(), Some(UNKNOWN_PAYLOAD));
    }

    #[test]
    fn test_intercept_out_of_bounds() {
        let message = fault_message(|| {
            let mut empty: Vec<u8> = Vec::new();
            empty.remove(0);
        })
        .unwrap_or_default();
        assert!(message.contains("len"), "unexpected message: {message}");
    }

    #[test]
    fn test_fault_into_error() {
        let error = FaultEvent::from_payload(Box::new("boom")).into_error();
        assert_eq!(error.to_string(), "runtime fault: boom");
    }

    #[test]
    fn test_guarded_converts_fault() {
        let result = guarded(|| std::panic::panic_any("boom"));
        assert!(matches!(result, Err(Error::RuntimeFault { ref message }) if message == "boom"));
    }

    #[test]
    fn test_guarded_keeps_step_error() {
        let result = guarded(|| Err(Error::type_mismatch("a", "b")));
        assert!(result.is_err_and(|e| e.is_binding()));
    }
}
