//! Error taxonomy for guarded operations.
//!
//! Faults and returned errors share one channel so outcome dispatch has a single
//! source of truth. Binding errors are reported through the same type.

use thiserror::Error;

/// Error produced by a guarded run.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation (or a handler callback) panicked and the unwind was intercepted.
    #[error("runtime fault: {message}")]
    RuntimeFault { message: String },

    /// The operation returned an error without panicking.
    #[error("{}", describe_failure(.context.as_deref(), .source))]
    OperationFailure {
        context: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// A destination was registered that cannot be written through.
    #[error("destination using unaddressable value, `{destination}` must be a mutable reference")]
    UnaddressableDestination { destination: String },

    /// A produced value cannot be stored in its destination.
    #[error("value of type {produced} is not assignable to type {destination}")]
    TypeMismatch {
        produced: String,
        destination: String,
    },
}

fn describe_failure(context: Option<&str>, source: &anyhow::Error) -> String {
    match context {
        Some(context) => format!("{context}: {source}"),
        None => source.to_string(),
    }
}

impl Error {
    /// Create a runtime fault error.
    pub fn runtime_fault(message: impl Into<String>) -> Self {
        Self::RuntimeFault {
            message: message.into(),
        }
    }

    /// Create an operation failure error from anything `anyhow` can hold.
    pub fn operation_failure(source: impl Into<anyhow::Error>) -> Self {
        Self::OperationFailure {
            context: None,
            source: source.into(),
        }
    }

    /// Create an operation failure error prefixed by `context` when displayed.
    pub fn operation_failure_with_context(
        context: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::OperationFailure {
            context: Some(context.into()),
            source: source.into(),
        }
    }

    /// Create an unaddressable destination error.
    pub fn unaddressable_destination(destination: impl Into<String>) -> Self {
        Self::UnaddressableDestination {
            destination: destination.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(produced: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::TypeMismatch {
            produced: produced.into(),
            destination: destination.into(),
        }
    }

    /// Whether this error came from an intercepted panic.
    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::RuntimeFault { .. })
    }

    /// Whether this error was raised while binding a handler result.
    #[must_use]
    pub const fn is_binding(&self) -> bool {
        matches!(
            self,
            Self::UnaddressableDestination { .. } | Self::TypeMismatch { .. }
        )
    }
}
