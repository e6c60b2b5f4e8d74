//! Result binding: writing a handler's produced value into its destination.
//!
//! Two destination families share one routine, [`bind`]:
//!
//! - `&mut T` is the typed path. The produced value must implement [`Bind<T>`],
//!   so a value that cannot land in `T` is rejected by the compiler.
//! - [`AnySlot`] is the dynamic path for destinations whose type is only known
//!   at runtime. Callbacks produce an [`AnyValue`] and the slot checks the type
//!   when binding, failing with [`Error::TypeMismatch`] or
//!   [`Error::UnaddressableDestination`].
//!
//! [`Discard`] is the explicitly absent destination: the value is computed and
//! kept as the handler's [`LastResult`], and no caller memory is touched.
//!
//! An absent produced value (`None`, [`AnyValue::none`]) leaves the destination
//! as it was. An explicit zero value is a value and is written.

use std::any::{Any, type_name};
use std::fmt;

use catcher_core::{Error, Result};
use tracing::debug;

/// What the binder did with a produced value.
#[derive(Debug)]
pub enum Bound {
    /// The value was written into the destination.
    Written,
    /// The value was absent; the destination keeps its previous contents.
    Unchanged,
    /// There was no destination; the value is kept as the handler's last result.
    Discarded(LastResult),
}

/// Outcome of a single binding.
pub type BindOutcome = Result<Bound>;

/// Conversion from a callback's return value into a value for a `T` destination.
///
/// `None` means the callback produced nothing meaningful.
pub trait Bind<T> {
    fn into_bound(self) -> Option<T>;
}

impl<T> Bind<T> for T {
    fn into_bound(self) -> Option<T> {
        Some(self)
    }
}

impl<T> Bind<T> for Option<T> {
    fn into_bound(self) -> Option<T> {
        self
    }
}

impl<T> Bind<T> for Box<T> {
    fn into_bound(self) -> Option<T> {
        Some(*self)
    }
}

impl<T: Clone> Bind<T> for &T {
    fn into_bound(self) -> Option<T> {
        Some(self.clone())
    }
}

/// A place a handler's produced value of type `R` can be bound into.
pub trait Destination<R> {
    /// Bind `value` into this destination.
    ///
    /// # Errors
    ///
    /// Returns a binding error when the value cannot be stored.
    fn bind(self, value: R) -> BindOutcome;
}

/// Bind `value` into `destination`.
///
/// This is the single routine every handler kind goes through.
///
/// # Errors
///
/// Returns [`Error::UnaddressableDestination`] or [`Error::TypeMismatch`] from
/// the dynamic path. The typed path never fails.
pub fn bind<D, R>(destination: D, value: R) -> BindOutcome
where
    D: Destination<R>,
{
    destination.bind(value)
}

/// Explicitly absent destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discard;

impl<R: Any> Destination<R> for Discard {
    fn bind(self, value: R) -> BindOutcome {
        Ok(Bound::Discarded(LastResult::new(value)))
    }
}

impl<T, R> Destination<R> for &mut T
where
    R: Bind<T>,
{
    fn bind(self, value: R) -> BindOutcome {
        match value.into_bound() {
            Some(value) => {
                *self = value;
                Ok(Bound::Written)
            }
            None => {
                debug!(destination = type_name::<T>(), "Produced value is absent");
                Ok(Bound::Unchanged)
            }
        }
    }
}

/// A produced value kept because it had nowhere to go.
pub struct LastResult {
    value: Box<dyn Any>,
    type_name: &'static str,
}

impl LastResult {
    fn new<T: Any>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the produced type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the value as `T`, looking through an [`AnyValue`] wrapper.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>().or_else(|| {
            self.value
                .downcast_ref::<AnyValue>()
                .and_then(AnyValue::downcast_ref)
        })
    }
}

impl fmt::Debug for LastResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LastResult")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A type-erased produced value for the dynamic binding path.
#[derive(Debug)]
pub struct AnyValue {
    value: Option<Box<dyn Any>>,
    type_name: &'static str,
}

impl AnyValue {
    /// Wrap a concrete value.
    #[must_use]
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            type_name: type_name::<T>(),
        }
    }

    /// The absent value.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            value: None,
            type_name: "()",
        }
    }

    /// Wrap `Some(value)`, or the absent value for `None`.
    #[must_use]
    pub fn from_option<T: Any>(value: Option<T>) -> Self {
        value.map_or_else(Self::none, Self::new)
    }

    /// Whether this is the absent value.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Name of the wrapped type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|value| value.downcast_ref::<T>())
    }
}

type Writer<'a> = Box<dyn FnOnce(Box<dyn Any>) -> std::result::Result<(), Box<dyn Any>> + 'a>;

/// A destination whose type is checked when binding.
pub struct AnySlot<'a> {
    destination: &'static str,
    writer: Option<Writer<'a>>,
}

impl<'a> AnySlot<'a> {
    /// A writable slot over `target`.
    ///
    /// Accepts values of type `T` and `Box<T>`.
    #[must_use]
    pub fn new<T: Any>(target: &'a mut T) -> Self {
        let writer: Writer<'a> = Box::new(move |value: Box<dyn Any>| {
            let value = match value.downcast::<T>() {
                Ok(value) => {
                    *target = *value;
                    return Ok(());
                }
                Err(value) => value,
            };
            value.downcast::<Box<T>>().map(|value| {
                *target = **value;
            })
        });
        Self {
            destination: type_name::<T>(),
            writer: Some(writer),
        }
    }

    /// A slot over a location that cannot be written through.
    ///
    /// Binding a present value into it fails with
    /// [`Error::UnaddressableDestination`].
    #[must_use]
    pub fn read_only<T: Any>(_target: &'a T) -> Self {
        Self {
            destination: type_name::<T>(),
            writer: None,
        }
    }

    /// Name of the destination type.
    #[must_use]
    pub const fn destination_type(&self) -> &'static str {
        self.destination
    }

    /// Whether values can be written through this slot.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writer.is_some()
    }
}

impl fmt::Debug for AnySlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySlot")
            .field("destination", &self.destination)
            .field("writable", &self.is_writable())
            .finish()
    }
}

impl Destination<AnyValue> for AnySlot<'_> {
    fn bind(self, value: AnyValue) -> BindOutcome {
        let Some(write) = self.writer else {
            return Err(Error::unaddressable_destination(self.destination));
        };
        let AnyValue {
            value,
            type_name: produced,
        } = value;
        let Some(value) = value else {
            debug!(destination = self.destination, "Produced value is absent");
            return Ok(Bound::Unchanged);
        };
        write(value)
            .map(|()| Bound::Written)
            .map_err(|_| Error::type_mismatch(produced, self.destination))
    }
}
