//! Property-based tests for result binding and outcome dispatch.
//!
//! Uses proptest to validate:
//! - Typed and dynamic binding round-trip exactly
//! - Mismatched dynamic binding fails and preserves the destination
//! - Discarding never fails and keeps the value as the last result
//! - Handler order holds for any operation outcome

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::any::type_name;
use std::cell::RefCell;

use catcher::{
    AnySlot, AnyValue, Bound, Discard, Error, Executor, HandlerRegistry, bind, catch, finally,
    on_error, on_failure, on_success,
};
use proptest::prelude::*;

proptest! {
    /// Property: a typed destination holds exactly the produced value
    #[test]
    fn prop_typed_round_trip(initial in any::<i64>(), value in any::<i64>()) {
        let mut destination = initial;

        let outcome = bind(&mut destination, value);

        prop_assert!(matches!(outcome, Ok(Bound::Written)));
        prop_assert_eq!(destination, value);
    }

    /// Property: strings round-trip through the typed path, boxed or not
    #[test]
    fn prop_typed_boxed_round_trip(value in "[a-zA-Z0-9 ]{0,64}") {
        let mut destination = String::from("initial");

        let outcome = bind(&mut destination, Box::new(value.clone()));

        prop_assert!(matches!(outcome, Ok(Bound::Written)));
        prop_assert_eq!(destination, value);
    }

    /// Property: a dynamic slot holds exactly a produced value of its own type
    #[test]
    fn prop_dynamic_round_trip(initial in any::<u32>(), value in any::<u32>()) {
        let mut destination = initial;

        let outcome = bind(AnySlot::new(&mut destination), AnyValue::new(value));

        prop_assert!(matches!(outcome, Ok(Bound::Written)));
        prop_assert_eq!(destination, value);
    }

    /// Property: a value of another type is rejected and the destination kept
    #[test]
    fn prop_mismatch_preserves_destination(initial in any::<i32>(), value in any::<u64>()) {
        let mut destination = initial;

        let outcome = bind(AnySlot::new(&mut destination), AnyValue::new(value));

        let is_mismatch = matches!(
            outcome,
            Err(Error::TypeMismatch { ref produced, ref destination })
                if produced == type_name::<u64>() && destination == type_name::<i32>()
        );
        prop_assert!(is_mismatch);
        prop_assert_eq!(destination, initial);
    }

    /// Property: text never lands in a numeric slot
    #[test]
    fn prop_text_mismatch_preserves_destination(
        initial in any::<i32>(),
        value in "[a-z]{0,32}",
    ) {
        let mut destination = initial;

        let outcome = bind(AnySlot::new(&mut destination), AnyValue::new(value));

        prop_assert!(outcome.is_err_and(|e| e.is_binding()));
        prop_assert_eq!(destination, initial);
    }

    /// Property: discarding never fails and keeps what was produced
    #[test]
    fn prop_discard_keeps_value(value in any::<i64>()) {
        let untouched = 11_i64;

        let outcome = bind(Discard, value);

        let kept = match outcome {
            Ok(Bound::Discarded(last)) => last.downcast_ref::<i64>().copied(),
            _ => None,
        };
        prop_assert_eq!(kept, Some(value));
        prop_assert_eq!(untouched, 11);
    }

    /// Property: handlers run in outcome order, finally last, for any outcome
    #[test]
    fn prop_dispatch_order(fails in any::<bool>(), message in "[a-z]{1,16}") {
        let log = RefCell::new(Vec::new());
        let expected_error = message.clone();

        let result = catch(
            move || if fails { Err(anyhow::anyhow!(message)) } else { Ok(()) },
            [
                on_error(|_| log.borrow_mut().push("observer")),
                on_failure(Discard, |_| log.borrow_mut().push("failure")),
                on_success(Discard, || log.borrow_mut().push("success")),
                finally(Discard, || log.borrow_mut().push("finally")),
            ],
        );

        let branch = if fails { "failure" } else { "success" };
        prop_assert_eq!(log.borrow().clone(), vec![branch, "finally"]);
        prop_assert_eq!(
            result.err().map(|e| e.to_string()),
            fails.then_some(expected_error)
        );
    }

    /// Property: any panic message reaches the observer and the failure handler
    #[test]
    fn prop_fault_message_preserved(message in "[a-zA-Z0-9 ]{1,32}") {
        let observed = RefCell::new(None);
        let handled = RefCell::new(None);
        let payload = message.clone();
        let registry = HandlerRegistry::new()
            .on_error(|e| {
                observed.replace(Some(e.to_string()));
            })
            .on_failure(Discard, |e| {
                handled.replace(Some(e.to_string()));
            });

        let report = Executor::new(registry)
            .without_diagnostics()
            .run(move || -> anyhow::Result<()> { std::panic::panic_any(payload) });

        let expected = format!("runtime fault: {message}");
        prop_assert_eq!(observed.borrow().clone(), Some(expected.clone()));
        prop_assert_eq!(handled.borrow().clone(), Some(expected));
        prop_assert!(report.error().is_some_and(Error::is_fault));
    }
}
