//! The state-transition function the engine calls once per event.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use serde_json::json;

use crate::outcome::{APPLY_EVENT_FAILED, Failure, Outcome, RESOLVER_THROWN};

/// Mutates aggregate state in place for one event and reports the result.
///
/// Contract:
///
/// - Mutate `state` for every event accepted and return [`Outcome::Success`].
/// - Return [`Outcome::Failure`] to reject an event. Any mutation already
///   made before returning stays in place; the engine does not roll back.
/// - Events arrive strictly in sequence; the engine checks ordering first.
/// - Do not touch `state.sequence`; the engine advances it.
///
/// Any `Fn(&mut S, &E) -> Outcome` is a resolver, so a plain function works:
///
/// ```
/// use eventfold_aggregate::{Event, EventPayload, Outcome};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Clone, Serialize, Deserialize)]
/// # enum CounterEvent { NumberCounted { number: i64 }, CounterReseted }
/// # impl EventPayload for CounterEvent {
/// #     fn name(&self) -> &'static str { "" }
/// # }
/// # struct CounterState { count: i64 }
///
/// fn resolve(state: &mut CounterState, event: &Event<CounterEvent>) -> Outcome {
///     match &event.payload {
///         CounterEvent::NumberCounted { number } => state.count += number,
///         CounterEvent::CounterReseted => state.count = 0,
///     }
///     Outcome::success(serde_json::json!({}))
/// }
/// ```
pub trait EventResolver<S, E> {
    fn resolve(&self, state: &mut S, event: &E) -> Outcome;
}

impl<S, E, F> EventResolver<S, E> for F
where
    F: Fn(&mut S, &E) -> Outcome,
{
    fn resolve(&self, state: &mut S, event: &E) -> Outcome {
        self(state, event)
    }
}

/// Run the resolver, turning a panic into an `APPLY_EVENT_FAILED` failure.
///
/// The failure's `"stack"` is captured here, after unwinding, so it shows the
/// engine frames leading into the resolver rather than the panic site. It is
/// only populated when `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` is set; the
/// default panic hook still prints the panic location to stderr.
///
/// Requires the default `panic = "unwind"` strategy; with `panic = "abort"`
/// the process aborts before anything can be caught.
pub(crate) fn resolve_guarded<S, E, R>(resolver: &R, state: &mut S, event: &E) -> Outcome
where
    R: EventResolver<S, E> + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve(state, event))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(%message, "event resolver panicked");
            Outcome::Failure(Failure::new(
                APPLY_EVENT_FAILED,
                RESOLVER_THROWN,
                json!({
                    "error": "panic",
                    "message": message,
                    "stack": Backtrace::capture().to_string(),
                }),
            ))
        }
    }
}

/// Recover the message from a panic payload (`panic!` yields `&str` or `String`).
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
