//! Structured operation results shared by the engine and domain resolvers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code carried by every failure the engine itself produces.
pub const APPLY_EVENT_FAILED: &str = "APPLY_EVENT_FAILED";

/// Reason attached when an event's sequence is not `state.sequence + 1`.
pub const INCOHERENT_SEQUENCE: &str = "Incoherent sequence";

/// Reason attached when a resolver panicked instead of returning an outcome.
pub const RESOLVER_THROWN: &str = "Resolver thrown an error";

/// The result of a fallible operation: either a success payload or a
/// structured [`Failure`].
///
/// Serializes internally tagged on `"outcome"`, so a success looks like
/// `{"outcome": "SUCCESS", "data": ...}` and a failure like
/// `{"outcome": "FAILURE", "errorCode": ..., "reason": ..., "data": ...}`.
///
/// # Examples
///
/// ```
/// use eventfold_aggregate::Outcome;
/// use serde_json::json;
///
/// let ok: Outcome = Outcome::success(json!({"count": 5}));
/// assert!(ok.is_success());
///
/// let err: Outcome = Outcome::failure("COUNTER_INIT_FAILED", "count must be positive", json!({}));
/// assert_eq!(err.into_result().unwrap_err().error_code, "COUNTER_INIT_FAILED");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome<T = Value> {
    /// The operation succeeded.
    Success {
        /// Operation-specific payload.
        data: T,
    },
    /// The operation failed; no mutation happened for the failing step.
    Failure(Failure),
}

/// A machine-readable failure with a human explanation and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{error_code}: {reason}")]
pub struct Failure {
    /// Short discriminant, e.g. `APPLY_EVENT_FAILED`.
    pub error_code: String,
    /// Human-readable explanation.
    pub reason: String,
    /// Arbitrary diagnostic payload.
    pub data: Value,
}

impl Failure {
    pub fn new(error_code: impl Into<String>, reason: impl Into<String>, data: Value) -> Self {
        Self {
            error_code: error_code.into(),
            reason: reason.into(),
            data,
        }
    }
}

impl<T> Outcome<T> {
    /// Wrap a success payload.
    pub fn success(data: T) -> Self {
        Outcome::Success { data }
    }

    /// Build a failure outcome.
    pub fn failure(error_code: impl Into<String>, reason: impl Into<String>, data: Value) -> Self {
        Outcome::Failure(Failure::new(error_code, reason, data))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Convert into a `Result`, so command handlers can use `?`.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Outcome::Success { data } => Ok(data),
            Outcome::Failure(failure) => Err(failure),
        }
    }

    /// Transform the success payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success { data } => Outcome::Success { data: f(data) },
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

impl<T> From<Result<T, Failure>> for Outcome<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(data) => Outcome::Success { data },
            Err(failure) => Outcome::Failure(failure),
        }
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}
