//! Crate-level error types.
//!
//! Event application never returns these: its failures travel as
//! [`Outcome::Failure`](crate::Outcome::Failure). They cover misconfiguration
//! detected before an aggregate is built.

/// Error returned when [`AggregateOptions`](crate::AggregateOptions) are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// `snapshot_every` must be a positive number of events.
    #[error("snapshot interval must be a positive number of events, got 0")]
    ZeroSnapshotInterval,
}
