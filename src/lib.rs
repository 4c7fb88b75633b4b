//! Event-sourced aggregate core.
//!
//! An [`Aggregate`] folds an ordered stream of events into a state through a
//! caller-supplied [`EventResolver`], rejects events whose sequence is not
//! the next one, and keeps track of which events and snapshots the caller
//! still has to persist. The crate performs no I/O.

mod aggregate;
pub use aggregate::{Aggregate, AggregateOptions, build_aggregate};
mod command;
mod error;
mod event;
mod outcome;
mod resolver;
mod state;

pub use command::Command;
pub use error::OptionsError;
pub use event::{DomainEvent, Event, EventPayload};
pub use outcome::{APPLY_EVENT_FAILED, Failure, INCOHERENT_SEQUENCE, Outcome, RESOLVER_THROWN};
pub use resolver::EventResolver;
pub use state::AggregateState;
