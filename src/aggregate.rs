//! The aggregate engine: sequenced event application, uncommitted-event
//! tracking, and snapshot bookkeeping.
//!
//! An [`Aggregate`] owns one state value and is its only mutator. Events
//! reach the state through the caller-supplied [`EventResolver`], and only
//! when their sequence is exactly `state.sequence() + 1`. Everything the
//! engine hands back out (`state`, `snapshot`) is a clone.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::OptionsError;
use crate::event::DomainEvent;
use crate::outcome::{APPLY_EVENT_FAILED, Failure, INCOHERENT_SEQUENCE, Outcome};
use crate::resolver::{EventResolver, resolve_guarded};
use crate::state::AggregateState;

/// Tuning knobs for an [`Aggregate`].
///
/// Deserializes from `{"snapshotEvery": 50}` so it can sit inside a host
/// application's configuration file. `snapshotEvery: 0` is rejected.
///
/// # Examples
///
/// ```
/// use eventfold_aggregate::AggregateOptions;
///
/// let opts = AggregateOptions::snapshot_every(2).unwrap();
/// assert_eq!(opts.snapshot_every.map(|n| n.get()), Some(2));
///
/// assert!(AggregateOptions::snapshot_every(0).is_err());
/// assert_eq!(AggregateOptions::default().snapshot_every, None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOptions {
    /// Take an automatic snapshot whenever [`Aggregate::add_event`] brings the
    /// sequence to a multiple of this value. `None` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_every: Option<NonZeroU64>,
}

impl AggregateOptions {
    /// Options with automatic snapshots every `every` events.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::ZeroSnapshotInterval`] when `every` is `0`.
    pub fn snapshot_every(every: u64) -> Result<Self, OptionsError> {
        let every = NonZeroU64::new(every).ok_or(OptionsError::ZeroSnapshotInterval)?;
        Ok(Self::default().with_snapshot_every(every))
    }

    pub fn with_snapshot_every(mut self, every: NonZeroU64) -> Self {
        self.snapshot_every = Some(every);
        self
    }
}

/// Engine-private record of what happened to the state.
struct AggregateHistory<S, E> {
    /// Every successfully applied event, in order.
    all_events: Vec<E>,
    /// Events added through `add_event` since the last `events_committed`.
    uncommitted_events: Vec<E>,
    /// Explicit and automatic snapshots since the last `snapshots_committed`.
    snapshots: Vec<S>,
}

impl<S, E> Default for AggregateHistory<S, E> {
    fn default() -> Self {
        Self {
            all_events: Vec::new(),
            uncommitted_events: Vec::new(),
            snapshots: Vec::new(),
        }
    }
}

/// An event-sourced aggregate instance.
///
/// Built once per command-handling cycle from a state (fresh, or loaded from
/// a snapshot) and a resolver, then discarded. Every mutating operation takes
/// `&mut self`; there is no internal locking.
///
/// # Examples
///
/// ```
/// use eventfold_aggregate::{Aggregate, AggregateState, Event, EventPayload, Outcome};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Clone, Default)]
/// struct CounterState { count: i64, sequence: u64 }
///
/// impl AggregateState for CounterState {
///     fn sequence(&self) -> u64 { self.sequence }
///     fn set_sequence(&mut self, sequence: u64) { self.sequence = sequence; }
/// }
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// enum CounterEvent { Counted { count: i64 } }
///
/// impl EventPayload for CounterEvent {
///     fn name(&self) -> &'static str { "Counted" }
/// }
///
/// fn resolve(state: &mut CounterState, event: &Event<CounterEvent>) -> Outcome {
///     match &event.payload {
///         CounterEvent::Counted { count } => state.count = *count,
///     }
///     Outcome::success(json!({}))
/// }
///
/// let mut counter = Aggregate::new(CounterState::default(), resolve);
///
/// let applied = counter.apply([Event::new(CounterEvent::Counted { count: 5 }, 1)]);
/// assert!(applied.is_success());
/// assert_eq!(counter.sequence(), 1);
/// assert_eq!(counter.state().count, 5);
///
/// // A gap is rejected and leaves the state untouched.
/// let gap = counter.apply([Event::new(CounterEvent::Counted { count: 9 }, 5)]);
/// assert!(gap.is_failure());
/// assert_eq!(counter.state().count, 5);
/// ```
pub struct Aggregate<S, E, R> {
    state: S,
    resolver: R,
    options: AggregateOptions,
    history: AggregateHistory<S, E>,
}

/// Build an aggregate from its initial state, resolver, and options.
///
/// Equivalent to [`Aggregate::with_options`].
pub fn build_aggregate<S, E, R>(
    state: S,
    resolver: R,
    options: AggregateOptions,
) -> Aggregate<S, E, R>
where
    S: AggregateState,
    E: DomainEvent,
    R: EventResolver<S, E>,
{
    Aggregate::with_options(state, resolver, options)
}

impl<S, E, R> Aggregate<S, E, R>
where
    S: AggregateState,
    E: DomainEvent,
    R: EventResolver<S, E>,
{
    /// Build an aggregate with default options (no automatic snapshots).
    pub fn new(state: S, resolver: R) -> Self {
        Self::with_options(state, resolver, AggregateOptions::default())
    }

    pub fn with_options(state: S, resolver: R, options: AggregateOptions) -> Self {
        Self {
            state,
            resolver,
            options,
            history: AggregateHistory::default(),
        }
    }

    /// Replay already-decided events, e.g. when rehydrating from storage.
    ///
    /// Events are applied strictly in order. Replayed events are recorded in
    /// [`all_events`](Self::all_events) but not marked uncommitted, and they
    /// never trigger automatic snapshots.
    ///
    /// Pass a single event as `[event]` or `Some(event)`.
    ///
    /// # Returns
    ///
    /// - `Success` with one resolver payload per event, in input order.
    /// - `Failure` from the first event that fails; later events are not
    ///   attempted. The batch is not atomic: events applied before the
    ///   failing one stay applied, and so does any mutation the resolver made
    ///   before reporting failure.
    pub fn apply<I>(&mut self, events: I) -> Outcome<Vec<Value>>
    where
        I: IntoIterator<Item = E>,
    {
        let _span = tracing::debug_span!("apply", sequence = self.state.sequence()).entered();

        let mut results = Vec::new();
        for event in events {
            match self.apply_event(&event) {
                Ok(data) => {
                    results.push(data);
                    self.history.all_events.push(event);
                }
                Err(failure) => return Outcome::Failure(failure),
            }
        }
        Outcome::success(results)
    }

    /// Apply a newly decided event and mark it uncommitted.
    ///
    /// On success, takes an automatic snapshot when the new sequence is a
    /// multiple of [`AggregateOptions::snapshot_every`], then appends the
    /// event to [`uncommitted_events`](Self::uncommitted_events).
    ///
    /// # Returns
    ///
    /// The resolver's outcome for this event, or the failure from
    /// [`apply`](Self::apply) unchanged.
    pub fn add_event(&mut self, event: E) -> Outcome {
        let data = match self.apply(Some(event.clone())) {
            Outcome::Success { data } => data.into_iter().next().unwrap_or_default(),
            Outcome::Failure(failure) => return Outcome::Failure(failure),
        };

        if self.snapshot_due() {
            tracing::debug!(sequence = self.state.sequence(), "taking automatic snapshot");
            self.history.snapshots.push(self.state.clone());
        }

        self.history.uncommitted_events.push(event);
        Outcome::success(data)
    }

    /// Current sequence; never decreases over the aggregate's lifetime.
    pub fn sequence(&self) -> u64 {
        self.state.sequence()
    }

    /// Events added since the last [`events_committed`](Self::events_committed).
    pub fn uncommitted_events(&self) -> &[E] {
        &self.history.uncommitted_events
    }

    /// Every event applied to this instance, replayed or added.
    pub fn all_events(&self) -> &[E] {
        &self.history.all_events
    }

    /// Signal that the uncommitted events are durably persisted.
    ///
    /// Call only after the event store accepted them. Idempotent.
    pub fn events_committed(&mut self) {
        tracing::trace!(
            count = self.history.uncommitted_events.len(),
            "uncommitted events cleared"
        );
        self.history.uncommitted_events.clear();
    }

    /// A copy of the current state. Mutating it does not affect the aggregate.
    pub fn state(&self) -> S {
        self.state.clone()
    }

    /// Record a snapshot of the current state and return a copy of it.
    pub fn snapshot(&mut self) -> S {
        let snapshot = self.state.clone();
        self.history.snapshots.push(snapshot.clone());
        snapshot
    }

    /// Snapshots taken since the last [`snapshots_committed`](Self::snapshots_committed).
    pub fn snapshots(&self) -> &[S] {
        &self.history.snapshots
    }

    /// Signal that the pending snapshots are durably persisted. Idempotent.
    pub fn snapshots_committed(&mut self) {
        tracing::trace!(count = self.history.snapshots.len(), "snapshots cleared");
        self.history.snapshots.clear();
    }

    /// The options this aggregate was built with.
    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Check ordering, run the resolver, and advance the sequence on success.
    fn apply_event(&mut self, event: &E) -> Result<Value, Failure> {
        let expected = match self.state.next_sequence() {
            Some(expected) if expected == event.sequence() => expected,
            expected => {
                tracing::warn!(
                    event = event.name(),
                    expected = ?expected,
                    found = event.sequence(),
                    "rejecting event with incoherent sequence"
                );
                return Err(self.incoherent_sequence(event));
            }
        };

        match resolve_guarded(&self.resolver, &mut self.state, event) {
            Outcome::Success { data } => {
                self.state.set_sequence(expected);
                tracing::debug!(event = event.name(), sequence = expected, "event applied");
                Ok(data)
            }
            Outcome::Failure(failure) => {
                tracing::debug!(
                    event = event.name(),
                    error_code = %failure.error_code,
                    "resolver rejected event"
                );
                Err(failure)
            }
        }
    }

    fn incoherent_sequence(&self, event: &E) -> Failure {
        let event = serde_json::to_value(event).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to serialize rejected event");
            Value::Null
        });
        Failure::new(
            APPLY_EVENT_FAILED,
            INCOHERENT_SEQUENCE,
            json!({
                "event": event,
                "stateSequence": self.state.sequence(),
            }),
        )
    }

    fn snapshot_due(&self) -> bool {
        self.options
            .snapshot_every
            .is_some_and(|every| self.state.sequence() % every.get() == 0)
    }
}

// Manual `Debug` so the resolver (usually a closure) need not be `Debug`.
impl<S, E, R> fmt::Debug for Aggregate<S, E, R>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("state", &self.state)
            .field("options", &self.options)
            .field("all_events", &self.history.all_events.len())
            .field("uncommitted_events", &self.history.uncommitted_events.len())
            .field("snapshots", &self.history.snapshots.len())
            .finish()
    }
}
