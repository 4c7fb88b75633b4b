//! The minimal contract an aggregate state must satisfy.

/// Domain state folded from events.
///
/// The engine only needs to read and advance the `sequence` counter; every
/// other field belongs to the domain and is mutated exclusively by the
/// [`EventResolver`](crate::EventResolver).
///
/// `Clone` is how the engine hands out copies through
/// [`Aggregate::state`](crate::Aggregate::state) and
/// [`Aggregate::snapshot`](crate::Aggregate::snapshot). It must produce an
/// independent value: do not hold shared interior-mutable storage
/// (`Rc<RefCell<_>>`, `Arc<Mutex<_>>`) in a state type.
///
/// # Examples
///
/// ```
/// use eventfold_aggregate::AggregateState;
///
/// #[derive(Debug, Clone, Default)]
/// struct CounterState {
///     id: String,
///     count: i64,
///     sequence: u64,
/// }
///
/// impl AggregateState for CounterState {
///     fn sequence(&self) -> u64 {
///         self.sequence
///     }
///
///     fn set_sequence(&mut self, sequence: u64) {
///         self.sequence = sequence;
///     }
/// }
/// ```
pub trait AggregateState: Clone {
    /// Number of events folded into this state. `0` for a fresh aggregate.
    fn sequence(&self) -> u64;

    /// Overwrite the sequence counter. Called by the engine only.
    fn set_sequence(&mut self, sequence: u64);

    /// The sequence the next applied event must carry, or `None` once the
    /// counter is exhausted at `u64::MAX`.
    fn next_sequence(&self) -> Option<u64> {
        self.sequence().checked_add(1)
    }
}
