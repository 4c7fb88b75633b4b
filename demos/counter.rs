//! Self-contained example: a counter aggregate with business rules layered
//! over the event-sourcing core.
//!
//! Run with: `RUST_LOG=debug cargo run --example counter`

use eventfold_aggregate::{
    Aggregate, AggregateOptions, AggregateState, Event, EventPayload, Outcome,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ---------------------------------------------------------------------------
// Counter aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterState {
    id: Option<String>,
    count: i64,
    sequence: u64,
}

impl AggregateState for CounterState {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }
}

/// Events of the counter. The resolver matches every variant, so adding one
/// without handling it fails to compile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
enum CounterEvent {
    CounterInitiated { counter_id: String, count: i64 },
    NumberCounted { number: i64 },
    CounterReseted,
}

impl EventPayload for CounterEvent {
    fn name(&self) -> &'static str {
        match self {
            CounterEvent::CounterInitiated { .. } => "CounterInitiated",
            CounterEvent::NumberCounted { .. } => "NumberCounted",
            CounterEvent::CounterReseted => "CounterReseted",
        }
    }
}

fn resolve(state: &mut CounterState, event: &Event<CounterEvent>) -> Outcome {
    match &event.payload {
        CounterEvent::CounterInitiated { counter_id, count } => {
            state.id = Some(counter_id.clone());
            state.count = *count;
        }
        CounterEvent::NumberCounted { number } => state.count += number,
        CounterEvent::CounterReseted => state.count = 0,
    }
    Outcome::success(json!({ "count": state.count }))
}

type Resolver = fn(&mut CounterState, &Event<CounterEvent>) -> Outcome;

/// Business rules on top of the aggregate.
struct Counter {
    aggregate: Aggregate<CounterState, Event<CounterEvent>, Resolver>,
    command_id: String,
}

impl Counter {
    fn new(command_id: &str, options: AggregateOptions) -> Self {
        let state = CounterState {
            id: None,
            count: 0,
            sequence: 0,
        };
        Self {
            aggregate: Aggregate::with_options(state, resolve as Resolver, options),
            command_id: command_id.to_string(),
        }
    }

    fn init(&mut self, counter_id: &str, initial_count: i64) -> Outcome {
        let state = self.aggregate.state();
        if state.id.is_some() {
            return Outcome::failure(
                "COUNTER_ALREADY_INITIATED",
                "counter already has an id",
                json!({}),
            );
        }
        if initial_count <= 0 {
            return Outcome::failure(
                "COUNTER_INIT_FAILED",
                "counter allows only positive numbers",
                json!({ "initialCount": initial_count }),
            );
        }
        self.emit(
            &state,
            CounterEvent::CounterInitiated {
                counter_id: counter_id.to_string(),
                count: initial_count,
            },
        )
    }

    fn count(&mut self, number: i64) -> Outcome {
        let state = self.aggregate.state();
        if number <= 0 {
            return Outcome::failure(
                "COUNT_FAILED",
                "counter allows only positive numbers",
                json!({ "number": number }),
            );
        }
        self.emit(&state, CounterEvent::NumberCounted { number })
    }

    fn reset(&mut self) -> Outcome {
        let state = self.aggregate.state();
        self.emit(&state, CounterEvent::CounterReseted)
    }

    fn emit(&mut self, state: &CounterState, payload: CounterEvent) -> Outcome {
        // The id only lands on the state once CounterInitiated is resolved.
        let entity_id = match &payload {
            CounterEvent::CounterInitiated { counter_id, .. } => counter_id.clone(),
            _ => state.id.clone().unwrap_or_default(),
        };
        let event = Event::next(state, payload)
            .with_command_id(self.command_id.clone())
            .with_entity_id(entity_id);
        self.aggregate.add_event(event)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = AggregateOptions::snapshot_every(2)?;
    let mut counter = Counter::new("command-1", options);

    counter.init("alpha", 4).into_result()?;
    counter.count(12).into_result()?;
    counter.count(4).into_result()?;

    // Rejected by a business rule: nothing is recorded.
    let rejected = counter.count(-1);
    println!("count(-1) -> {}", serde_json::to_string(&rejected)?);

    counter.count(5).into_result()?;
    counter.reset().into_result()?;

    let aggregate = &mut counter.aggregate;
    assert!(
        aggregate
            .uncommitted_events()
            .iter()
            .all(|event| event.entity_id == "alpha")
    );
    println!("state      = {:?}", aggregate.state());
    println!("uncommitted = {}", aggregate.uncommitted_events().len());
    println!("snapshots  = {:?}", aggregate.snapshots());

    // Pretend the events were saved, then signal it.
    println!(
        "to persist: {}",
        serde_json::to_string_pretty(aggregate.uncommitted_events())?
    );
    aggregate.events_committed();
    aggregate.snapshots_committed();

    assert_eq!(aggregate.sequence(), 5);
    assert_eq!(aggregate.state().count, 0);
    assert!(aggregate.uncommitted_events().is_empty());

    // Rehydrate a second instance from the full history.
    let mut replica = Counter::new("command-2", AggregateOptions::default());
    let replayed = replica
        .aggregate
        .apply(aggregate.all_events().to_vec())
        .into_result()?;
    println!("replayed {} events", replayed.len());
    assert_eq!(replica.aggregate.sequence(), aggregate.sequence());

    // Out-of-order events are refused with diagnostics.
    let stale = Event::new(CounterEvent::NumberCounted { number: 1 }, 2);
    println!(
        "stale apply -> {}",
        serde_json::to_string(&replica.aggregate.apply([stale]))?
    );

    println!("all assertions passed");
    Ok(())
}
