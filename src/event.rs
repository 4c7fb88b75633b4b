//! Event contract and the canonical event envelope.
//!
//! The engine is generic over any [`DomainEvent`]. Most callers use the
//! provided [`Event`] envelope with their own payload enum, which keeps the
//! set of event variants closed and lets resolvers `match` exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AggregateState;

/// What the engine needs to know about an event.
///
/// `Serialize` is required so an out-of-order event can be embedded in the
/// failure diagnostics returned to the caller.
pub trait DomainEvent: Clone + Serialize {
    /// Discriminant identifying the event variant (e.g. `"NumberCounted"`).
    fn name(&self) -> &str;

    /// Schema version of the payload shape.
    fn version(&self) -> u32;

    /// 1-based position of this event in the entity's history.
    fn sequence(&self) -> u64;
}

/// A closed set of event payloads for one aggregate type.
///
/// Implement it on an enum with one variant per event; `name` and `version`
/// are copied into the [`Event`] envelope when it is built.
///
/// # Examples
///
/// ```
/// use eventfold_aggregate::EventPayload;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(tag = "type", content = "data")]
/// enum CounterEvent {
///     NumberCounted { number: i64 },
///     CounterReseted,
/// }
///
/// impl EventPayload for CounterEvent {
///     fn name(&self) -> &'static str {
///         match self {
///             CounterEvent::NumberCounted { .. } => "NumberCounted",
///             CounterEvent::CounterReseted => "CounterReseted",
///         }
///     }
/// }
/// ```
pub trait EventPayload: Clone + Serialize {
    fn name(&self) -> &'static str;

    /// Schema version of this variant. Override when a variant evolves.
    fn version(&self) -> u32 {
        1
    }
}

/// Immutable record of something that happened to an aggregate.
///
/// Field names serialize in camelCase (`commandId`, `entityId`), which is
/// the shape persistence and command-handling layers exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<P> {
    /// Event variant name, taken from the payload.
    pub name: String,
    /// Payload schema version, taken from the payload.
    pub version: u32,
    /// Position in the entity's history (1-based).
    pub sequence: u64,
    /// Identifier of the command that produced this event.
    pub command_id: String,
    /// Identifier of the aggregate instance.
    pub entity_id: String,
    /// Domain-specific data.
    pub payload: P,
    /// Optional free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl<P: EventPayload> Event<P> {
    /// Build an event at an explicit sequence position.
    pub fn new(payload: P, sequence: u64) -> Self {
        Self {
            name: payload.name().to_string(),
            version: payload.version(),
            sequence,
            command_id: String::new(),
            entity_id: String::new(),
            payload,
            metadata: None,
        }
    }

    /// Build the event that follows `state`, i.e. at `state.sequence() + 1`.
    ///
    /// Saturates at `u64::MAX`; the engine rejects such an event as out of
    /// sequence.
    pub fn next<S: AggregateState>(state: &S, payload: P) -> Self {
        Self::new(payload, state.sequence().saturating_add(1))
    }

    pub fn with_command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = command_id.into();
        self
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = entity_id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

impl<P: EventPayload> DomainEvent for Event<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::test_fixtures::{CounterEvent, CounterState};
    use serde_json::json;

    #[test]
    fn new_copies_name_and_version_from_payload() {
        let event = Event::new(CounterEvent::NumberCounted { number: 5 }, 2);
        assert_eq!(event.name, "NumberCounted");
        assert_eq!(event.version, 1);
        assert_eq!(event.sequence, 2);
        assert!(event.metadata.is_none());
    }

    #[test]
    fn next_targets_the_following_sequence() {
        let state = CounterState {
            sequence: 7,
            ..CounterState::default()
        };
        let event = Event::next(&state, CounterEvent::CounterReseted);
        assert_eq!(event.sequence, 8);
    }

    #[test]
    fn next_saturates_at_the_end_of_the_sequence_space() {
        let state = CounterState {
            sequence: u64::MAX,
            ..CounterState::default()
        };
        let event = Event::next(&state, CounterEvent::CounterReseted);
        assert_eq!(event.sequence, u64::MAX);
    }

    #[test]
    fn builders_set_identity_fields() {
        let event = Event::new(CounterEvent::CounterReseted, 1)
            .with_command_id("cmd-1")
            .with_entity_id("counter-1")
            .with_metadata(json!({"source": "test"}));

        assert_eq!(event.command_id, "cmd-1");
        assert_eq!(event.entity_id, "counter-1");
        assert_eq!(event.metadata, Some(json!({"source": "test"})));
    }

    #[test]
    fn serializes_in_camel_case_and_omits_missing_metadata() {
        let event = Event::new(
            CounterEvent::CounterInitiated {
                counter_id: "counter-id".into(),
                count: 4,
            },
            1,
        )
        .with_command_id("command-id")
        .with_entity_id("counter-id");

        let value = serde_json::to_value(&event).expect("serialize should succeed");
        assert_eq!(value["commandId"], "command-id");
        assert_eq!(value["entityId"], "counter-id");
        assert_eq!(value["name"], "CounterInitiated");
        assert_eq!(value["payload"]["data"]["count"], 4);
        assert!(value.get("metadata").is_none());
    }

    #[test]
    fn deserializes_without_metadata() {
        let wire = json!({
            "name": "NumberCounted",
            "version": 1,
            "sequence": 2,
            "commandId": "command-id",
            "entityId": "counter-id",
            "payload": {"type": "NumberCounted", "data": {"number": 5}},
        });
        let event: Event<CounterEvent> =
            serde_json::from_value(wire).expect("deserialize should succeed");
        assert_eq!(event.payload, CounterEvent::NumberCounted { number: 5 });
        assert_eq!(DomainEvent::sequence(&event), 2);
    }
}
