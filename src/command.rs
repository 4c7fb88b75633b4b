//! Command envelope handed to command handlers.
//!
//! The engine never consumes commands itself. The envelope exists so that
//! command handlers and the events they produce agree on identifiers: an
//! event's `command_id` is the `id` of the command that caused it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A request to change an aggregate, issued by an actor.
///
/// # Examples
///
/// ```
/// use eventfold_aggregate::Command;
/// use serde_json::json;
///
/// let cmd = Command::new("CountNumber", "user-42", json!({"counterId": "c-1", "number": 5}))
///     .with_metadata(json!({"source": "api"}));
///
/// assert_eq!(cmd.name, "CountNumber");
/// assert_eq!(cmd.actor_id, "user-42");
/// assert!(!cmd.id.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command<P = Value> {
    /// Unique command identifier; copied into every event it produces.
    pub id: String,
    /// Command name (e.g. `"CountNumber"`).
    pub name: String,
    /// Identity of whoever issued the command.
    pub actor_id: String,
    /// Command-specific data.
    pub payload: P,
    /// Arbitrary metadata (correlation ids, source, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl<P> Command<P> {
    /// Create a command with a freshly generated UUID v4 id.
    pub fn new(name: impl Into<String>, actor_id: impl Into<String>, payload: P) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            actor_id: actor_id.into(),
            payload,
            metadata: None,
        }
    }

    /// Replace the generated id, e.g. with one supplied by the transport.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_generates_a_uuid_v4_id() {
        let cmd = Command::new("ResetCounter", "user-1", json!({"counterId": "c-1"}));
        let id = Uuid::parse_str(&cmd.id).expect("id should be a UUID");
        assert_eq!(id.get_version(), Some(uuid::Version::Random));
    }

    #[test]
    fn ids_differ_between_commands() {
        let a = Command::new("ResetCounter", "user-1", ());
        let b = Command::new("ResetCounter", "user-1", ());
        assert_ne!(a.id, b.id, "each command should get its own id");
    }

    #[test]
    fn with_id_overrides_generated_id() {
        let cmd = Command::new("CreateCounter", "user-1", ()).with_id("command-id");
        assert_eq!(cmd.id, "command-id");
    }

    #[test]
    fn builder_accepts_owned_strings() {
        let cmd = Command::new(String::from("CountNumber"), String::from("svc-counter"), 5);
        assert_eq!(cmd.name, "CountNumber");
        assert_eq!(cmd.actor_id, "svc-counter");
        assert_eq!(cmd.payload, 5);
    }

    #[test]
    fn serializes_actor_id_in_camel_case() {
        let cmd = Command::new("CountNumber", "user-1", json!({"number": 5})).with_id("c-1");
        let value = serde_json::to_value(&cmd).expect("serialize should succeed");
        assert_eq!(
            value,
            json!({
                "id": "c-1",
                "name": "CountNumber",
                "actorId": "user-1",
                "payload": {"number": 5},
            })
        );
    }

    #[test]
    fn metadata_survives_serde_roundtrip() {
        let cmd = Command::new("CountNumber", "user-1", json!({"number": 5}))
            .with_metadata(json!({"correlationId": "req-abc"}));

        let json = serde_json::to_string(&cmd).expect("serialization should succeed");
        let back: Command = serde_json::from_str(&json).expect("deserialization should succeed");

        assert_eq!(back, cmd);
    }
}
