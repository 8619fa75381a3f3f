//! Envelope (session_id, run_id, sequence) injected into every streamed event
//! (data_model §AgentEvent: "Emitted lazily over a bounded channel").
//!
//! `EnvelopeState` tracks the per-run sequence counter and injects the envelope
//! into each event as it crosses the wire.

use crate::event::ProtocolEvent;
use serde_json::Value;

/// Envelope fields applied to every event on the wire.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Session ID; constant within a session, across runs.
    pub session_id: Option<String>,
    /// Run ID; constant for every event within one run.
    pub run_id: Option<String>,
    /// Per-event sequence number; monotonically increasing within a run.
    pub sequence: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    pub fn with_sequence(mut self, seq: u64) -> Self {
        self.sequence = Some(seq);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.session_id {
            obj.entry("session_id").or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(ref id) = self.run_id {
            obj.entry("run_id").or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(seq) = self.sequence {
            obj.entry("sequence").or_insert_with(|| Value::Number(serde_json::Number::from(seq)));
        }
    }
}

/// Envelope state for one run: session id, run id, and the next sequence number.
pub struct EnvelopeState {
    pub session_id: String,
    pub run_id: String,
    pub next_sequence: u64,
}

impl EnvelopeState {
    pub fn new(session_id: String, run_id: String) -> Self {
        Self { session_id, run_id, next_sequence: 1 }
    }

    /// Injects the envelope into the event value and advances the sequence counter.
    pub fn inject_into(&mut self, value: &mut Value) {
        let env = Envelope::new()
            .with_session_id(&self.session_id)
            .with_run_id(&self.run_id)
            .with_sequence(self.next_sequence);
        self.next_sequence += 1;
        env.inject_into(value);
    }
}

/// Converts a protocol event to JSON and injects the envelope using the given state.
/// Returns the final value (type + payload + session_id, run_id, sequence).
pub fn to_json(event: &ProtocolEvent, state: &mut EnvelopeState) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ProtocolEvent;

    #[test]
    fn envelope_inject_does_not_overwrite_existing_keys() {
        let mut obj = serde_json::json!({"type":"text_delta","delta":"hi","session_id":"keep-me"});
        let env = Envelope::new().with_session_id("sess-1").with_run_id("run-1").with_sequence(1);
        env.inject_into(&mut obj);
        assert_eq!(obj["session_id"], "keep-me");
        assert_eq!(obj["run_id"], "run-1");
        assert_eq!(obj["sequence"], 1);
    }

    #[test]
    fn to_json_injects_envelope_and_advances_sequence() {
        let ev = ProtocolEvent::TextDelta { delta: "hi".into() };
        let mut state = EnvelopeState::new("sess-1".to_string(), "run-1".to_string());
        let first = to_json(&ev, &mut state).unwrap();
        assert_eq!(first["sequence"], 1);
        let second = to_json(&ev, &mut state).unwrap();
        assert_eq!(second["sequence"], 2);
        assert_eq!(first["session_id"], "sess-1");
        assert_eq!(first["run_id"], "run-1");
    }
}
