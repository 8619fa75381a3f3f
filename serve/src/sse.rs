//! Bridges the `mpsc::Receiver<AgentEvent>` returned by `AgentService::start_run`
//! into an SSE response, translating domain events into `stream-event`'s wire shape
//! and injecting the run's envelope (session_id, run_id, sequence).

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use loom::AgentEvent;
use stream_event::{to_json, EnvelopeState, ProtocolEvent};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

fn to_protocol_event(event: AgentEvent) -> ProtocolEvent {
    match event {
        AgentEvent::TextDelta { delta } => ProtocolEvent::TextDelta { delta },
        AgentEvent::ToolCallStart { tool_call } => {
            ProtocolEvent::ToolCallStart { tool_call: serde_json::to_value(tool_call).unwrap_or_default() }
        }
        AgentEvent::ToolCallEnd { tool_result } => {
            ProtocolEvent::ToolCallEnd { tool_result: serde_json::to_value(tool_result).unwrap_or_default() }
        }
        AgentEvent::RunStatus { status, error } => ProtocolEvent::RunStatus { status, error },
        AgentEvent::Error { message } => ProtocolEvent::Error { message },
        AgentEvent::Done { usage } => ProtocolEvent::Done { usage: serde_json::to_value(usage).unwrap_or_default() },
    }
}

/// Wraps a run's event receiver into an SSE response, one `Event` per `AgentEvent`.
pub fn run_event_stream(
    session_id: String,
    run_id: String,
    rx: mpsc::Receiver<AgentEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut envelope = EnvelopeState::new(session_id, run_id);
    let stream = ReceiverStream::new(rx).map(move |event| {
        let protocol = to_protocol_event(event);
        let value = to_json(&protocol, &mut envelope).unwrap_or(serde_json::Value::Null);
        Ok(Event::default().json_data(value).unwrap_or_else(|_| Event::default().data("{}")))
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
