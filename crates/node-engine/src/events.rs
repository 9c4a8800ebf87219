//! Event types for streaming graph and workflow progress
//!
//! Events are sent from the registry and scheduler to the editor (or any
//! consumer) to report wiring changes, per-node progress and run outcome.
//! Sending is best effort: a failing sink is logged and never stops a run.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trait for sending workflow events
///
/// This abstracts over the transport mechanism (GUI signal, mpsc, etc.)
/// allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by the registry and scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    /// A connection was registered
    #[serde(rename_all = "camelCase")]
    ConnectionAdded { connection: String },

    /// A connection was removed
    #[serde(rename_all = "camelCase")]
    ConnectionRemoved { connection: String },

    /// A node lost its last connection and left the live graph
    #[serde(rename_all = "camelCase")]
    NodePruned { node_id: String },

    /// Workflow execution started
    #[serde(rename_all = "camelCase")]
    WorkflowStarted {
        workflow_id: String,
        execution_id: String,
        order: Vec<String>,
    },

    /// Every node in the order executed
    #[serde(rename_all = "camelCase")]
    WorkflowCompleted {
        workflow_id: String,
        execution_id: String,
    },

    /// The run stopped at the first failure
    #[serde(rename_all = "camelCase")]
    WorkflowAborted {
        workflow_id: String,
        execution_id: String,
        node_id: String,
        error: String,
    },

    /// A node started executing
    #[serde(rename_all = "camelCase")]
    NodeStarted { node_id: String, execution_id: String },

    /// A node finished executing
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        node_id: String,
        execution_id: String,
        output: Option<serde_json::Value>,
    },

    /// A node failed
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        node_id: String,
        execution_id: String,
        error: String,
    },
}

/// Send an event, logging rather than propagating sink failures
pub(crate) fn emit(sink: &dyn EventSink, event: WorkflowEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropping workflow event: {}", e);
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedSink;

    impl EventSink for ClosedSink {
        fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
            Err(EventError::channel_closed())
        }
    }

    #[test]
    fn test_event_error_display() {
        let err: Box<dyn std::error::Error> = Box::new(EventError::channel_closed());
        assert_eq!(err.to_string(), "Event error: Channel closed");
    }

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(WorkflowEvent::NodePruned {
            node_id: "input".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);

        match &events[0] {
            WorkflowEvent::NodePruned { node_id } => assert_eq!(node_id, "input"),
            _ => panic!("Expected NodePruned event"),
        }

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(WorkflowEvent::NodePruned {
            node_id: "input".to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_emit_swallows_sink_errors() {
        emit(
            &ClosedSink,
            WorkflowEvent::NodePruned {
                node_id: "input".to_string(),
            },
        );
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = WorkflowEvent::NodeStarted {
            node_id: "phase".to_string(),
            execution_id: "exec-1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "nodeStarted", "nodeId": "phase", "executionId": "exec-1"})
        );
    }
}
