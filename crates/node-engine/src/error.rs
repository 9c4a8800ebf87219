//! Error types for the node engine
//!
//! Two families live here. `NodeEngineError` covers structural and run-time
//! failures that stop a workflow. `ConnectionRejection` explains why a
//! registry mutation was refused; rejections are recoverable and never abort
//! anything.

use thiserror::Error;

use crate::types::{NodeId, PortDirection, PortId, PortType};

/// Result type alias using NodeEngineError
pub type Result<T> = std::result::Result<T, NodeEngineError>;

/// Errors that can occur in the node engine
#[derive(Debug, Error)]
pub enum NodeEngineError {
    /// A port name was declared twice in the same direction
    #[error("Node '{node_id}' already declares an {direction} port named '{port}'")]
    DuplicatePort {
        node_id: NodeId,
        direction: PortDirection,
        port: PortId,
    },

    /// The registry has no connections, so there is nothing to schedule
    #[error("Workflow has no connections")]
    EmptyWorkflow,

    /// The live graph contains at least one cycle
    #[error("Workflow contains a cycle through: {}", unresolved.join(", "))]
    CyclicWorkflow { unresolved: Vec<NodeId> },

    /// `execute` was called without a successful `prepare_execution`
    #[error("Workflow has no execution order; call prepare_execution first")]
    NotPrepared,

    /// An upstream output needed by a connection was never produced
    #[error("Missing input for node '{node_id}': {source_node_id}.{source_port}")]
    MissingInput {
        node_id: NodeId,
        source_node_id: NodeId,
        source_port: PortId,
    },

    /// A declared input port has no incoming connection to fill it
    #[error("Node '{node_id}' has no value for declared input '{port}'")]
    UnconnectedInput { node_id: NodeId, port: PortId },

    /// The execution order references a node the registry no longer holds
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// A node returned values for ports it never declared (sorted)
    #[error("Node '{node_id}' produced undeclared outputs: {}", ports.join(", "))]
    UndeclaredOutput { node_id: NodeId, ports: Vec<PortId> },

    /// A node parameter is missing or holds an unusable value
    #[error("Invalid parameter '{name}' on node '{node_id}': {reason}")]
    InvalidParameter {
        node_id: NodeId,
        name: String,
        reason: String,
    },

    /// Node payload failed
    #[error("Node execution failed: {0}")]
    ExecutionFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background run could not be joined
    #[error("Background run failed to complete: {0}")]
    Join(String),
}

impl NodeEngineError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        node_id: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            node_id: node_id.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Why `ConnectionRegistry::try_add_connection` refused a connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionRejection {
    /// The source node has no output port with this name
    #[error("Source node '{node_id}' has no output port '{port}'")]
    UnknownSourcePort { node_id: NodeId, port: PortId },

    /// The target node has no input port with this name
    #[error("Target node '{node_id}' has no input port '{port}'")]
    UnknownTargetPort { node_id: NodeId, port: PortId },

    /// The declared types do not line up
    #[error("Type mismatch: {source_type} -> {target_type}")]
    TypeMismatch {
        source_type: PortType,
        target_type: PortType,
    },

    /// An identical connection is already registered
    #[error("Connection already exists: {0}")]
    Duplicate(String),
}
