//! Node Engine - typed workflow graphs for MT data processing
//!
//! This crate provides the graph engine behind the node editor: nodes with
//! typed ports, a registry that validates and tracks the connections between
//! them, and a scheduler that runs the resulting graph once, in dependency
//! order. It supports:
//!
//! - Typed ports with an explicit `Any` input type
//! - Validated, idempotent connection edits with reasoned rejections
//! - Edge-centric node lifetime (nodes are pruned with their last connection)
//! - Topological scheduling with cycle detection
//! - Fail-fast execution with inspectable partial results
//! - Progress events and background execution
//!
//! # Architecture
//!
//! - `Node` / `NodeHandle`: the capability contract and its shared handle
//! - `ConnectionRegistry`: live nodes, connections and the input index
//! - `DependencyGraph`: successor lists and Kahn ordering over a snapshot
//! - `WorkflowScheduler`: orders and executes, routing outputs to inputs
//! - `EventSink`: generic event streaming (not tied to any GUI toolkit)
//!
//! # Example
//!
//! ```ignore
//! use node_engine::{ConnectionRegistry, WorkflowScheduler};
//!
//! let mut registry = ConnectionRegistry::new();
//! registry.add_connection(&input, "Processor", &phase, "Processor");
//!
//! let mut scheduler = WorkflowScheduler::new(&registry)?;
//! scheduler.prepare_execution()?;
//! let outputs = scheduler.execute()?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod node;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod types;

// Re-export key types
pub use config::SchedulerConfig;
pub use error::{ConnectionRejection, NodeEngineError, Result};
pub use events::{EventError, EventSink, NullEventSink, VecEventSink, WorkflowEvent};
pub use graph::DependencyGraph;
pub use node::{FnNode, Node, NodeBase, NodeHandle};
pub use registry::ConnectionRegistry;
pub use runner::{run_in_background, run_workflow, RunReport, RunStatus};
pub use scheduler::{ExecutionContext, RunFailure, RunState, WorkflowScheduler};
pub use types::{
    Connection, DataKind, NodeCategory, NodeId, Parameters, PortDirection, PortId, PortMap,
    PortType, PortValues,
};
