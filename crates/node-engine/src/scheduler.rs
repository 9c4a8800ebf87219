//! One-shot workflow scheduler
//!
//! Orders the registry's live nodes topologically and runs them, routing
//! each node's outputs into the inputs of its successors.
//!
//! # Key Concepts
//!
//! - **Snapshot**: the scheduler borrows the registry for its whole lifetime,
//!   so the graph cannot be rewired while a run is being prepared or executed
//! - **Fail-fast**: the first missing input or node failure stops the run;
//!   nodes that already ran keep their side effects and outputs
//! - **Fan-in**: when several connections feed one input port, they are
//!   applied in creation order and the last one wins
//!
//! # Run states
//!
//! `Unscheduled -> Ordered -> Running -> Completed | Aborted`. A cycle found
//! while ordering moves straight to `Aborted`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::{NodeEngineError, Result};
use crate::events::{emit, EventSink, NullEventSink, WorkflowEvent};
use crate::graph::DependencyGraph;
use crate::node::Node;
use crate::registry::ConnectionRegistry;
use crate::types::{NodeId, PortId, PortValues};

/// Outputs recorded during a run, keyed by node ID
pub type ExecutionContext = HashMap<NodeId, PortValues>;

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Unscheduled,
    Ordered,
    Running,
    Completed,
    Aborted,
}

/// The failure that aborted a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    /// Node being executed or ordered when the run stopped, if any
    pub node_id: Option<NodeId>,
    pub message: String,
}

/// Orders and executes the live graph of a [`ConnectionRegistry`]
pub struct WorkflowScheduler<'a> {
    registry: &'a ConnectionRegistry,
    config: SchedulerConfig,
    event_sink: Arc<dyn EventSink>,
    execution_id: String,
    order: Vec<NodeId>,
    prepared: bool,
    state: RunState,
    context: ExecutionContext,
    failure: Option<RunFailure>,
}

impl<'a> WorkflowScheduler<'a> {
    /// Create a scheduler over `registry` with default settings
    ///
    /// Fails with `EmptyWorkflow` if the registry has no connections.
    pub fn new(registry: &'a ConnectionRegistry) -> Result<Self> {
        Self::with_config(registry, SchedulerConfig::default(), Arc::new(NullEventSink))
    }

    /// Create a scheduler with explicit settings and an event sink
    pub fn with_config(
        registry: &'a ConnectionRegistry,
        config: SchedulerConfig,
        event_sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        if registry.is_empty() {
            return Err(NodeEngineError::EmptyWorkflow);
        }
        Ok(Self {
            registry,
            config,
            event_sink,
            execution_id: uuid::Uuid::new_v4().to_string(),
            order: Vec::new(),
            prepared: false,
            state: RunState::Unscheduled,
            context: ExecutionContext::new(),
            failure: None,
        })
    }

    /// Build the dependency graph for the registry's current snapshot
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_registry(self.registry)
    }

    /// Compute the execution order
    ///
    /// On a cycle the state becomes `Aborted`, any previous order is
    /// discarded and `CyclicWorkflow` is returned.
    pub fn prepare_execution(&mut self) -> Result<&[NodeId]> {
        match self.dependency_graph().topological_order() {
            Ok(order) => {
                log::info!("Execution order: {:?}", order);
                self.order = order;
                self.prepared = true;
                self.state = RunState::Ordered;
                Ok(&self.order)
            }
            Err(e) => {
                log::error!("Cannot schedule workflow: {}", e);
                self.order.clear();
                self.prepared = false;
                self.state = RunState::Aborted;
                self.failure = Some(RunFailure {
                    node_id: None,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Run every node in the prepared order
    ///
    /// Returns the outputs of all nodes that ran. A node that fails stops
    /// the run: the failure is logged, recorded in [`failure`](Self::failure)
    /// and the partial context is returned. A missing input stops the run
    /// with `MissingInput` (or `UnconnectedInput` for a declared port no
    /// connection feeds); the partial context stays available through
    /// [`context`](Self::context). Each call is a new run with a fresh
    /// execution ID.
    pub fn execute(&mut self) -> Result<ExecutionContext> {
        if !self.prepared {
            return Err(NodeEngineError::NotPrepared);
        }

        self.execution_id = uuid::Uuid::new_v4().to_string();
        self.context.clear();
        self.failure = None;
        self.state = RunState::Running;
        emit(
            self.event_sink.as_ref(),
            WorkflowEvent::WorkflowStarted {
                workflow_id: self.config.workflow_id.clone(),
                execution_id: self.execution_id.clone(),
                order: self.order.clone(),
            },
        );

        let order = self.order.clone();
        for node_id in &order {
            let inputs = match self.gather_inputs(node_id) {
                Ok(inputs) => inputs,
                Err(e) => {
                    self.abort(node_id, &e);
                    return Err(e);
                }
            };

            emit(
                self.event_sink.as_ref(),
                WorkflowEvent::NodeStarted {
                    node_id: node_id.clone(),
                    execution_id: self.execution_id.clone(),
                },
            );

            match self.run_node(node_id, inputs) {
                Ok(outputs) => {
                    log::debug!("Node {} finished with {} outputs", node_id, outputs.len());
                    let output = if self.config.include_outputs_in_events {
                        Some(serde_json::to_value(&outputs)?)
                    } else {
                        None
                    };
                    emit(
                        self.event_sink.as_ref(),
                        WorkflowEvent::NodeCompleted {
                            node_id: node_id.clone(),
                            execution_id: self.execution_id.clone(),
                            output,
                        },
                    );
                    self.context.insert(node_id.clone(), outputs);
                }
                Err(e) => {
                    log::error!("Node {} failed: {}", node_id, e);
                    emit(
                        self.event_sink.as_ref(),
                        WorkflowEvent::NodeFailed {
                            node_id: node_id.clone(),
                            execution_id: self.execution_id.clone(),
                            error: e.to_string(),
                        },
                    );
                    self.abort(node_id, &e);
                    return Ok(self.context.clone());
                }
            }
        }

        self.state = RunState::Completed;
        log::info!("Workflow {} completed", self.config.workflow_id);
        emit(
            self.event_sink.as_ref(),
            WorkflowEvent::WorkflowCompleted {
                workflow_id: self.config.workflow_id.clone(),
                execution_id: self.execution_id.clone(),
            },
        );
        Ok(self.context.clone())
    }

    /// Collect the inputs for one node from already-recorded outputs
    ///
    /// Connections are applied in creation order, so with fan-in the last
    /// connection registered for a port wins. Every declared input port is
    /// guaranteed a value; otherwise this fails before the node runs.
    pub fn gather_inputs(&self, node_id: &str) -> Result<PortValues> {
        let mut inputs = PortValues::new();
        for connection in self.registry.get_connections_to(node_id) {
            let value = self
                .context
                .get(&connection.source_node_id)
                .and_then(|outputs| outputs.get(&connection.source_port))
                .ok_or_else(|| NodeEngineError::MissingInput {
                    node_id: node_id.to_string(),
                    source_node_id: connection.source_node_id.clone(),
                    source_port: connection.source_port.clone(),
                })?;
            inputs.insert(connection.target_port.clone(), value.clone());
        }

        let handle = self
            .registry
            .node(node_id)
            .ok_or_else(|| NodeEngineError::UnknownNode(node_id.to_string()))?;
        let node = handle.lock();
        if let Some(port) = node.input_ports().keys().find(|p| !inputs.contains_key(*p)) {
            return Err(NodeEngineError::UnconnectedInput {
                node_id: node_id.to_string(),
                port: port.clone(),
            });
        }
        Ok(inputs)
    }

    fn run_node(&self, node_id: &str, inputs: PortValues) -> Result<PortValues> {
        let handle = self
            .registry
            .node(node_id)
            .ok_or_else(|| NodeEngineError::UnknownNode(node_id.to_string()))?;

        let mut node = handle.lock();
        log::info!("Executing node {} ({})", node_id, node.label());
        let outputs = node.execute(inputs)?;

        if self.config.enforce_declared_outputs {
            let mut undeclared: Vec<PortId> = outputs
                .keys()
                .filter(|k| !node.output_ports().contains_key(*k))
                .cloned()
                .collect();
            if !undeclared.is_empty() {
                undeclared.sort();
                return Err(NodeEngineError::UndeclaredOutput {
                    node_id: node_id.to_string(),
                    ports: undeclared,
                });
            }
        }
        Ok(outputs)
    }

    fn abort(&mut self, node_id: &str, error: &NodeEngineError) {
        log::warn!(
            "Workflow {} aborted at node {}; {} of {} nodes ran",
            self.config.workflow_id,
            node_id,
            self.context.len(),
            self.order.len()
        );
        self.state = RunState::Aborted;
        self.failure = Some(RunFailure {
            node_id: Some(node_id.to_string()),
            message: error.to_string(),
        });
        emit(
            self.event_sink.as_ref(),
            WorkflowEvent::WorkflowAborted {
                workflow_id: self.config.workflow_id.clone(),
                execution_id: self.execution_id.clone(),
                node_id: node_id.to_string(),
                error: error.to_string(),
            },
        );
    }

    /// Last computed execution order (empty until prepared)
    pub fn execution_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Outputs recorded by the latest run, complete or partial
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Why the latest run or ordering attempt stopped, if it did
    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    /// ID of the latest run (regenerated by every `execute`)
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::node::{FnNode, NodeBase, NodeHandle};
    use crate::types::{DataKind, PortType};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn processor() -> PortType {
        PortType::Concrete(DataKind::Processor)
    }

    fn source(id: &str, value: serde_json::Value) -> NodeHandle {
        let base = NodeBase::new(id, id).with_output("out", processor()).unwrap();
        NodeHandle::new(FnNode::new(base, move |_, _| {
            Ok(PortValues::from([("out".to_string(), value.clone())]))
        }))
    }

    /// Appends its own ID to the incoming list
    fn stage(id: &str) -> NodeHandle {
        let base = NodeBase::new(id, id)
            .with_input("in", processor())
            .unwrap()
            .with_output("out", processor())
            .unwrap();
        NodeHandle::new(FnNode::new(base, |base, inputs| {
            let mut trail = inputs
                .get("in")
                .and_then(|v| v.as_array().cloned())
                .ok_or_else(|| NodeEngineError::failed("expected a list"))?;
            trail.push(json!(base.id()));
            Ok(PortValues::from([("out".to_string(), json!(trail))]))
        }))
    }

    fn failing(id: &str) -> NodeHandle {
        let base = NodeBase::new(id, id)
            .with_input("in", processor())
            .unwrap()
            .with_output("out", processor())
            .unwrap();
        NodeHandle::new(FnNode::new(base, |_, _| Err(NodeEngineError::failed("boom"))))
    }

    #[test]
    fn test_empty_registry_rejected() {
        let registry = ConnectionRegistry::new();
        assert!(matches!(
            WorkflowScheduler::new(&registry),
            Err(NodeEngineError::EmptyWorkflow)
        ));
    }

    #[test]
    fn test_execute_requires_prepare() {
        let mut registry = ConnectionRegistry::new();
        registry.add_connection(&source("a", json!([])), "out", &stage("b"), "in");
        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        assert_eq!(scheduler.state(), RunState::Unscheduled);
        assert!(matches!(scheduler.execute(), Err(NodeEngineError::NotPrepared)));
    }

    #[test]
    fn test_linear_pipeline() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut registry = ConnectionRegistry::new();
        let input = source("input", json!([]));
        let phase = stage("phase");
        let apparent = stage("apparent");
        registry.add_connection(&input, "out", &phase, "in");
        registry.add_connection(&phase, "out", &apparent, "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        assert_eq!(scheduler.prepare_execution().unwrap(), ["input", "phase", "apparent"]);
        assert_eq!(scheduler.state(), RunState::Ordered);

        let context = scheduler.execute().unwrap();
        assert_eq!(scheduler.state(), RunState::Completed);
        assert_eq!(context.len(), 3);
        assert_eq!(context["apparent"]["out"], json!(["phase", "apparent"]));
        assert!(scheduler.failure().is_none());
    }

    #[test]
    fn test_fan_in_last_write_wins() {
        let mut registry = ConnectionRegistry::new();
        let first = source("first", json!(["first"]));
        let second = source("second", json!(["second"]));
        let sink = stage("sink");
        registry.add_connection(&first, "out", &sink, "in");
        registry.add_connection(&second, "out", &sink, "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        scheduler.prepare_execution().unwrap();
        let inputs_seen = scheduler.execute().unwrap();
        assert_eq!(inputs_seen["sink"]["out"], json!(["second", "sink"]));
    }

    #[test]
    fn test_cycle_aborts_before_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let make = |id: &str| {
            let calls = calls.clone();
            let base = NodeBase::new(id, id)
                .with_input("in", processor())
                .unwrap()
                .with_output("out", processor())
                .unwrap();
            NodeHandle::new(FnNode::new(base, move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(PortValues::new())
            }))
        };
        let (a, b) = (make("a"), make("b"));
        let mut registry = ConnectionRegistry::new();
        registry.add_connection(&a, "out", &b, "in");
        registry.add_connection(&b, "out", &a, "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        assert!(matches!(
            scheduler.prepare_execution(),
            Err(NodeEngineError::CyclicWorkflow { .. })
        ));
        assert_eq!(scheduler.state(), RunState::Aborted);
        assert!(scheduler.execution_order().is_empty());
        assert!(matches!(scheduler.execute(), Err(NodeEngineError::NotPrepared)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_node_failure_returns_partial_context() {
        let sink = Arc::new(VecEventSink::new());
        let mut registry = ConnectionRegistry::new();
        let input = source("input", json!([]));
        let broken = failing("broken");
        let after = stage("after");
        registry.add_connection(&input, "out", &broken, "in");
        registry.add_connection(&broken, "out", &after, "in");

        let mut scheduler =
            WorkflowScheduler::with_config(&registry, SchedulerConfig::default(), sink.clone())
                .unwrap();
        scheduler.prepare_execution().unwrap();
        let context = scheduler.execute().unwrap();

        assert_eq!(scheduler.state(), RunState::Aborted);
        assert!(context.contains_key("input"));
        assert!(!context.contains_key("broken"));
        assert!(!context.contains_key("after"));

        let failure = scheduler.failure().unwrap();
        assert_eq!(failure.node_id.as_deref(), Some("broken"));
        assert!(failure.message.contains("boom"));

        let events = sink.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::NodeFailed { node_id, .. } if node_id == "broken")));
        assert!(!events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::NodeStarted { node_id, .. } if node_id == "after")));
        assert!(matches!(events.last(), Some(WorkflowEvent::WorkflowAborted { .. })));
    }

    #[test]
    fn test_missing_output_key_is_missing_input() {
        let mut registry = ConnectionRegistry::new();
        let silent = NodeHandle::new(FnNode::new(
            NodeBase::new("silent", "silent").with_output("out", processor()).unwrap(),
            |_, _| Ok(PortValues::new()),
        ));
        let after = stage("after");
        registry.add_connection(&silent, "out", &after, "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        scheduler.prepare_execution().unwrap();
        let err = scheduler.execute().unwrap_err();
        match err {
            NodeEngineError::MissingInput {
                node_id,
                source_node_id,
                source_port,
            } => {
                assert_eq!(node_id, "after");
                assert_eq!(source_node_id, "silent");
                assert_eq!(source_port, "out");
            }
            other => panic!("Expected MissingInput, got {other:?}"),
        }
        assert_eq!(scheduler.state(), RunState::Aborted);
        assert!(scheduler.context().contains_key("silent"));
    }

    #[test]
    fn test_undeclared_output_fails_node() {
        let mut registry = ConnectionRegistry::new();
        let sloppy = NodeHandle::new(FnNode::new(
            NodeBase::new("sloppy", "sloppy").with_output("out", processor()).unwrap(),
            |_, _| {
                Ok(PortValues::from([
                    ("out".to_string(), json!([])),
                    ("typo".to_string(), json!(1)),
                ]))
            },
        ));
        registry.add_connection(&sloppy, "out", &stage("after"), "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        scheduler.prepare_execution().unwrap();
        let context = scheduler.execute().unwrap();
        assert!(context.is_empty());
        assert_eq!(scheduler.state(), RunState::Aborted);

        let relaxed = SchedulerConfig {
            enforce_declared_outputs: false,
            ..SchedulerConfig::default()
        };
        let mut scheduler =
            WorkflowScheduler::with_config(&registry, relaxed, Arc::new(NullEventSink)).unwrap();
        scheduler.prepare_execution().unwrap();
        scheduler.execute().unwrap();
        assert_eq!(scheduler.state(), RunState::Completed);
    }

    #[test]
    fn test_unfed_declared_input_stops_before_node_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let mid = NodeHandle::new(FnNode::new(
            NodeBase::new("mid", "mid")
                .with_input("required", PortType::Any)
                .unwrap()
                .with_output("out", processor())
                .unwrap(),
            move |_, _| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(PortValues::from([("out".to_string(), json!([]))]))
            },
        ));
        let mut registry = ConnectionRegistry::new();
        registry.add_connection(&mid, "out", &stage("sink"), "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        scheduler.prepare_execution().unwrap();
        match scheduler.execute() {
            Err(NodeEngineError::UnconnectedInput { node_id, port }) => {
                assert_eq!(node_id, "mid");
                assert_eq!(port, "required");
            }
            other => panic!("Expected UnconnectedInput, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.state(), RunState::Aborted);
        assert!(scheduler.context().is_empty());
        assert_eq!(
            scheduler.failure().and_then(|f| f.node_id.as_deref()),
            Some("mid")
        );
    }

    #[test]
    fn test_undeclared_outputs_reported_sorted() {
        let mut registry = ConnectionRegistry::new();
        let sloppy = NodeHandle::new(FnNode::new(
            NodeBase::new("sloppy", "sloppy").with_output("out", processor()).unwrap(),
            |_, _| {
                Ok(PortValues::from([
                    ("out".to_string(), json!([])),
                    ("zeta".to_string(), json!(1)),
                    ("alpha".to_string(), json!(2)),
                    ("mid".to_string(), json!(3)),
                ]))
            },
        ));
        registry.add_connection(&sloppy, "out", &stage("after"), "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        scheduler.prepare_execution().unwrap();
        scheduler.execute().unwrap();
        let failure = scheduler.failure().unwrap();
        assert!(failure.message.ends_with("undeclared outputs: alpha, mid, zeta"));
    }

    #[test]
    fn test_each_run_gets_new_execution_id() {
        let sink = Arc::new(VecEventSink::new());
        let mut registry = ConnectionRegistry::new();
        registry.add_connection(&source("a", json!([])), "out", &stage("b"), "in");

        let mut scheduler =
            WorkflowScheduler::with_config(&registry, SchedulerConfig::default(), sink.clone())
                .unwrap();
        scheduler.prepare_execution().unwrap();
        scheduler.execute().unwrap();
        let first_id = scheduler.execution_id().to_string();
        scheduler.execute().unwrap();
        assert_ne!(scheduler.execution_id(), first_id);

        let started: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                WorkflowEvent::WorkflowStarted { execution_id, .. } => Some(execution_id),
                _ => None,
            })
            .collect();
        assert_eq!(started.len(), 2);
        assert_ne!(started[0], started[1]);
        assert_eq!(started[1], scheduler.execution_id());
    }

    #[test]
    fn test_events_for_completed_run() {
        let sink = Arc::new(VecEventSink::new());
        let mut registry = ConnectionRegistry::new();
        registry.add_connection(&source("a", json!([])), "out", &stage("b"), "in");

        let config = SchedulerConfig {
            include_outputs_in_events: true,
            ..SchedulerConfig::default().with_workflow_id("profile")
        };
        let mut scheduler = WorkflowScheduler::with_config(&registry, config, sink.clone()).unwrap();
        scheduler.prepare_execution().unwrap();
        scheduler.execute().unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 6);
        assert!(matches!(
            &events[0],
            WorkflowEvent::WorkflowStarted { workflow_id, order, .. }
                if workflow_id == "profile" && order == &["a", "b"]
        ));
        match &events[4] {
            WorkflowEvent::NodeCompleted { node_id, output, .. } => {
                assert_eq!(node_id, "b");
                assert_eq!(output, &Some(json!({"out": ["b"]})));
            }
            other => panic!("Expected NodeCompleted, got {other:?}"),
        }
        assert!(matches!(&events[5], WorkflowEvent::WorkflowCompleted { .. }));
    }

    #[test]
    fn test_rerun_resets_context() {
        let mut registry = ConnectionRegistry::new();
        registry.add_connection(&source("a", json!([])), "out", &stage("b"), "in");

        let mut scheduler = WorkflowScheduler::new(&registry).unwrap();
        scheduler.prepare_execution().unwrap();
        let first = scheduler.execute().unwrap();
        let second = scheduler.execute().unwrap();
        assert_eq!(first, second);
        assert_eq!(scheduler.state(), RunState::Completed);
    }
}
