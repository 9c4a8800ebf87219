//! Node capability contract
//!
//! A node is an identity, two port declarations, a parameter bag and an
//! opaque `execute` payload. Concrete variants embed a [`NodeBase`] for the
//! bookkeeping and implement [`Node::execute`]; the registry and scheduler
//! only ever see `dyn Node`.
//!
//! Nodes are shared between the editor and the registry through
//! [`NodeHandle`], so parameters can be edited between runs while the
//! registry keeps the node live.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::error::{NodeEngineError, Result};
use crate::types::{NodeId, Parameters, PortDirection, PortMap, PortType, PortValues};

/// Identity, ports and parameters shared by every node variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBase {
    id: NodeId,
    label: String,
    position: (f64, f64),
    input_ports: PortMap,
    output_ports: PortMap,
    parameters: Parameters,
}

impl NodeBase {
    /// Create a node with no ports
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position: (0.0, 0.0),
            input_ports: PortMap::new(),
            output_ports: PortMap::new(),
            parameters: Parameters::new(),
        }
    }

    /// Create a node with a freshly generated ID
    pub fn generated(label: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), label)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn set_position(&mut self, position: (f64, f64)) {
        self.position = position;
    }

    pub fn input_ports(&self) -> &PortMap {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &PortMap {
        &self.output_ports
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Look up a parameter value
    pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
        self.parameters.get(name)
    }

    /// Insert or replace a parameter. Values are not validated here.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.parameters.insert(name.into(), value);
    }

    /// Register a port in the given direction
    ///
    /// Fails with `DuplicatePort` if the name is already declared in that
    /// direction; the existing declaration is left untouched.
    pub fn declare(
        &mut self,
        direction: PortDirection,
        name: impl Into<String>,
        port_type: PortType,
    ) -> Result<()> {
        let name = name.into();
        let ports = match direction {
            PortDirection::Input => &mut self.input_ports,
            PortDirection::Output => &mut self.output_ports,
        };
        if ports.contains_key(&name) {
            return Err(NodeEngineError::DuplicatePort {
                node_id: self.id.clone(),
                direction,
                port: name,
            });
        }
        ports.insert(name, port_type);
        Ok(())
    }

    /// Builder form of `declare(PortDirection::Input, ..)`
    pub fn with_input(mut self, name: impl Into<String>, port_type: impl Into<PortType>) -> Result<Self> {
        self.declare(PortDirection::Input, name, port_type.into())?;
        Ok(self)
    }

    /// Builder form of `declare(PortDirection::Output, ..)`
    pub fn with_output(mut self, name: impl Into<String>, port_type: impl Into<PortType>) -> Result<Self> {
        self.declare(PortDirection::Output, name, port_type.into())?;
        Ok(self)
    }

    /// Builder form of `set_parameter`
    pub fn with_parameter(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.set_parameter(name, value);
        self
    }
}

/// A graph vertex
///
/// Implementors provide access to their [`NodeBase`] and the `execute`
/// payload; everything else has a default implementation.
///
/// `execute` receives a value for every declared input port (the scheduler
/// fails the run before calling otherwise) and must return values only for
/// declared output ports. Returning an error aborts the
/// run that called it.
pub trait Node: Send {
    /// Shared bookkeeping
    fn base(&self) -> &NodeBase;

    /// Shared bookkeeping (mutable)
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Run the node's payload
    fn execute(&mut self, inputs: PortValues) -> Result<PortValues>;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn label(&self) -> &str {
        self.base().label()
    }

    fn input_ports(&self) -> &PortMap {
        self.base().input_ports()
    }

    fn output_ports(&self) -> &PortMap {
        self.base().output_ports()
    }

    fn parameters(&self) -> &Parameters {
        self.base().parameters()
    }

    /// Register an input port
    fn declare_input(&mut self, name: &str, port_type: PortType) -> Result<()> {
        self.base_mut().declare(PortDirection::Input, name, port_type)
    }

    /// Register an output port
    fn declare_output(&mut self, name: &str, port_type: PortType) -> Result<()> {
        self.base_mut().declare(PortDirection::Output, name, port_type)
    }

    /// Insert or replace a parameter
    fn set_parameter(&mut self, name: &str, value: serde_json::Value) {
        self.base_mut().set_parameter(name, value);
    }

    /// Check whether `self.source_port` may feed `target.target_port`
    ///
    /// True iff both ports exist and the target's declared type accepts the
    /// source's declared type.
    fn can_connect(&self, target: &dyn Node, source_port: &str, target_port: &str) -> bool {
        match (
            self.output_ports().get(source_port),
            target.input_ports().get(target_port),
        ) {
            (Some(source_type), Some(target_type)) => target_type.accepts(source_type),
            _ => false,
        }
    }
}

/// Shared, lockable reference to a node
///
/// The ID is cached outside the lock; a node's ID never changes after
/// construction.
#[derive(Clone)]
pub struct NodeHandle {
    id: NodeId,
    inner: Arc<Mutex<dyn Node>>,
}

impl NodeHandle {
    /// Wrap a node for sharing
    pub fn new<N: Node + 'static>(node: N) -> Self {
        Self {
            id: node.id().to_string(),
            inner: Arc::new(Mutex::new(node)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lock the node for reading or mutation
    pub fn lock(&self) -> MutexGuard<'_, dyn Node> {
        self.inner.lock()
    }

    /// Check whether both handles point at the same node
    pub fn ptr_eq(&self, other: &NodeHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle").field("id", &self.id).finish()
    }
}

type NodeCallback = Box<dyn FnMut(&NodeBase, PortValues) -> Result<PortValues> + Send>;

/// Node whose payload is a closure
///
/// Useful for collaborators that want to plug a computation into the graph
/// without defining a dedicated type.
pub struct FnNode {
    base: NodeBase,
    callback: NodeCallback,
}

impl FnNode {
    /// Create a closure-backed node
    pub fn new(
        base: NodeBase,
        callback: impl FnMut(&NodeBase, PortValues) -> Result<PortValues> + Send + 'static,
    ) -> Self {
        Self {
            base,
            callback: Box::new(callback),
        }
    }
}

impl Node for FnNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, inputs: PortValues) -> Result<PortValues> {
        (self.callback)(&self.base, inputs)
    }
}
