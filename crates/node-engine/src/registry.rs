//! Connection registry
//!
//! Owns the live graph: the ordered list of connections, the nodes they
//! touch, and a reverse index from `(target node, target port)` to the
//! connections feeding it.
//!
//! The graph is edge-centric. A node enters the registry when its first
//! connection is made and is pruned when its last connection goes away.
//! Every mutation validates fully before touching state, and the reverse
//! index is rebuilt from the connection list after each change so it can
//! never drift.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = ConnectionRegistry::new();
//! if !registry.add_connection(&input, "Processor", &phase, "Processor") {
//!     // show inline rejection in the editor
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConnectionRejection;
use crate::events::{emit, EventSink, NullEventSink, WorkflowEvent};
use crate::node::{Node, NodeHandle};
use crate::types::{Connection, NodeId, PortId};

/// Live nodes and the typed connections between their ports
pub struct ConnectionRegistry {
    /// Connections in creation order
    connections: Vec<Connection>,
    /// Live nodes by ID
    nodes: HashMap<NodeId, NodeHandle>,
    /// Live node IDs in the order they entered the registry
    node_order: Vec<NodeId>,
    /// Reverse lookup: (target node, target port) -> feeding connections
    input_index: HashMap<(NodeId, PortId), Vec<Connection>>,
    event_sink: Arc<dyn EventSink>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::with_event_sink(Arc::new(NullEventSink))
    }

    /// Create an empty registry that reports wiring changes to `event_sink`
    pub fn with_event_sink(event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            connections: Vec::new(),
            nodes: HashMap::new(),
            node_order: Vec::new(),
            input_index: HashMap::new(),
            event_sink,
        }
    }

    /// Connect `source.source_port` to `target.target_port`
    ///
    /// Returns `false`, leaving the registry unchanged, when a port is
    /// missing, the types are incompatible, or the connection already exists.
    pub fn add_connection(
        &mut self,
        source: &NodeHandle,
        source_port: &str,
        target: &NodeHandle,
        target_port: &str,
    ) -> bool {
        self.try_add_connection(source, source_port, target, target_port)
            .is_ok()
    }

    /// Like [`add_connection`](Self::add_connection), but reports why a
    /// connection was refused
    pub fn try_add_connection(
        &mut self,
        source: &NodeHandle,
        source_port: &str,
        target: &NodeHandle,
        target_port: &str,
    ) -> Result<Connection, ConnectionRejection> {
        // Locks are taken one at a time so a self-loop never re-locks.
        let source_type = source.lock().output_ports().get(source_port).cloned();
        let target_type = target.lock().input_ports().get(target_port).cloned();

        if source_type.is_none() {
            log::warn!("Source node {} has no output port {}", source.id(), source_port);
        }
        if target_type.is_none() {
            log::warn!("Target node {} has no input port {}", target.id(), target_port);
        }
        let (source_type, target_type) = match (source_type, target_type) {
            (Some(s), Some(t)) => (s, t),
            (None, _) => {
                return Err(ConnectionRejection::UnknownSourcePort {
                    node_id: source.id().to_string(),
                    port: source_port.to_string(),
                })
            }
            (_, None) => {
                return Err(ConnectionRejection::UnknownTargetPort {
                    node_id: target.id().to_string(),
                    port: target_port.to_string(),
                })
            }
        };

        if !target_type.accepts(&source_type) {
            log::warn!("Type mismatch: {} -> {}", source_type, target_type);
            return Err(ConnectionRejection::TypeMismatch {
                source_type,
                target_type,
            });
        }

        let connection = Connection::new(
            source.id(),
            source_port,
            target.id(),
            target_port,
            source_type,
        );

        if self.connections.contains(&connection) {
            log::debug!("Connection already exists: {}", connection);
            return Err(ConnectionRejection::Duplicate(connection.to_string()));
        }

        log::info!("Created connection: {}", connection);
        self.connections.push(connection.clone());
        self.register_node(source);
        self.register_node(target);
        self.rebuild_index();
        log::debug!("Live nodes: {}", self.nodes.len());

        emit(
            self.event_sink.as_ref(),
            WorkflowEvent::ConnectionAdded {
                connection: connection.to_string(),
            },
        );
        Ok(connection)
    }

    /// Remove the connection `source.source_port -> target.target_port`
    ///
    /// Returns `false` if no such connection exists. Either endpoint left
    /// without connections is pruned from the live graph.
    pub fn remove_connection(
        &mut self,
        source: &NodeHandle,
        source_port: &str,
        target: &NodeHandle,
        target_port: &str,
    ) -> bool {
        self.remove_connection_between(source.id(), source_port, target.id(), target_port)
    }

    /// ID-based form of [`remove_connection`](Self::remove_connection)
    pub fn remove_connection_between(
        &mut self,
        source_node_id: &str,
        source_port: &str,
        target_node_id: &str,
        target_port: &str,
    ) -> bool {
        let Some(pos) = self
            .connections
            .iter()
            .position(|c| c.matches(source_node_id, source_port, target_node_id, target_port))
        else {
            log::debug!(
                "Connection does not exist: {}.{} -> {}.{}",
                source_node_id,
                source_port,
                target_node_id,
                target_port
            );
            return false;
        };

        let removed = self.connections.remove(pos);
        log::info!("Removed connection: {}", removed);
        self.prune_if_unconnected(&removed.source_node_id);
        self.prune_if_unconnected(&removed.target_node_id);
        self.rebuild_index();
        log::debug!("Live nodes: {}", self.nodes.len());

        emit(
            self.event_sink.as_ref(),
            WorkflowEvent::ConnectionRemoved {
                connection: removed.to_string(),
            },
        );
        true
    }

    /// Remove a node by dropping every connection that touches it
    ///
    /// Neighbors left without connections are pruned too. Returns the removed
    /// connections in creation order; empty if the node was not live.
    pub fn remove_node(&mut self, node_id: &str) -> Vec<Connection> {
        let (removed, kept): (Vec<Connection>, Vec<Connection>) = self
            .connections
            .drain(..)
            .partition(|c| c.touches(node_id));
        self.connections = kept;

        if removed.is_empty() {
            return removed;
        }

        for connection in &removed {
            log::info!("Removed connection: {}", connection);
            emit(
                self.event_sink.as_ref(),
                WorkflowEvent::ConnectionRemoved {
                    connection: connection.to_string(),
                },
            );
        }
        for connection in &removed {
            self.prune_if_unconnected(&connection.source_node_id);
            self.prune_if_unconnected(&connection.target_node_id);
        }
        self.rebuild_index();
        removed
    }

    /// Connections leaving `node_id`, in creation order
    pub fn get_connections_from(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.source_node_id == node_id)
            .collect()
    }

    /// Connections entering `node_id`, in creation order
    pub fn get_connections_to(&self, node_id: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.target_node_id == node_id)
            .collect()
    }

    /// Connections feeding one input port, in creation order
    ///
    /// Returns an empty slice if nothing feeds the port.
    pub fn get_inputs_for(&self, node_id: &str, port: &str) -> &[Connection] {
        self.input_index
            .get(&(node_id.to_string(), port.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All connections in creation order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Live node IDs in the order they entered the registry
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Look up a live node
    pub fn node(&self, node_id: &str) -> Option<&NodeHandle> {
        self.nodes.get(node_id)
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Insert a node unless one with the same ID is already live
    fn register_node(&mut self, node: &NodeHandle) {
        if self.nodes.contains_key(node.id()) {
            return;
        }
        log::debug!("Added node: {}", node.id());
        self.nodes.insert(node.id().to_string(), node.clone());
        self.node_order.push(node.id().to_string());
    }

    /// Evict a node that no remaining connection references
    fn prune_if_unconnected(&mut self, node_id: &str) -> bool {
        if self.connections.iter().any(|c| c.touches(node_id)) {
            return false;
        }
        if self.nodes.remove(node_id).is_none() {
            return false;
        }
        self.node_order.retain(|id| id != node_id);
        log::info!("Removed node: {}", node_id);
        emit(
            self.event_sink.as_ref(),
            WorkflowEvent::NodePruned {
                node_id: node_id.to_string(),
            },
        );
        true
    }

    fn rebuild_index(&mut self) {
        let mut index: HashMap<(NodeId, PortId), Vec<Connection>> = HashMap::new();
        for connection in &self.connections {
            index
                .entry((connection.target_node_id.clone(), connection.target_port.clone()))
                .or_default()
                .push(connection.clone());
        }
        self.input_index = index;
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
