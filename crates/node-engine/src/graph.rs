//! Dependency graph derived from a registry snapshot
//!
//! Each connection contributes one arc from its source node to its target
//! node. Parallel connections between the same pair of nodes stay as
//! separate arcs, so in-degree counts edges rather than distinct
//! predecessors.

use std::collections::{HashMap, VecDeque};

use crate::error::{NodeEngineError, Result};
use crate::registry::ConnectionRegistry;
use crate::types::NodeId;

/// Successor lists over the live nodes of a registry
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in registry insertion order (tie-break order for scheduling)
    nodes: Vec<NodeId>,
    successors: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the graph from the registry's current nodes and connections
    pub fn from_registry(registry: &ConnectionRegistry) -> Self {
        let nodes = registry.node_ids().to_vec();
        let mut successors: HashMap<NodeId, Vec<NodeId>> =
            nodes.iter().map(|id| (id.clone(), Vec::new())).collect();

        for connection in registry.connections() {
            if !successors.contains_key(&connection.target_node_id) {
                continue;
            }
            if let Some(targets) = successors.get_mut(&connection.source_node_id) {
                targets.push(connection.target_node_id.clone());
            }
        }

        Self { nodes, successors }
    }

    /// Node IDs in tie-break order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Targets of every arc leaving `node_id`, one entry per connection
    pub fn successors(&self, node_id: &str) -> &[NodeId] {
        self.successors
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of arcs entering each node
    pub fn in_degrees(&self) -> HashMap<&str, usize> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|id| (id.as_str(), 0)).collect();
        for targets in self.successors.values() {
            for target in targets {
                *in_degree.entry(target.as_str()).or_insert(0) += 1;
            }
        }
        in_degree
    }

    /// Number of arcs entering one node
    pub fn in_degree(&self, node_id: &str) -> usize {
        self.in_degrees().get(node_id).copied().unwrap_or(0)
    }

    /// Order nodes so every arc points forward (Kahn's algorithm)
    ///
    /// Ready nodes are taken in insertion order. Fails with
    /// `CyclicWorkflow` listing the nodes that could not be ordered; no
    /// partial order is returned.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut in_degree = self.in_degrees();

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut order: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop_front() {
            order.push(node_id.to_string());
            for target in self.successors(node_id) {
                if let Some(deg) = in_degree.get_mut(target.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(target.as_str());
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let unresolved: Vec<NodeId> = self
                .nodes
                .iter()
                .filter(|id| !order.contains(*id))
                .cloned()
                .collect();
            return Err(NodeEngineError::CyclicWorkflow { unresolved });
        }

        Ok(order)
    }
}
