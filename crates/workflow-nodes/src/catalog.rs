//! Node catalog
//!
//! Every node type registers a [`NodeDescriptor`] at link time with
//! `inventory::submit!`. The editor's palette and workflow loaders build
//! nodes by type name through a [`NodeCatalog`].
//!
//! ```ignore
//! inventory::submit!(workflow_nodes::NodeDescriptor {
//!     node_type: "phase-tensor",
//!     label: "Phase Tensor",
//!     category: NodeCategory::Processing,
//!     factory: |id, label, backend| Ok(NodeHandle::new(PhaseTensorNode::new(id, label, backend)?)),
//! });
//! ```

use std::collections::BTreeMap;

use node_engine::{NodeCategory, NodeEngineError, NodeHandle, NodeId, Result};

use crate::backend::SharedBackend;

/// Builds a node from its ID, display label and the shared backend
pub type NodeFactory = fn(NodeId, String, SharedBackend) -> Result<NodeHandle>;

/// Link-time registration of a node type
pub struct NodeDescriptor {
    /// Stable type name used in saved workflows
    pub node_type: &'static str,
    /// Default display label
    pub label: &'static str,
    pub category: NodeCategory,
    pub factory: NodeFactory,
}

inventory::collect!(NodeDescriptor);

/// Lookup of node types by name
#[derive(Default)]
pub struct NodeCatalog {
    descriptors: BTreeMap<&'static str, &'static NodeDescriptor>,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of every descriptor linked into the binary
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for descriptor in inventory::iter::<NodeDescriptor> {
            catalog.register(descriptor);
        }
        log::debug!("Node catalog holds {} node types", catalog.len());
        catalog
    }

    /// Register a descriptor, replacing any with the same type name
    pub fn register(&mut self, descriptor: &'static NodeDescriptor) {
        if self
            .descriptors
            .insert(descriptor.node_type, descriptor)
            .is_some()
        {
            log::warn!("Node type '{}' registered twice", descriptor.node_type);
        }
    }

    pub fn descriptor(&self, node_type: &str) -> Option<&'static NodeDescriptor> {
        self.descriptors.get(node_type).copied()
    }

    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.descriptors.contains_key(node_type)
    }

    /// Type names in sorted order
    pub fn node_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }

    pub fn by_category(&self, category: NodeCategory) -> Vec<&'static NodeDescriptor> {
        self.descriptors
            .values()
            .copied()
            .filter(|d| d.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Build a node of `node_type` with its default label
    pub fn create(
        &self,
        node_type: &str,
        id: impl Into<NodeId>,
        backend: SharedBackend,
    ) -> Result<NodeHandle> {
        let descriptor = self.descriptor(node_type).ok_or_else(|| {
            NodeEngineError::failed(format!("Unknown node type '{}'", node_type))
        })?;
        (descriptor.factory)(id.into(), descriptor.label.to_string(), backend)
    }
}
