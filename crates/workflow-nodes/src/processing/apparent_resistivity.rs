//! Apparent Resistivity Node

use node_engine::{DataKind, Node, NodeBase, NodeCategory, NodeHandle, NodeId, PortValues, Result};

use crate::backend::{stages, ProcessorState, SharedBackend};
use crate::catalog::NodeDescriptor;

/// Adds apparent resistivity and phase to the processor state
pub struct ApparentResistivityNode {
    base: NodeBase,
    backend: SharedBackend,
}

impl ApparentResistivityNode {
    pub const NODE_TYPE: &'static str = "apparent-resistivity";
    pub const PORT_PROCESSOR: &'static str = "Processor";

    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        backend: SharedBackend,
    ) -> Result<Self> {
        let base = NodeBase::new(id, label)
            .with_input(Self::PORT_PROCESSOR, DataKind::Processor)?
            .with_output(Self::PORT_PROCESSOR, DataKind::Processor)?;
        Ok(Self { base, backend })
    }
}

impl Node for ApparentResistivityNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, inputs: PortValues) -> Result<PortValues> {
        let mut state = ProcessorState::from_inputs(self.base.id(), &inputs, Self::PORT_PROCESSOR)?;
        self.backend.compute_apparent_resistivity(&mut state)?;
        state.record_stage(stages::APPARENT_RESISTIVITY);
        log::debug!(
            "ApparentResistivityNode {}: stages now {:?}",
            self.base.id(),
            state.stages
        );
        state.into_outputs(Self::PORT_PROCESSOR)
    }
}

fn create(id: NodeId, label: String, backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(ApparentResistivityNode::new(id, label, backend)?))
}

inventory::submit!(NodeDescriptor {
    node_type: ApparentResistivityNode::NODE_TYPE,
    label: "Apparent Resistivity",
    category: NodeCategory::Processing,
    factory: create,
});
