//! Phase Tensor Node
//!
//! Computes the phase tensor, skew and Phi2 on the incoming processor state.

use node_engine::{DataKind, Node, NodeBase, NodeCategory, NodeHandle, NodeId, PortValues, Result};

use crate::backend::{stages, ProcessorState, SharedBackend};
use crate::catalog::NodeDescriptor;

pub struct PhaseTensorNode {
    base: NodeBase,
    backend: SharedBackend,
}

impl PhaseTensorNode {
    pub const NODE_TYPE: &'static str = "phase-tensor";
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

impl Node for PhaseTensorNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, inputs: PortValues) -> Result<PortValues> {
        let mut state = ProcessorState::from_inputs(self.base.id(), &inputs, Self::PORT_PROCESSOR)?;
        log::debug!("PhaseTensorNode {}: computing phase tensor", self.base.id());
        self.backend.compute_phase_tensor(&mut state)?;
        state.record_stage(stages::PHASE_TENSOR);
        state.into_outputs(Self::PORT_PROCESSOR)
    }
}

fn create(id: NodeId, label: String, backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(PhaseTensorNode::new(id, label, backend)?))
}

inventory::submit!(NodeDescriptor {
    node_type: PhaseTensorNode::NODE_TYPE,
    label: "Phase Tensor",
    category: NodeCategory::Processing,
    factory: create,
});
