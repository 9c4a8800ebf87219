//! Output Processor Node
//!
//! Terminal node for a processor chain. Logs a summary of the state and
//! passes it through so the run's context holds the final result.

use node_engine::{DataKind, Node, NodeBase, NodeCategory, NodeHandle, NodeId, PortValues, Result};

use crate::backend::{ProcessorState, SharedBackend};
use crate::catalog::NodeDescriptor;

pub struct OutputProcessorNode {
    base: NodeBase,
}

impl OutputProcessorNode {
    pub const NODE_TYPE: &'static str = "output-processor";
    pub const PORT_PROCESSOR: &'static str = "Processor";

    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        let base = NodeBase::new(id, label)
            .with_input(Self::PORT_PROCESSOR, DataKind::Processor)?
            .with_output(Self::PORT_PROCESSOR, DataKind::Processor)?;
        Ok(Self { base })
    }
}

impl Node for OutputProcessorNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, inputs: PortValues) -> Result<PortValues> {
        let state = ProcessorState::from_inputs(self.base.id(), &inputs, Self::PORT_PROCESSOR)?;
        log::info!(
            "OutputProcessorNode {}: source {:?}, stages {:?}, datasets {:?}",
            self.base.id(),
            state.source,
            state.stages,
            state.datasets.keys().collect::<Vec<_>>()
        );
        state.into_outputs(Self::PORT_PROCESSOR)
    }
}

fn create(id: NodeId, label: String, _backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(OutputProcessorNode::new(id, label)?))
}

inventory::submit!(NodeDescriptor {
    node_type: OutputProcessorNode::NODE_TYPE,
    label: "Output Processor",
    category: NodeCategory::Output,
    factory: create,
});
