//! Unpack Data Node
//!
//! Fans the datasets of a processor state out to one output port each, so
//! individual arrays can feed format or export nodes.

use node_engine::{
    DataKind, Node, NodeBase, NodeCategory, NodeEngineError, NodeHandle, NodeId, PortValues,
    Result,
};

use crate::backend::{datasets, ProcessorState, SharedBackend};
use crate::catalog::NodeDescriptor;

/// Output port, source dataset key and port data kind
const UNPACKED: [(&str, &str, DataKind); 14] = [
    ("Periods", datasets::PERIODS, DataKind::List),
    ("Sitenames", datasets::SITE_NAMES, DataKind::List),
    ("XYZ_in_dat", datasets::COORDINATES, DataKind::List),
    ("Z_matrix", datasets::Z_MATRIX, DataKind::List),
    ("Zerr_matrix", datasets::Z_ERROR_MATRIX, DataKind::List),
    ("Orientation", datasets::ORIENTATION, DataKind::Text),
    ("Period_num", datasets::PERIOD_COUNT, DataKind::Number),
    ("Site_num", datasets::SITE_COUNT, DataKind::Number),
    ("Distance_by_Dat", datasets::DISTANCE, DataKind::List),
    ("Skew", datasets::SKEW, DataKind::List),
    ("Phi2", datasets::PHI2, DataKind::List),
    ("Phase_tensor", datasets::PHASE_TENSOR, DataKind::List),
    ("Apparent_resistivity", datasets::APPARENT_RESISTIVITY, DataKind::List),
    ("Phi", datasets::PHASE, DataKind::List),
];

pub struct UnpackDataNode {
    base: NodeBase,
}

impl UnpackDataNode {
    pub const NODE_TYPE: &'static str = "unpack-data";
    pub const PORT_PROCESSOR: &'static str = "Processor";

    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        let mut base =
            NodeBase::new(id, label).with_input(Self::PORT_PROCESSOR, DataKind::Processor)?;
        for (port, _, kind) in UNPACKED {
            base = base.with_output(port, kind)?;
        }
        Ok(Self { base })
    }
}

impl Node for UnpackDataNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    /// Datasets the state does not carry yet are left off the output map
    fn execute(&mut self, inputs: PortValues) -> Result<PortValues> {
        let state = ProcessorState::from_inputs(self.base.id(), &inputs, Self::PORT_PROCESSOR)?;
        if state.datasets.is_empty() {
            return Err(NodeEngineError::failed(format!(
                "Node '{}' received a processor with no data loaded",
                self.base.id()
            )));
        }

        let mut outputs = PortValues::new();
        for (port, key, _) in UNPACKED {
            match state.dataset(key) {
                Some(value) => {
                    outputs.insert(port.to_string(), value.clone());
                }
                None => log::debug!(
                    "UnpackDataNode {}: no '{}' dataset for port '{}'",
                    self.base.id(),
                    key,
                    port
                ),
            }
        }
        Ok(outputs)
    }
}

fn create(id: NodeId, label: String, _backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(UnpackDataNode::new(id, label)?))
}

inventory::submit!(NodeDescriptor {
    node_type: UnpackDataNode::NODE_TYPE,
    label: "Unpack Data",
    category: NodeCategory::Processing,
    factory: create,
});
