//! Resistivity Plot Node
//!
//! Asks the backend to plot apparent resistivity for one site and keeps the
//! returned figure handle for the editor. The processor state passes through.

use node_engine::{
    DataKind, Node, NodeBase, NodeCategory, NodeEngineError, NodeHandle, NodeId, PortValues,
    Result,
};
use serde_json::{json, Value};

use crate::backend::{datasets, ProcessorState, SharedBackend};
use crate::catalog::NodeDescriptor;

/// Terminal plotting node for a processor chain
///
/// # Parameters
/// - `site_index` - Zero-based site to plot, default 2
pub struct ResistivityPlotNode {
    base: NodeBase,
    backend: SharedBackend,
    figure: Option<Value>,
}

impl ResistivityPlotNode {
    pub const NODE_TYPE: &'static str = "output-resistivity-plot";
    pub const PORT_PROCESSOR: &'static str = "Processor";
    pub const PARAM_SITE_INDEX: &'static str = "site_index";

    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        backend: SharedBackend,
    ) -> Result<Self> {
        let base = NodeBase::new(id, label)
            .with_input(Self::PORT_PROCESSOR, DataKind::Processor)?
            .with_output(Self::PORT_PROCESSOR, DataKind::Processor)?
            .with_parameter(Self::PARAM_SITE_INDEX, json!(2));
        Ok(Self {
            base,
            backend,
            figure: None,
        })
    }

    /// Figure handle from the latest successful run
    pub fn figure(&self) -> Option<&Value> {
        self.figure.as_ref()
    }

    fn site_index(&self, state: &ProcessorState) -> Result<u64> {
        let id = self.base.id();
        let index = match self.base.parameter(Self::PARAM_SITE_INDEX) {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_u64().ok_or_else(|| {
                NodeEngineError::invalid_parameter(
                    id,
                    Self::PARAM_SITE_INDEX,
                    "must be a non-negative integer",
                )
            })?,
        };

        if let Some(count) = state.dataset(datasets::SITE_COUNT).and_then(Value::as_u64) {
            if index >= count {
                return Err(NodeEngineError::invalid_parameter(
                    id,
                    Self::PARAM_SITE_INDEX,
                    format!("site {} out of range for {} sites", index, count),
                ));
            }
        }
        Ok(index)
    }
}

impl Node for ResistivityPlotNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, inputs: PortValues) -> Result<PortValues> {
        let state = ProcessorState::from_inputs(self.base.id(), &inputs, Self::PORT_PROCESSOR)?;
        let site = self.site_index(&state)?;

        self.figure = None;
        let figure = self.backend.plot_resistivity(&state, site)?;
        log::info!("ResistivityPlotNode {}: plotted site {}", self.base.id(), site);
        self.figure = Some(figure);

        state.into_outputs(Self::PORT_PROCESSOR)
    }
}

fn create(id: NodeId, label: String, backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(ResistivityPlotNode::new(id, label, backend)?))
}

inventory::submit!(NodeDescriptor {
    node_type: ResistivityPlotNode::NODE_TYPE,
    label: "Resistivity Plot",
    category: NodeCategory::Output,
    factory: create,
});
