//! Output Format Node
//!
//! Accepts any value, logs its shape and passes it through unchanged.

use node_engine::{Node, NodeBase, NodeCategory, NodeHandle, NodeId, PortType, PortValues, Result};
use serde_json::Value;

use crate::backend::SharedBackend;
use crate::catalog::NodeDescriptor;

pub struct OutputFormatNode {
    base: NodeBase,
}

impl OutputFormatNode {
    pub const NODE_TYPE: &'static str = "output-format";
    pub const PORT_DATA: &'static str = "Data";

    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        let base = NodeBase::new(id, label)
            .with_input(Self::PORT_DATA, PortType::Any)?
            .with_output(Self::PORT_DATA, PortType::Any)?;
        Ok(Self { base })
    }
}

/// Short human-readable description of a JSON value's shape
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("text ({} chars)", s.chars().count()),
        Value::Array(items) => format!("list of {}", items.len()),
        Value::Object(map) => format!("object with {} keys", map.len()),
    }
}

impl Node for OutputFormatNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, mut inputs: PortValues) -> Result<PortValues> {
        let data = inputs.remove(Self::PORT_DATA).unwrap_or(Value::Null);
        log::info!("OutputFormatNode {}: {}", self.base.id(), describe(&data));
        log::trace!("OutputFormatNode {}: {}", self.base.id(), data);
        Ok(PortValues::from([(Self::PORT_DATA.to_string(), data)]))
    }
}

fn create(id: NodeId, label: String, _backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(OutputFormatNode::new(id, label)?))
}

inventory::submit!(NodeDescriptor {
    node_type: OutputFormatNode::NODE_TYPE,
    label: "Output Format",
    category: NodeCategory::Output,
    factory: create,
});
