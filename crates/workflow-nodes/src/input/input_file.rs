//! Input File Node
//!
//! Loads an MT data file through the backend, computes inter-site distances
//! and emits the resulting processor state.

use std::path::PathBuf;

use node_engine::{
    DataKind, Node, NodeBase, NodeCategory, NodeEngineError, NodeHandle, NodeId, PortValues,
    Result,
};
use serde_json::{json, Value};

use crate::backend::{stages, FileType, ProcessorState, SharedBackend};
use crate::catalog::NodeDescriptor;

/// Source node of every MT workflow
///
/// # Parameters
/// - `path` - Data file to read (must exist)
/// - `file_type` - File layout, default `Z_ALL_3D`
/// - `read_start_line` - Lines to skip before data, default 0
///
/// # Outputs
/// - `Processor` - Loaded [`ProcessorState`] with distances computed
pub struct InputFileNode {
    base: NodeBase,
    backend: SharedBackend,
}

/// Validated parameters for one read
#[derive(Debug, Clone, PartialEq)]
struct ReadRequest {
    path: PathBuf,
    file_type: FileType,
    start_line: u64,
}

impl InputFileNode {
    pub const NODE_TYPE: &'static str = "input-file";
    pub const PORT_PROCESSOR: &'static str = "Processor";
    pub const PARAM_PATH: &'static str = "path";
    pub const PARAM_FILE_TYPE: &'static str = "file_type";
    pub const PARAM_READ_START_LINE: &'static str = "read_start_line";

    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        backend: SharedBackend,
    ) -> Result<Self> {
        let base = NodeBase::new(id, label)
            .with_output(Self::PORT_PROCESSOR, DataKind::Processor)?
            .with_parameter(Self::PARAM_PATH, json!(""))
            .with_parameter(Self::PARAM_FILE_TYPE, json!(FileType::default().as_str()))
            .with_parameter(Self::PARAM_READ_START_LINE, json!(0));
        Ok(Self { base, backend })
    }

    /// Point the node at a data file
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.base
            .set_parameter(Self::PARAM_PATH, json!(path.to_string_lossy()));
        self
    }

    fn read_request(&self) -> Result<ReadRequest> {
        let id = self.base.id();

        let path = match self.base.parameter(Self::PARAM_PATH) {
            Some(Value::String(p)) if !p.is_empty() => PathBuf::from(p),
            _ => {
                return Err(NodeEngineError::invalid_parameter(
                    id,
                    Self::PARAM_PATH,
                    "no data file selected",
                ))
            }
        };
        if !path.is_file() {
            return Err(NodeEngineError::invalid_parameter(
                id,
                Self::PARAM_PATH,
                format!("'{}' is not a readable file", path.display()),
            ));
        }

        let file_type = match self.base.parameter(Self::PARAM_FILE_TYPE) {
            None | Some(Value::Null) => FileType::default(),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|reason: String| {
                    NodeEngineError::invalid_parameter(id, Self::PARAM_FILE_TYPE, reason)
                })?,
            Some(_) => {
                return Err(NodeEngineError::invalid_parameter(
                    id,
                    Self::PARAM_FILE_TYPE,
                    "must be a string",
                ))
            }
        };

        let start_line = match self.base.parameter(Self::PARAM_READ_START_LINE) {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_u64().ok_or_else(|| {
                NodeEngineError::invalid_parameter(
                    id,
                    Self::PARAM_READ_START_LINE,
                    "must be a non-negative integer",
                )
            })?,
        };

        Ok(ReadRequest {
            path,
            file_type,
            start_line,
        })
    }
}

impl Node for InputFileNode {
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn execute(&mut self, _inputs: PortValues) -> Result<PortValues> {
        let request = self.read_request()?;
        log::info!(
            "InputFileNode {}: reading '{}' as {} from line {}",
            self.base.id(),
            request.path.display(),
            request.file_type,
            request.start_line
        );

        let mut state: ProcessorState =
            self.backend
                .read_file(&request.path, request.file_type, request.start_line)?;
        self.backend.compute_distance(&mut state)?;
        state.source = Some(request.path);
        state.file_type = Some(request.file_type);
        state.record_stage(stages::DISTANCE);

        log::debug!(
            "InputFileNode {}: loaded {} datasets",
            self.base.id(),
            state.datasets.len()
        );
        state.into_outputs(Self::PORT_PROCESSOR)
    }
}

fn create(id: NodeId, label: String, backend: SharedBackend) -> Result<NodeHandle> {
    Ok(NodeHandle::new(InputFileNode::new(id, label, backend)?))
}

inventory::submit!(NodeDescriptor {
    node_type: InputFileNode::NODE_TYPE,
    label: "Input File",
    category: NodeCategory::Input,
    factory: create,
});
