//! Numerical backend seam and the processor state passed between MT nodes
//!
//! Nodes never do MT math themselves. They call an [`MtBackend`], which the
//! host application supplies, and hand a [`ProcessorState`] downstream on
//! their `Processor` port.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use node_engine::{NodeEngineError, PortValues, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dataset keys a backend fills into [`ProcessorState::datasets`]
pub mod datasets {
    pub const PERIODS: &str = "periods";
    pub const SITE_NAMES: &str = "site_names";
    pub const COORDINATES: &str = "coordinates";
    pub const Z_MATRIX: &str = "z_matrix";
    pub const Z_ERROR_MATRIX: &str = "z_error_matrix";
    pub const ORIENTATION: &str = "orientation";
    pub const PERIOD_COUNT: &str = "period_count";
    pub const SITE_COUNT: &str = "site_count";
    pub const DISTANCE: &str = "distance";
    pub const SKEW: &str = "skew";
    pub const PHI2: &str = "phi2";
    pub const PHASE_TENSOR: &str = "phase_tensor";
    pub const APPARENT_RESISTIVITY: &str = "apparent_resistivity";
    pub const PHASE: &str = "phase";
}

/// Processing stages recorded in [`ProcessorState::stages`]
pub mod stages {
    pub const DISTANCE: &str = "distance";
    pub const PHASE_TENSOR: &str = "phase_tensor";
    pub const APPARENT_RESISTIVITY: &str = "apparent_resistivity";
}

/// Supported MT data file layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    /// ModEM-style full impedance tensor, 3D
    #[default]
    #[serde(rename = "Z_ALL_3D")]
    ZAll3d,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::ZAll3d => "Z_ALL_3D",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Z_ALL_3D" => Ok(FileType::ZAll3d),
            other => Err(format!("unsupported file type '{}'", other)),
        }
    }
}

/// Loaded MT data plus everything computed on it so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessorState {
    pub source: Option<PathBuf>,
    pub file_type: Option<FileType>,
    pub datasets: Map<String, Value>,
    pub stages: Vec<String>,
}

impl ProcessorState {
    pub fn new(source: impl Into<PathBuf>, file_type: FileType) -> Self {
        Self {
            source: Some(source.into()),
            file_type: Some(file_type),
            ..Default::default()
        }
    }

    pub fn dataset(&self, key: &str) -> Option<&Value> {
        self.datasets.get(key)
    }

    pub fn set_dataset(&mut self, key: impl Into<String>, value: Value) {
        self.datasets.insert(key.into(), value);
    }

    pub fn has_stage(&self, stage: &str) -> bool {
        self.stages.iter().any(|s| s == stage)
    }

    /// Record a completed stage once
    pub fn record_stage(&mut self, stage: &str) {
        if !self.has_stage(stage) {
            self.stages.push(stage.to_string());
        }
    }

    /// Read the state a node received on `port`
    pub fn from_inputs(node_id: &str, inputs: &PortValues, port: &str) -> Result<Self> {
        let value = inputs.get(port).ok_or_else(|| {
            NodeEngineError::failed(format!(
                "Node '{}' received nothing on '{}'",
                node_id, port
            ))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Package the state as a single-port output map
    pub fn into_outputs(self, port: &str) -> Result<PortValues> {
        let value = serde_json::to_value(self)?;
        Ok(PortValues::from([(port.to_string(), value)]))
    }
}

/// MT numerics provided by the host
///
/// Implementations return `NodeEngineError::ExecutionFailed` (or `Io`) on
/// failure; the calling node's run is then aborted by the scheduler.
pub trait MtBackend: Send + Sync {
    /// Load a data file, skipping the first `start_line` lines
    fn read_file(&self, path: &Path, file_type: FileType, start_line: u64)
        -> Result<ProcessorState>;

    /// Compute inter-site distances from the loaded coordinates
    fn compute_distance(&self, state: &mut ProcessorState) -> Result<()>;

    fn compute_phase_tensor(&self, state: &mut ProcessorState) -> Result<()>;

    fn compute_apparent_resistivity(&self, state: &mut ProcessorState) -> Result<()>;

    /// Render apparent resistivity for one site; returns a host-defined
    /// figure handle
    ///
    /// Hosts without plotting keep the default, which fails the node.
    fn plot_resistivity(&self, state: &ProcessorState, site_index: u64) -> Result<Value> {
        let _ = (state, site_index);
        Err(NodeEngineError::failed("This backend cannot plot resistivity"))
    }
}

pub type SharedBackend = Arc<dyn MtBackend>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_type_parse() {
        assert_eq!("Z_ALL_3D".parse::<FileType>(), Ok(FileType::ZAll3d));
        assert!("EDI".parse::<FileType>().is_err());
        assert_eq!(serde_json::to_value(FileType::ZAll3d).unwrap(), json!("Z_ALL_3D"));
    }

    #[test]
    fn test_record_stage_once() {
        let mut state = ProcessorState::new("data.dat", FileType::ZAll3d);
        state.record_stage(stages::DISTANCE);
        state.record_stage(stages::DISTANCE);
        assert_eq!(state.stages, ["distance"]);
    }

    #[test]
    fn test_state_through_ports() {
        let mut state = ProcessorState::new("data.dat", FileType::ZAll3d);
        state.set_dataset(datasets::PERIODS, json!([1.0, 10.0]));

        let outputs = state.clone().into_outputs("Processor").unwrap();
        assert_eq!(outputs["Processor"]["fileType"], json!("Z_ALL_3D"));

        let back = ProcessorState::from_inputs("n", &outputs, "Processor").unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_from_inputs_missing_port() {
        let err = ProcessorState::from_inputs("phase", &PortValues::new(), "Processor")
            .unwrap_err();
        assert!(err.to_string().contains("phase"));
    }

    #[test]
    fn test_from_inputs_rejects_non_state() {
        let inputs = PortValues::from([("Processor".to_string(), json!("nope"))]);
        assert!(matches!(
            ProcessorState::from_inputs("phase", &inputs, "Processor"),
            Err(NodeEngineError::Serialization(_))
        ));
    }
}
