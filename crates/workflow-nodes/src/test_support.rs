//! In-memory backend for node tests

use std::path::Path;

use node_engine::{NodeEngineError, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::backend::{datasets, FileType, MtBackend, ProcessorState};

/// Backend that fills fixed datasets and records each call
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl RecordingBackend {
    /// Backend whose `call` fails
    pub fn failing_on(call: &'static str) -> Self {
        Self {
            fail_on: Some(call),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: &str) -> Result<()> {
        self.calls.lock().push(call.to_string());
        if self.fail_on == Some(call) {
            return Err(NodeEngineError::failed(format!("{} failed", call)));
        }
        Ok(())
    }
}

impl MtBackend for RecordingBackend {
    fn read_file(
        &self,
        path: &Path,
        file_type: FileType,
        _start_line: u64,
    ) -> Result<ProcessorState> {
        self.record("read_file")?;
        let mut state = ProcessorState::new(path, file_type);
        state.set_dataset(datasets::PERIODS, json!([0.01, 0.1, 1.0]));
        state.set_dataset(datasets::SITE_NAMES, json!(["S01", "S02"]));
        state.set_dataset(datasets::COORDINATES, json!([[0.0, 0.0, 0.0], [0.0, 1000.0, 0.0]]));
        state.set_dataset(datasets::PERIOD_COUNT, json!(3));
        state.set_dataset(datasets::SITE_COUNT, json!(2));
        state.set_dataset(datasets::ORIENTATION, json!("0"));
        Ok(state)
    }

    fn compute_distance(&self, state: &mut ProcessorState) -> Result<()> {
        self.record("compute_distance")?;
        state.set_dataset(datasets::DISTANCE, json!([0.0, 1000.0]));
        Ok(())
    }

    fn compute_phase_tensor(&self, state: &mut ProcessorState) -> Result<()> {
        self.record("compute_phase_tensor")?;
        state.set_dataset(datasets::PHASE_TENSOR, json!([[1.0, 0.0], [0.0, 1.0]]));
        state.set_dataset(datasets::SKEW, json!([0.5, 1.5]));
        state.set_dataset(datasets::PHI2, json!([45.0, 44.0]));
        Ok(())
    }

    fn compute_apparent_resistivity(&self, state: &mut ProcessorState) -> Result<()> {
        self.record("compute_apparent_resistivity")?;
        state.set_dataset(datasets::APPARENT_RESISTIVITY, json!([100.0, 120.0]));
        state.set_dataset(datasets::PHASE, json!([45.0, 47.0]));
        Ok(())
    }

    fn plot_resistivity(&self, _state: &ProcessorState, site_index: u64) -> Result<Value> {
        self.record("plot_resistivity")?;
        Ok(json!({"figure": "resistivity", "site": site_index}))
    }
}

/// Backend that keeps the default `plot_resistivity`
pub struct NoPlotBackend;

impl MtBackend for NoPlotBackend {
    fn read_file(&self, path: &Path, file_type: FileType, _start_line: u64) -> Result<ProcessorState> {
        Ok(ProcessorState::new(path, file_type))
    }

    fn compute_distance(&self, _state: &mut ProcessorState) -> Result<()> {
        Ok(())
    }

    fn compute_phase_tensor(&self, _state: &mut ProcessorState) -> Result<()> {
        Ok(())
    }

    fn compute_apparent_resistivity(&self, _state: &mut ProcessorState) -> Result<()> {
        Ok(())
    }
}
