//! Running a workflow off the interactive thread
//!
//! The scheduler itself is synchronous. Editors run it on a blocking worker
//! so long node payloads (file reads, tensor math) do not freeze the UI.
//! The registry lock is held for the whole run, which serializes graph
//! edits against an in-flight execution.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::{NodeEngineError, Result};
use crate::events::EventSink;
use crate::registry::ConnectionRegistry;
use crate::scheduler::{ExecutionContext, RunFailure, RunState, WorkflowScheduler};
use crate::types::NodeId;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted { failure: RunFailure },
}

/// Everything a caller needs after a run: order, outputs and outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub execution_id: String,
    pub order: Vec<NodeId>,
    /// Outputs of every node that ran (partial if aborted)
    pub outputs: ExecutionContext,
    pub status: RunStatus,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }
}

/// Prepare and execute the registry's workflow on the calling thread
///
/// Structural failures (empty graph, cycle) are returned as errors. Failures
/// once the run is underway produce an `Aborted` report carrying the
/// partial outputs.
pub fn run_workflow(
    registry: &ConnectionRegistry,
    config: SchedulerConfig,
    event_sink: Arc<dyn EventSink>,
) -> Result<RunReport> {
    let mut scheduler = WorkflowScheduler::with_config(registry, config, event_sink)?;
    let order = scheduler.prepare_execution()?.to_vec();

    let outputs = match scheduler.execute() {
        Ok(outputs) => outputs,
        Err(NodeEngineError::MissingInput { .. } | NodeEngineError::UnconnectedInput { .. }) => {
            scheduler.context().clone()
        }
        Err(e) => return Err(e),
    };

    let status = match (scheduler.state(), scheduler.failure()) {
        (RunState::Completed, _) => RunStatus::Completed,
        (_, Some(failure)) => RunStatus::Aborted {
            failure: failure.clone(),
        },
        (state, None) => RunStatus::Aborted {
            failure: RunFailure {
                node_id: None,
                message: format!("Run ended in state {:?}", state),
            },
        },
    };

    Ok(RunReport {
        execution_id: scheduler.execution_id().to_string(),
        order,
        outputs,
        status,
    })
}

/// Run the workflow on tokio's blocking pool
///
/// The registry stays locked until the run finishes.
pub async fn run_in_background(
    registry: Arc<Mutex<ConnectionRegistry>>,
    config: SchedulerConfig,
    event_sink: Arc<dyn EventSink>,
) -> Result<RunReport> {
    tokio::task::spawn_blocking(move || {
        let registry = registry.lock();
        run_workflow(&registry, config, event_sink)
    })
    .await
    .map_err(|e| NodeEngineError::Join(e.to_string()))?
}
