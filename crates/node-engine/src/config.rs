//! Configuration types for the workflow scheduler

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Identifier carried in workflow-level events
    pub workflow_id: String,
    /// Attach each node's outputs to its `NodeCompleted` event
    pub include_outputs_in_events: bool,
    /// Treat output keys that are not declared ports as a node failure
    pub enforce_declared_outputs: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workflow_id: "workflow".to_string(),
            include_outputs_in_events: false,
            enforce_declared_outputs: true,
        }
    }
}

impl SchedulerConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the workflow ID
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = workflow_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SchedulerConfig::from_json_str(r#"{"workflowId": "mt-profile"}"#).unwrap();
        assert_eq!(config.workflow_id, "mt-profile");
        assert!(!config.include_outputs_in_events);
        assert!(config.enforce_declared_outputs);
    }

    #[test]
    fn test_invalid_json() {
        assert!(SchedulerConfig::from_json_str("{").is_err());
    }
}
