//! Executor configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::error::ExecutorError;

/// Concurrency model backing an executor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorBacking {
    /// Every field on the calling thread, in selection order
    #[default]
    Serial,

    /// A bounded pool with one task per field
    FixedThreadPool { size: usize },

    /// A work-stealing pool splitting field lists in halves
    ForkJoin { parallelism: usize },
}

impl ExecutorBacking {
    /// Reject pools that could never run a task
    pub fn validate(&self) -> Result<(), ExecutorError> {
        match self {
            ExecutorBacking::FixedThreadPool { size: 0 } => Err(ExecutorError::Configuration(
                "fixed thread pool size must be positive".to_string(),
            )),
            ExecutorBacking::ForkJoin { parallelism: 0 } => Err(ExecutorError::Configuration(
                "fork-join parallelism must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Complete configuration for a query executor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub backing: ExecutorBacking,

    /// Deepest nested selection set allowed (root fields are depth 0)
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl ExecutorConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExecutorError> {
        self.backing.validate()
    }
}
