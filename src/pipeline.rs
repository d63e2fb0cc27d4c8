//! Pipeline definition parsed from `*.crew.yaml`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::CrewError;
use crate::flow_graph::FlowGraph;
use crate::output::DEFAULT_RESULT_PATH;
use crate::role::{Role, RoleRegistry};
use crate::task::TaskSpec;

/// Schema string every pipeline file must declare
pub const PIPELINE_SCHEMA: &str = "crewline/pipeline@0.1";

/// Built-in research -> write -> translate pipeline
pub const BUILTIN_PIPELINE_YAML: &str = include_str!("../pipelines/blog.crew.yaml");

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub schema: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; provider default when absent
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub output: OutputConfig,
    pub roles: Vec<Role>,
    pub tasks: Vec<TaskSpec>,
    /// Default values for `{name}` placeholders
    #[serde(default)]
    pub defaults: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Final result file (header + last task output)
    #[serde(default = "default_result_file")]
    pub result_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            result_file: default_result_file(),
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_result_file() -> PathBuf {
    PathBuf::from(DEFAULT_RESULT_PATH)
}

/// Validated pipeline ready to run
pub struct ExecutionPlan {
    pub registry: RoleRegistry,
    pub graph: FlowGraph,
    pub order: Vec<Arc<str>>,
}

impl Pipeline {
    pub fn from_yaml(yaml: &str) -> Result<Self, CrewError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CrewError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// The research -> write -> translate blog pipeline
    pub fn builtin() -> Result<Self, CrewError> {
        Self::from_yaml(BUILTIN_PIPELINE_YAML)
    }

    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Check everything that can be checked without calling the model
    pub fn plan(&self) -> Result<ExecutionPlan, CrewError> {
        if self.schema != PIPELINE_SCHEMA {
            return Err(CrewError::InvalidSchema {
                expected: PIPELINE_SCHEMA.to_string(),
                actual: self.schema.clone(),
            });
        }
        if self.tasks.is_empty() {
            return Err(CrewError::EmptyPipeline);
        }

        let registry = RoleRegistry::new(self.roles.iter().cloned())?;
        for task in &self.tasks {
            registry.get(&task.agent, &task.id)?;
        }

        let graph = FlowGraph::from_tasks(&self.tasks)?;
        let order = graph.execution_order()?;

        Ok(ExecutionPlan {
            registry,
            graph,
            order,
        })
    }

    pub fn validate(&self) -> Result<(), CrewError> {
        self.plan().map(|_| ())
    }
}
