//! crewline - sequential multi-agent content pipeline
//!
//! Roles (personas) and tasks are declared in YAML; the [`Runner`] walks the
//! tasks in dependency order, feeding each task the full output of its
//! upstream tasks, and writes the last output to a Markdown file.

pub mod datastore;
pub mod error;
pub mod event_log;
pub mod flow_graph;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod role;
pub mod runner;
pub mod task;

pub use datastore::{DataStore, TaskResult};
pub use error::{CrewError, FixSuggestion};
pub use event_log::{Event, EventKind, EventLog};
pub use flow_graph::FlowGraph;
pub use pipeline::{ExecutionPlan, Pipeline};
pub use provider::{create_provider, MockProvider, Provider};
pub use role::{Role, RoleRegistry};
pub use runner::{PipelineResult, Runner};
pub use task::TaskSpec;
