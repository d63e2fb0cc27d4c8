//! Error types with fix suggestions

use std::path::PathBuf;

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum CrewError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Pipeline definition errors (CREW-010 to CREW-016)
    // ─────────────────────────────────────────────────────────────

    #[error("CREW-010: Invalid schema: expected '{expected}', got '{actual}'")]
    InvalidSchema { expected: String, actual: String },

    #[error("CREW-011: Pipeline has no tasks")]
    EmptyPipeline,

    #[error("CREW-012: Duplicate role id '{id}'")]
    DuplicateRole { id: String },

    #[error("CREW-013: Duplicate task id '{id}'")]
    DuplicateTask { id: String },

    #[error("CREW-014: Task '{task_id}' is assigned to unknown role '{role_id}'")]
    UnknownRole { role_id: String, task_id: String },

    #[error("CREW-015: Task '{task_id}' takes context from unknown task '{upstream}'")]
    UnknownUpstream { upstream: String, task_id: String },

    #[error("CREW-016: Circular context dependency involving '{task_id}'")]
    CircularContext { task_id: String },

    // ─────────────────────────────────────────────────────────────
    // Provider errors (CREW-020 to CREW-022)
    // ─────────────────────────────────────────────────────────────

    #[error("CREW-020: Unknown provider '{name}'")]
    UnknownProvider { name: String },

    #[error("CREW-021: Missing credential: {var} is not set")]
    MissingCredential { var: String },

    #[error("CREW-022: Task '{task_id}' failed: {reason}")]
    Provider { task_id: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Output errors (CREW-030 to CREW-031)
    // ─────────────────────────────────────────────────────────────

    #[error("CREW-030: Cannot write '{}': {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CREW-031: Cannot serialize event log: {0}")]
    EventLog(#[from] serde_json::Error),

    #[error("CREW-040: Invalid input '{raw}' (expected key=value)")]
    InvalidInput { raw: String },
}

impl FixSuggestion for CrewError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            CrewError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            CrewError::Io(_) => Some("Check file path and permissions"),
            CrewError::InvalidSchema { .. } => {
                Some("Start the file with: schema: crewline/pipeline@0.1")
            }
            CrewError::EmptyPipeline => Some("Declare at least one entry under tasks:"),
            CrewError::DuplicateRole { .. } => Some("Use unique ids under roles:"),
            CrewError::DuplicateTask { .. } => Some("Use unique ids under tasks:"),
            CrewError::UnknownRole { .. } => {
                Some("Set agent: to the id of a role declared under roles:")
            }
            CrewError::UnknownUpstream { .. } => {
                Some("List only ids of tasks declared in this pipeline in context:")
            }
            CrewError::CircularContext { .. } => {
                Some("Remove the cycle - a task cannot depend on its own output")
            }
            CrewError::UnknownProvider { .. } => Some("Use --provider groq or --provider mock"),
            CrewError::MissingCredential { .. } => {
                Some("Export GROQ_API_KEY or add it to a .env file")
            }
            CrewError::Provider { .. } => {
                Some("Check network access, API key validity and rate limits")
            }
            CrewError::Output { .. } => Some("Check the output path is writable"),
            CrewError::EventLog(_) => Some("Run again without --events to skip the dump"),
            CrewError::InvalidInput { .. } => Some("Pass inputs as --input topic=value"),
        }
    }
}
