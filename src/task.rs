//! Task definitions

use std::path::PathBuf;

use serde::Deserialize;

/// One unit of work assigned to a role
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub id: String,
    /// Instructions sent to the model
    pub description: String,
    /// What a good answer looks like
    pub expected_output: String,
    /// Role id that performs the task
    pub agent: String,
    /// Upstream task ids whose output is fed in as context
    #[serde(default)]
    pub context: Vec<String>,
    /// Where to save this task's output, if anywhere
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

impl TaskSpec {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            context: Vec::new(),
            output_file: None,
        }
    }

    /// Add an upstream task
    pub fn with_context(mut self, upstream: impl Into<String>) -> Self {
        self.context.push(upstream.into());
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_task() {
        let yaml = r#"
id: research
description: "Research the topic"
expected_output: "A report"
agent: researcher
"#;
        let task: TaskSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.id, "research");
        assert!(task.context.is_empty());
        assert!(task.output_file.is_none());
    }

    #[test]
    fn parse_task_with_context_and_output() {
        let yaml = r#"
id: translate
description: "Translate"
expected_output: "English text"
agent: translator
context: [write]
output_file: output/artigo_en.md
"#;
        let task: TaskSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.context, vec!["write".to_string()]);
        assert_eq!(task.output_file, Some(PathBuf::from("output/artigo_en.md")));
    }

    #[test]
    fn builder_sets_fields() {
        let task = TaskSpec::new("b", "do b", "text", "writer")
            .with_context("a")
            .with_output_file("b.md");
        assert_eq!(task.context, vec!["a".to_string()]);
        assert_eq!(task.output_file, Some(PathBuf::from("b.md")));
    }
}
