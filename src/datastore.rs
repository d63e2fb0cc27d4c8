//! Completed task results, in completion order

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// Output of one finished task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_id: Arc<str>,
    /// Role that produced it
    pub role_id: String,
    pub output: String,
    pub duration: Duration,
    pub tokens_used: u32,
    /// Set once the output has been persisted
    pub output_file: Option<PathBuf>,
}

impl TaskResult {
    pub fn new(task_id: Arc<str>, role_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            task_id,
            role_id: role_id.into(),
            output: output.into(),
            duration: Duration::ZERO,
            tokens_used: 0,
            output_file: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = tokens;
        self
    }
}

/// Shared store of task results; clones see the same data
#[derive(Clone, Default)]
pub struct DataStore {
    results: Arc<RwLock<Vec<TaskResult>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result, replacing any previous one for the same task
    pub fn insert(&self, result: TaskResult) {
        let mut results = self.results.write();
        match results.iter_mut().find(|r| r.task_id == result.task_id) {
            Some(existing) => *existing = result,
            None => results.push(result),
        }
    }

    pub fn get(&self, task_id: &str) -> Option<TaskResult> {
        self.results
            .read()
            .iter()
            .find(|r| r.task_id.as_ref() == task_id)
            .cloned()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.results
            .read()
            .iter()
            .any(|r| r.task_id.as_ref() == task_id)
    }

    /// Output text of a task, if it has finished
    pub fn output(&self, task_id: &str) -> Option<String> {
        self.get(task_id).map(|r| r.output)
    }

    /// All results in completion order
    pub fn all(&self) -> Vec<TaskResult> {
        self.results.read().clone()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.results.write().clear();
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("len", &self.len())
            .finish()
    }
}
