//! Execution audit trail
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: pipeline, task and provider level variants
//! - EventLog: thread-safe, append-only log

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Single event in the pipeline execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID
    pub id: u64,
    /// Time since the run started (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // PIPELINE LEVEL
    // ═══════════════════════════════════════════
    PipelineStarted {
        task_count: usize,
        provider: String,
    },
    PipelineCompleted {
        final_task: Arc<str>,
        result_path: PathBuf,
        total_duration_ms: u64,
    },
    PipelineFailed {
        error: String,
        failed_task: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    TaskStarted {
        task_id: Arc<str>,
        role: String,
        dependencies: Vec<Arc<str>>,
    },
    TaskCompleted {
        task_id: Arc<str>,
        output_len: usize,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: Arc<str>,
        error: String,
        duration_ms: u64,
    },
    OutputWritten {
        task_id: Arc<str>,
        path: PathBuf,
    },

    // ═══════════════════════════════════════════
    // PROVIDER
    // ═══════════════════════════════════════════
    ProviderCalled {
        task_id: Arc<str>,
        provider: String,
        model: String,
        prompt_len: usize,
    },
    ProviderResponded {
        task_id: Arc<str>,
        output_len: usize,
        tokens_used: u32,
    },
}

impl EventKind {
    /// Extract task_id if event is task-related
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskStarted { task_id, .. }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. }
            | Self::OutputWritten { task_id, .. }
            | Self::ProviderCalled { task_id, .. }
            | Self::ProviderResponded { task_id, .. } => Some(task_id),
            Self::PipelineStarted { .. }
            | Self::PipelineCompleted { .. }
            | Self::PipelineFailed { .. } => None,
        }
    }

    pub fn is_pipeline_event(&self) -> bool {
        matches!(
            self,
            Self::PipelineStarted { .. }
                | Self::PipelineCompleted { .. }
                | Self::PipelineFailed { .. }
        )
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    /// Reset at the start of every run
    start_time: Arc<RwLock<Instant>>,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Arc::new(RwLock::new(Instant::now())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event, returns its ID
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.read().elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    /// Drop previous events so the log describes a single run
    pub fn reset(&self) {
        let mut events = self.events.write();
        events.clear();
        self.next_id.store(0, Ordering::SeqCst);
        *self.start_time.write() = Instant::now();
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Filter events by task ID
    pub fn filter_task(&self, task_id: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.task_id() == Some(task_id))
            .collect()
    }

    /// Events of every task performed by `role_id`
    pub fn filter_role(&self, role_id: &str) -> Vec<Event> {
        let events = self.events();
        let tasks: Vec<&str> = events
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::TaskStarted { task_id, role, .. } if role == role_id => {
                    Some(task_id.as_ref())
                }
                _ => None,
            })
            .collect();

        events
            .iter()
            .filter(|e| e.kind.task_id().is_some_and(|id| tasks.contains(&id)))
            .cloned()
            .collect()
    }

    pub fn pipeline_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.is_pipeline_event())
            .collect()
    }

    /// Pretty JSON array written by `--events`
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.events.read())
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
