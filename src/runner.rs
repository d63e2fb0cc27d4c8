//! Pipeline runner
//!
//! Tasks run strictly one at a time in dependency order. Each task makes
//! exactly one provider call; the first failure aborts the run and leaves
//! earlier results and files in place.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tracing::{debug, info, instrument, warn};

use crate::datastore::{DataStore, TaskResult};
use crate::error::CrewError;
use crate::event_log::{EventKind, EventLog};
use crate::output::{write_final_result, write_task_output};
use crate::pipeline::{ExecutionPlan, Pipeline};
use crate::prompt::build_prompt;
use crate::provider::Provider;
use crate::task::TaskSpec;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Last task executed
    pub final_task: Arc<str>,
    /// Its output, as written (after the header) to `result_file`
    pub output: String,
    /// Every task result in execution order
    pub results: Vec<TaskResult>,
    pub result_file: PathBuf,
    pub total_tokens: u32,
    pub duration: Duration,
}

impl std::fmt::Display for PipelineResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.output)
    }
}

/// Sequential pipeline runner
pub struct Runner {
    pipeline: Pipeline,
    provider: Arc<dyn Provider>,
    datastore: DataStore,
    event_log: EventLog,
    /// `{name}` values; override pipeline defaults
    inputs: HashMap<String, String>,
    model: Option<String>,
    /// Relative output paths resolve against this
    output_root: PathBuf,
    result_file: Option<PathBuf>,
    quiet: bool,
}

impl Runner {
    pub fn new(pipeline: Pipeline, provider: Arc<dyn Provider>) -> Self {
        Self {
            pipeline,
            provider,
            datastore: DataStore::new(),
            event_log: EventLog::new(),
            inputs: HashMap::new(),
            model: None,
            output_root: PathBuf::new(),
            result_file: None,
            quiet: false,
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, String>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Override the pipeline's model
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Override the pipeline's final result file
    pub fn with_result_file(mut self, path: Option<PathBuf>) -> Self {
        self.result_file = path;
        self
    }

    /// Suppress console progress lines
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Results of tasks that have completed, including after a failed run
    pub fn datastore(&self) -> &DataStore {
        &self.datastore
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.output_root.join(path)
    }

    fn model(&self) -> String {
        self.model
            .clone()
            .or_else(|| self.pipeline.model.clone())
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    fn merged_inputs(&self) -> HashMap<String, String> {
        let mut inputs = self.pipeline.defaults.clone();
        inputs.extend(self.inputs.iter().map(|(k, v)| (k.clone(), v.clone())));
        inputs
    }

    /// Run every task, then write the final result file
    #[instrument(skip(self), fields(provider = %self.provider.name()))]
    pub async fn run(&self) -> Result<PipelineResult, CrewError> {
        let start = Instant::now();
        let plan = self.pipeline.plan()?;
        let model = self.model();
        let inputs = self.merged_inputs();

        self.datastore.clear();
        self.event_log.reset();
        self.event_log.emit(EventKind::PipelineStarted {
            task_count: plan.order.len(),
            provider: self.provider.name().to_string(),
        });
        info!(tasks = plan.order.len(), model = %model, "Starting pipeline");

        let task_map: HashMap<&str, &TaskSpec> = self
            .pipeline
            .tasks
            .iter()
            .map(|t| (t.id.as_str(), t))
            .collect();
        let ordered: Vec<&TaskSpec> = plan
            .order
            .iter()
            .filter_map(|id| task_map.get(id.as_ref()).copied())
            .collect();
        let total = ordered.len();

        let mut results = Vec::with_capacity(total);
        for (idx, task) in ordered.into_iter().enumerate() {
            match self.execute_task(task, &plan, &inputs, &model).await {
                Ok(result) => {
                    if !self.quiet {
                        println!(
                            "  {} {} {} {}",
                            format!("[{}/{}]", idx + 1, total).green(),
                            result.task_id,
                            "✓".green(),
                            format!("({:.1}s)", result.duration.as_secs_f64()).dimmed()
                        );
                    }
                    results.push(result);
                }
                Err(e) => {
                    if !self.quiet {
                        println!(
                            "  {} {} {}",
                            format!("[{}/{}]", idx + 1, total).red(),
                            task.id,
                            "✗".red()
                        );
                    }
                    warn!(task_id = %task.id, error = %e, "Pipeline aborted");
                    self.event_log.emit(EventKind::PipelineFailed {
                        error: e.to_string(),
                        failed_task: Some(Arc::from(task.id.as_str())),
                    });
                    return Err(e);
                }
            }
        }

        // plan() rejects empty pipelines
        let Some(last) = results.last() else {
            return Err(CrewError::EmptyPipeline);
        };
        let final_task = Arc::clone(&last.task_id);
        let output = last.output.clone();

        let result_file = self.resolve(
            self.result_file
                .as_deref()
                .unwrap_or(&self.pipeline.output.result_file),
        );
        if let Err(e) = write_final_result(&result_file, &output).await {
            self.event_log.emit(EventKind::PipelineFailed {
                error: e.to_string(),
                failed_task: None,
            });
            return Err(e);
        }

        let duration = start.elapsed();
        self.event_log.emit(EventKind::PipelineCompleted {
            final_task: Arc::clone(&final_task),
            result_path: result_file.clone(),
            total_duration_ms: duration.as_millis() as u64,
        });
        info!(
            final_task = %final_task,
            duration_ms = duration.as_millis() as u64,
            "Pipeline completed"
        );

        let total_tokens = results.iter().map(|r| r.tokens_used).sum();
        Ok(PipelineResult {
            final_task,
            output,
            results,
            result_file,
            total_tokens,
            duration,
        })
    }

    #[instrument(skip_all, fields(task_id = %task.id))]
    async fn execute_task(
        &self,
        task: &TaskSpec,
        plan: &ExecutionPlan,
        inputs: &HashMap<String, String>,
        model: &str,
    ) -> Result<TaskResult, CrewError> {
        let start = Instant::now();
        let task_id: Arc<str> = Arc::from(task.id.as_str());
        let role = plan.registry.get(&task.agent, &task.id)?;

        // Topological order guarantees upstream results exist
        let dependencies = plan.graph.dependencies(&task.id);
        let mut upstream = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            let text = self
                .datastore
                .output(dep)
                .ok_or_else(|| CrewError::UnknownUpstream {
                    upstream: dep.to_string(),
                    task_id: task.id.clone(),
                })?;
            upstream.push(text);
        }
        let upstream_refs: Vec<&str> = upstream.iter().map(String::as_str).collect();

        self.event_log.emit(EventKind::TaskStarted {
            task_id: Arc::clone(&task_id),
            role: role.id.clone(),
            dependencies: dependencies.to_vec(),
        });

        let mut request = build_prompt(role, task, &upstream_refs, inputs);
        request.model = model.to_string();
        if let Some(temperature) = self.pipeline.temperature {
            request = request.with_temperature(temperature);
        }

        self.event_log.emit(EventKind::ProviderCalled {
            task_id: Arc::clone(&task_id),
            provider: self.provider.name().to_string(),
            model: model.to_string(),
            prompt_len: request.prompt.len(),
        });
        debug!(role = %role.role, prompt_len = request.prompt.len(), "Invoking provider");

        let response = match self.provider.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = provider_error(&task.id, e);
                self.fail(&task_id, &err, start);
                return Err(err);
            }
        };

        self.event_log.emit(EventKind::ProviderResponded {
            task_id: Arc::clone(&task_id),
            output_len: response.content.len(),
            tokens_used: response.usage.total_tokens,
        });

        let mut result = TaskResult::new(Arc::clone(&task_id), role.id.clone(), response.content)
            .with_tokens(response.usage.total_tokens);

        if let Some(file) = &task.output_file {
            let path = self.resolve(file);
            if let Err(err) = write_task_output(&path, &result.output).await {
                self.fail(&task_id, &err, start);
                return Err(err);
            }
            self.event_log.emit(EventKind::OutputWritten {
                task_id: Arc::clone(&task_id),
                path: path.clone(),
            });
            result.output_file = Some(path);
        }

        let result = result.with_duration(start.elapsed());
        self.datastore.insert(result.clone());
        self.event_log.emit(EventKind::TaskCompleted {
            task_id,
            output_len: result.output.len(),
            duration_ms: result.duration.as_millis() as u64,
        });

        Ok(result)
    }

    fn fail(&self, task_id: &Arc<str>, err: &CrewError, start: Instant) {
        self.event_log.emit(EventKind::TaskFailed {
            task_id: Arc::clone(task_id),
            error: err.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }
}

/// Keep configuration errors as-is; everything else is a provider failure
fn provider_error(task_id: &str, err: anyhow::Error) -> CrewError {
    match err.downcast::<CrewError>() {
        Ok(crew @ CrewError::MissingCredential { .. }) => crew,
        Ok(other) => CrewError::Provider {
            task_id: task_id.to_string(),
            reason: other.to_string(),
        },
        Err(e) => CrewError::Provider {
            task_id: task_id.to_string(),
            reason: format!("{e:#}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use crate::role::Role;
    use tempfile::TempDir;

    fn two_task_pipeline() -> Pipeline {
        Pipeline {
            schema: crate::pipeline::PIPELINE_SCHEMA.to_string(),
            provider: "mock".to_string(),
            model: None,
            temperature: Some(0.2),
            output: Default::default(),
            roles: vec![Role::new("r", "Researcher", "Find", "Curious")],
            tasks: vec![
                TaskSpec::new("a", "Do A", "Text", "r").with_output_file("a.md"),
                TaskSpec::new("b", "Do B", "Text", "r")
                    .with_context("a")
                    .with_output_file("b.md"),
            ],
            defaults: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn run_applies_model_and_temperature() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockProvider::with_responses(["A", "B"]));
        let runner = Runner::new(two_task_pipeline(), mock.clone())
            .with_output_root(dir.path())
            .with_model(Some("custom".to_string()))
            .quiet(true);

        runner.run().await.unwrap();

        let requests = mock.requests();
        assert!(requests.iter().all(|r| r.model == "custom"));
        assert!(requests.iter().all(|r| r.temperature == Some(0.2)));
    }

    #[tokio::test]
    async fn model_falls_back_to_provider_default() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockProvider::new());
        let runner = Runner::new(two_task_pipeline(), mock.clone())
            .with_output_root(dir.path())
            .quiet(true);

        runner.run().await.unwrap();
        assert_eq!(mock.requests()[0].model, "mock-model");
    }

    #[tokio::test]
    async fn events_trace_the_run() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockProvider::with_responses(["A", "B"]));
        let runner = Runner::new(two_task_pipeline(), mock)
            .with_output_root(dir.path())
            .quiet(true);

        runner.run().await.unwrap();

        let log = runner.event_log();
        let kinds: Vec<&'static str> = log
            .filter_task("a")
            .iter()
            .map(|e| match e.kind {
                EventKind::TaskStarted { .. } => "started",
                EventKind::ProviderCalled { .. } => "called",
                EventKind::ProviderResponded { .. } => "responded",
                EventKind::OutputWritten { .. } => "written",
                EventKind::TaskCompleted { .. } => "completed",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["started", "called", "responded", "written", "completed"]);

        let pipeline_events = log.pipeline_events();
        assert!(matches!(
            pipeline_events.last().unwrap().kind,
            EventKind::PipelineCompleted { .. }
        ));
    }

    #[test]
    fn provider_error_keeps_missing_credential() {
        let err = anyhow::Error::new(CrewError::MissingCredential {
            var: "GROQ_API_KEY".to_string(),
        });
        assert!(matches!(
            provider_error("a", err),
            CrewError::MissingCredential { .. }
        ));

        let err = anyhow::anyhow!("connection refused");
        let mapped = provider_error("a", err);
        assert!(matches!(
            mapped,
            CrewError::Provider { ref task_id, ref reason }
                if task_id == "a" && reason.contains("connection refused")
        ));
    }
}
