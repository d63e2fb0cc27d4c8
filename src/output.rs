//! Result persistence
//!
//! Every write truncates: re-running a pipeline replaces files, never appends.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CrewError;
use crate::event_log::EventLog;

/// Header line of the final result file
pub const RESULT_HEADER: &str = "# Resultado do Agente 🤖";

/// Where the final result goes unless configured otherwise
pub const DEFAULT_RESULT_PATH: &str = "resultado.md";

/// Write a task's output as UTF-8, creating parent directories
pub async fn write_task_output(path: &Path, text: &str) -> Result<(), CrewError> {
    write_file(path, text).await
}

/// Write the final result with the fixed header and a blank line in front
pub async fn write_final_result(path: &Path, text: &str) -> Result<(), CrewError> {
    write_file(path, &render_final_result(text)).await
}

/// Dump the event log as a pretty JSON array
pub async fn write_event_log(path: &Path, log: &EventLog) -> Result<(), CrewError> {
    let json = log.to_json_pretty()?;
    write_file(path, &json).await
}

/// Content of the final result file
pub fn render_final_result(text: &str) -> String {
    format!("{RESULT_HEADER}\n\n{text}")
}

async fn write_file(path: &Path, content: &str) -> Result<(), CrewError> {
    let wrap = |source: std::io::Error| CrewError::Output {
        path: PathBuf::from(path),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, content.as_bytes())
        .await
        .map_err(wrap)?;

    debug!(path = %path.display(), bytes = content.len(), "Output written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output").join("nested").join("a.md");

        write_task_output(&path, "RESULT_A").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "RESULT_A");
    }

    #[tokio::test]
    async fn overwrites_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.md");

        write_task_output(&path, "a much longer first version").await.unwrap();
        write_task_output(&path, "short").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn final_result_has_header_and_blank_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resultado.md");

        write_final_result(&path, "Olá, mundo").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# Resultado do Agente 🤖\n\nOlá, mundo");
    }

    #[tokio::test]
    async fn event_log_dump_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runs").join("events.json");
        let log = EventLog::new();
        log.emit(crate::event_log::EventKind::PipelineFailed {
            error: "CREW-021".to_string(),
            failed_task: Some("pesquisa".into()),
        });

        write_event_log(&path, &log).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("pipeline_failed"));
        assert!(content.contains("pesquisa"));
    }

    #[tokio::test]
    async fn unwritable_path_reports_output_error() {
        let dir = TempDir::new().unwrap();
        // A file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("a.md");

        let err = write_task_output(&path, "text").await.unwrap_err();
        assert!(matches!(err, CrewError::Output { ref path, .. } if path.ends_with("a.md")));
    }
}
