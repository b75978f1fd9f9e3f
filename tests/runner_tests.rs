//! Integration tests for discovery, filtering and fail-fast orchestration
//!
//! These tests drive the runner with a recording executor, so they need no Python interpreter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nbcheck::cli::{ExitCode, commands};
use nbcheck::config::RunnerConfig;
use nbcheck::format::Notebook;
use nbcheck::logging;
use nbcheck::runner::{
    ExecutionError, ExecutionReport, LogReporter, NotebookExecutor, NotebookOutcome, NotebookRunner, RunError,
    RunReporter, RunSummary,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Write a one-cell notebook at `root/relative`.
fn write_notebook(root: &Path, relative: &str, code: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let doc = serde_json::json!({
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": ["# ", relative]},
            {"cell_type": "code", "execution_count": null, "metadata": {}, "outputs": [], "source": code}
        ],
        "metadata": {"kernelspec": {"name": "python3", "language": "python", "display_name": "Python 3"}},
        "nbformat": 4,
        "nbformat_minor": 5
    });
    fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

/// The three-notebook workshop from the runner contract.
fn workshop() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(dir.path(), "session_1/a.ipynb", "a = 1");
    write_notebook(dir.path(), "session_1/exercise_b.ipynb", "raise NotImplementedError");
    write_notebook(dir.path(), "session_2/c.ipynb", "c = 3");
    dir
}

/// Records what it was asked to run; fails any notebook whose code mentions `fail`, times out on `sleep`.
#[derive(Default)]
struct RecordingExecutor {
    executed: Vec<String>,
    working_dirs: Vec<PathBuf>,
}

impl NotebookExecutor for RecordingExecutor {
    fn execute(&mut self, notebook: &Notebook, working_dir: &Path) -> Result<ExecutionReport, ExecutionError> {
        let (index, cell) = notebook.code_cells().next().expect("fixture has one code cell");
        self.executed.push(cell.source.clone());
        self.working_dirs.push(working_dir.to_path_buf());

        if cell.source.contains("fail") {
            return Err(ExecutionError::CellFailed {
                cell: index,
                ename: "RuntimeError".to_string(),
                evalue: "boom".to_string(),
                traceback: vec![],
            });
        }
        if cell.source.contains("sleep") {
            return Err(ExecutionError::Timeout {
                budget: Duration::from_secs(1),
                cell: Some(index),
            });
        }
        Ok(ExecutionReport {
            cells_executed: 1,
            kernel_output: String::new(),
        })
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Vec<String>,
    summary: Option<RunSummary>,
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl RunReporter for RecordingReporter {
    fn on_notebook_skipped(&mut self, path: &Path) {
        self.events.push(format!("skip {}", file_name(path)));
    }

    fn on_notebook_start(&mut self, path: &Path) {
        assert!(path.is_absolute(), "notebooks are announced by their real path");
        self.events.push(format!("start {}", file_name(path)));
    }

    fn on_notebook_complete(&mut self, path: &Path, outcome: &NotebookOutcome) {
        let verdict = if outcome.is_failure() { "fail" } else { "pass" };
        self.events.push(format!("{verdict} {}", file_name(path)));
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.summary = Some(summary.clone());
    }
}

fn runner(root: &Path) -> NotebookRunner<RecordingExecutor, RecordingReporter> {
    NotebookRunner::new(
        RunnerConfig::new().with_root(root),
        RecordingExecutor::default(),
        RecordingReporter::default(),
    )
}

#[test]
fn test_runs_included_notebooks_in_order_and_skips_exercises() {
    let dir = workshop();
    let mut runner = runner(dir.path());

    let summary = runner.run().unwrap();

    assert_eq!(runner.executor().executed, vec!["a = 1", "c = 3"]);
    assert_eq!(
        runner.reporter().events,
        vec![
            "start a.ipynb",
            "pass a.ipynb",
            "skip exercise_b.ipynb",
            "start c.ipynb",
            "pass c.ipynb",
        ]
    );
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_exercise_matching_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(dir.path(), "session_1/EXERCISE_1.ipynb", "x = fail");
    write_notebook(dir.path(), "Exercises/solution.ipynb", "y = fail");
    write_notebook(dir.path(), "session_1/intro.ipynb", "z = 0");

    let mut runner = runner(dir.path());
    runner.run().unwrap();

    assert_eq!(runner.executor().executed, vec!["z = 0"]);
}

#[test]
fn test_working_dir_is_notebook_directory() {
    let dir = workshop();
    let mut runner = runner(dir.path());
    runner.run().unwrap();

    let root = fs::canonicalize(dir.path()).unwrap();
    assert_eq!(
        runner.executor().working_dirs,
        vec![root.join("session_1"), root.join("session_2")]
    );
}

#[test]
fn test_first_failure_aborts_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(dir.path(), "session_1/a.ipynb", "a = 1");
    write_notebook(dir.path(), "session_1/b.ipynb", "b = fail");
    write_notebook(dir.path(), "session_2/c.ipynb", "c = 3");

    let mut runner = runner(dir.path());
    let err = runner.run().unwrap_err();

    match &err {
        RunError::Notebook { path, source } => {
            assert_eq!(file_name(path), "b.ipynb");
            assert!(matches!(source, ExecutionError::CellFailed { cell: 1, .. }));
        }
        other => panic!("expected notebook failure, got {other:?}"),
    }
    assert_eq!(runner.executor().executed, vec!["a = 1", "b = fail"]);
    let summary = runner.reporter().summary.clone().unwrap();
    assert_eq!((summary.passed, summary.failed), (1, 1));
}

#[test]
fn test_keep_going_runs_everything_then_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(dir.path(), "session_1/a.ipynb", "a = fail");
    write_notebook(dir.path(), "session_1/b.ipynb", "b = 2");
    write_notebook(dir.path(), "session_2/c.ipynb", "c = fail");

    let mut runner = NotebookRunner::new(
        RunnerConfig::new().with_root(dir.path()).with_keep_going(true),
        RecordingExecutor::default(),
        RecordingReporter::default(),
    );
    let err = runner.run().unwrap_err();

    assert_eq!(runner.executor().executed.len(), 3);
    match err {
        RunError::Batch { summary } => {
            assert_eq!((summary.passed, summary.failed), (1, 2));
            let names: Vec<String> = summary.failures.iter().map(|p| file_name(p)).collect();
            assert_eq!(names, vec!["a.ipynb", "c.ipynb"]);
        }
        other => panic!("expected batch failure, got {other:?}"),
    }
}

#[test]
fn test_timeout_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(dir.path(), "session_1/slow.ipynb", "time.sleep(999)");
    write_notebook(dir.path(), "session_2/after.ipynb", "x = 1");

    let mut runner = runner(dir.path());
    let err = runner.run().unwrap_err();

    assert!(matches!(err, RunError::Notebook { ref source, .. } if source.is_timeout()));
    assert_eq!(runner.executor().executed, vec!["time.sleep(999)"]);
}

#[test]
fn test_unparseable_notebook_fails_that_notebook() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("session_1")).unwrap();
    fs::write(dir.path().join("session_1/broken.ipynb"), "{\"nbformat\": 4, \"cells\": [").unwrap();
    write_notebook(dir.path(), "session_2/fine.ipynb", "x = 1");

    let mut runner = runner(dir.path());
    let err = runner.run().unwrap_err();

    match err {
        RunError::Notebook { path, source } => {
            assert_eq!(file_name(&path), "broken.ipynb");
            assert!(matches!(source, ExecutionError::Format(_)));
        }
        other => panic!("expected notebook failure, got {other:?}"),
    }
    assert!(runner.executor().executed.is_empty());
}

#[test]
fn test_missing_root_is_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner(&dir.path().join("workshop"));
    let err = runner.run().unwrap_err();
    assert!(matches!(err, RunError::Discovery { .. }));
}

#[test]
fn test_empty_root_passes() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = runner(dir.path());
    let summary = runner.run().unwrap();
    assert_eq!(summary.executed(), 0);
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(dir.path(), "session_1/a.ipynb", "a = 1");
    write_notebook(dir.path(), "session_2/b.ipynb", "b = fail");

    let first = runner(dir.path()).run().map_err(|e| e.to_string());
    let second = runner(dir.path()).run().map_err(|e| e.to_string());
    assert_eq!(first, second);
    assert!(first.is_err());
}

#[test]
fn test_plan_marks_exclusions() {
    let dir = workshop();
    let plan = nbcheck::runner::plan(&RunnerConfig::new().with_root(dir.path())).unwrap();
    let marks: Vec<(String, bool)> = plan.iter().map(|p| (file_name(&p.path), p.excluded)).collect();
    assert_eq!(
        marks,
        vec![
            ("a.ipynb".to_string(), false),
            ("exercise_b.ipynb".to_string(), true),
            ("c.ipynb".to_string(), false),
        ]
    );
}

#[test]
fn test_cli_exit_codes() {
    let passing = workshop();
    let result = commands::run_with(
        RunnerConfig::new().with_root(passing.path()),
        RecordingExecutor::default(),
        RecordingReporter::default(),
    );
    assert_eq!(result.unwrap(), ExitCode::SUCCESS);

    let failing = tempfile::tempdir().unwrap();
    write_notebook(failing.path(), "session_1/a.ipynb", "fail()");
    let err = commands::run_with(
        RunnerConfig::new().with_root(failing.path()),
        RecordingExecutor::default(),
        RecordingReporter::default(),
    )
    .unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    // The reporter already logged the failure
    assert_eq!(err.message, "");

    let err = commands::run_with(
        RunnerConfig::new().with_root(failing.path()).with_keep_going(true),
        RecordingExecutor::default(),
        RecordingReporter::default(),
    )
    .unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert_eq!(err.message, "");
}

#[test]
fn test_cli_reports_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("workshop");
    let err = commands::run_with(
        RunnerConfig::new().with_root(&missing),
        RecordingExecutor::default(),
        RecordingReporter::default(),
    )
    .unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.contains("cannot read notebook root"), "message {}", err.message);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_log_reporter_lines() {
    let dir = workshop();
    write_notebook(dir.path(), "session_2/c.ipynb", "fail()");

    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = logging::subscriber(EnvFilter::new("info"), move || writer.clone());
    let result = tracing::subscriber::with_default(subscriber, || {
        NotebookRunner::new(
            RunnerConfig::new().with_root(dir.path()),
            RecordingExecutor::default(),
            LogReporter::new(),
        )
        .run()
    });
    assert!(matches!(result, Err(RunError::Notebook { .. })));

    let root = fs::canonicalize(dir.path()).unwrap().display().to_string();
    let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<String> = output
        .replace(&root, "[root]")
        .lines()
        .map(|line| match line.rsplit_once(" in ") {
            Some((counts, _)) if line.starts_with("INFO:1 passed") => format!("{counts} in [duration]"),
            _ => line.to_string(),
        })
        .collect();

    insta::assert_snapshot!(lines.join("\n"), @r"
    INFO:Running notebook tests...
    INFO:Testing notebook: [root]/session_1/a.ipynb
    INFO:Testing notebook: [root]/session_2/c.ipynb
    ERROR:Error executing the notebook [root]/session_2/c.ipynb
    ERROR:cell 1 raised RuntimeError: boom
    INFO:1 passed, 1 failed, 1 skipped in [duration]
    ");
}
