use super::{Reporter, RunStatistics};
use crate::protocol::{ExecutionReport, ExecutionSummary, Step, StepReport};
use chrono::Utc;
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

/// Accumulates the run into a single `ExecutionReport`, written to disk on
/// `end` if a path was configured (spec §6 `--report-file`).
pub struct JsonReporter {
    path: Option<PathBuf>,
    execution_id: String,
    start_time: String,
    steps: Vec<StepReport>,
    report: Option<ExecutionReport>,
}

impl JsonReporter {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            execution_id: Uuid::new_v4().to_string(),
            start_time: String::new(),
            steps: Vec::new(),
            report: None,
        }
    }
}

impl Reporter for JsonReporter {
    fn start(&mut self, _model_names: &[String], _expression: &str) {
        self.start_time = Utc::now().to_rfc3339();
    }

    fn end(&mut self, statistics: &RunStatistics) {
        let summary = ExecutionSummary::from_results(&self.steps, statistics.duration_ms);
        let report = ExecutionReport {
            execution_id: self.execution_id.clone(),
            status: if statistics.interrupted {
                "interrupted".to_string()
            } else if statistics.failed > 0 {
                "failed".to_string()
            } else {
                "passed".to_string()
            },
            start_time: self.start_time.clone(),
            end_time: Utc::now().to_rfc3339(),
            summary,
            steps: self.steps.clone(),
        };

        if let Some(path) = &self.path {
            let body = serde_json::to_string_pretty(&report).unwrap_or_default();
            if let Err(e) = std::fs::write(path, body) {
                tracing::error!(error = %e, path = ?path, "failed to write JSON report");
            }
        }
        self.report = Some(report);
    }

    fn step_start(&mut self, _step: &Step) {}

    fn step_end(&mut self, _step: &Step, report: &StepReport) {
        self.steps.push(report.clone());
    }

    fn report(&self) -> Option<Value> {
        self.report.as_ref().and_then(|r| serde_json::to_value(r).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn report_accumulates_steps_and_statistics() {
        let mut reporter = JsonReporter::new(None);
        reporter.start(&["Login".into()], "random(length(2))");

        let step = Step {
            id: "1".into(),
            name: "v0".into(),
            model_name: Some("Login".into()),
            data: HashMap::new(),
            properties: Default::default(),
            actions: vec![],
            unvisited_elements: vec![],
        };
        let step_report = StepReport {
            step_id: "1".into(),
            name: "v0".into(),
            model_name: Some("Login".into()),
            status: crate::protocol::StepStatus::Passed,
            duration_ms: 3,
            error: None,
        };
        reporter.step_end(&step, &step_report);
        reporter.end(&RunStatistics {
            total_steps: 1,
            passed: 1,
            failed: 0,
            skipped: 0,
            duration_ms: 3,
            interrupted: false,
        });

        let value = reporter.report().unwrap();
        assert_eq!(value["steps"].as_array().unwrap().len(), 1);
        assert_eq!(value["status"], "passed");
    }

    #[test]
    fn writes_to_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut reporter = JsonReporter::new(Some(path.clone()));
        reporter.start(&[], "random(length(1))");
        reporter.end(&RunStatistics {
            total_steps: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
            interrupted: false,
        });

        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"executionId\""));
    }
}
