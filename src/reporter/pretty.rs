use super::{Reporter, RunStatistics};
use crate::protocol::{Step, StepReport, StepStatus};
use tracing::{error, info};

/// Human-facing reporter: logs through `tracing`, matching the rest of the
/// runner's structured-logging style rather than writing straight to stdout.
#[derive(Default)]
pub struct PrettyReporter;

impl PrettyReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for PrettyReporter {
    fn start(&mut self, model_names: &[String], expression: &str) {
        info!(models = ?model_names, expression, "walk starting");
    }

    fn end(&mut self, statistics: &RunStatistics) {
        info!(
            total = statistics.total_steps,
            passed = statistics.passed,
            failed = statistics.failed,
            skipped = statistics.skipped,
            duration_ms = statistics.duration_ms,
            interrupted = statistics.interrupted,
            "walk finished"
        );
    }

    fn step_start(&mut self, step: &Step) {
        info!(model = ?step.model_name, name = %step.name, "step starting");
    }

    fn step_end(&mut self, step: &Step, report: &StepReport) {
        match report.status {
            StepStatus::Passed => info!(model = ?step.model_name, name = %step.name, "step passed"),
            StepStatus::Failed => error!(
                model = ?step.model_name,
                name = %step.name,
                error = ?report.error,
                "step failed"
            ),
            StepStatus::Skipped => info!(model = ?step.model_name, name = %step.name, "step skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn does_not_panic_on_a_full_run() {
        let mut reporter = PrettyReporter::new();
        reporter.start(&["Login".into()], "random(length(1))");

        let step = Step {
            id: "1".into(),
            name: "v0".into(),
            model_name: Some("Login".into()),
            data: HashMap::new(),
            properties: Default::default(),
            actions: vec![],
            unvisited_elements: vec![],
        };
        reporter.step_start(&step);
        reporter.step_end(
            &step,
            &StepReport {
                step_id: "1".into(),
                name: "v0".into(),
                model_name: Some("Login".into()),
                status: StepStatus::Passed,
                duration_ms: 1,
                error: None,
            },
        );
        reporter.end(&RunStatistics {
            total_steps: 1,
            passed: 1,
            failed: 0,
            skipped: 0,
            duration_ms: 1,
            interrupted: false,
        });
    }
}
