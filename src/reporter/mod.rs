//! Reporter layer: side-effect-only observers of the walker loop (spec §4.6).
//!
//! `Reporting` fans calls out to any number of concrete `Reporter`s. Reporter
//! implementations never mutate the step or result they're handed.

pub mod json;
pub mod pretty;

use crate::protocol::{Step, StepReport};
use serde_json::Value;

pub use json::JsonReporter;
pub use pretty::PrettyReporter;

/// A run's outcome as seen by the walker, handed to `End`.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub total_steps: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub interrupted: bool,
}

pub trait Reporter: Send + Sync {
    fn start(&mut self, model_names: &[String], expression: &str);
    fn end(&mut self, statistics: &RunStatistics);
    fn step_start(&mut self, step: &Step);
    fn step_end(&mut self, step: &Step, report: &StepReport);

    /// Optional implementation-defined report accessor; default is none.
    fn report(&self) -> Option<Value> {
        None
    }
}

/// Composes multiple reporters, calling each in registration order.
#[derive(Default)]
pub struct Reporting {
    reporters: Vec<Box<dyn Reporter>>,
}

impl Reporting {
    pub fn new() -> Self {
        Self { reporters: Vec::new() }
    }

    pub fn add(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }
}

impl Reporter for Reporting {
    fn start(&mut self, model_names: &[String], expression: &str) {
        for r in &mut self.reporters {
            r.start(model_names, expression);
        }
    }

    fn end(&mut self, statistics: &RunStatistics) {
        for r in &mut self.reporters {
            r.end(statistics);
        }
    }

    fn step_start(&mut self, step: &Step) {
        for r in &mut self.reporters {
            r.step_start(step);
        }
    }

    fn step_end(&mut self, step: &Step, report: &StepReport) {
        for r in &mut self.reporters {
            r.step_end(step, report);
        }
    }

    fn report(&self) -> Option<Value> {
        self.reporters.iter().find_map(|r| r.report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StepStatus;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct RecordingReporter {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Reporter for RecordingReporter {
        fn start(&mut self, _model_names: &[String], _expression: &str) {
            self.events.lock().unwrap().push("start".into());
        }
        fn end(&mut self, _statistics: &RunStatistics) {
            self.events.lock().unwrap().push("end".into());
        }
        fn step_start(&mut self, step: &Step) {
            self.events.lock().unwrap().push(format!("step_start:{}", step.name));
        }
        fn step_end(&mut self, step: &Step, _report: &StepReport) {
            self.events.lock().unwrap().push(format!("step_end:{}", step.name));
        }
    }

    fn sample_step(name: &str) -> Step {
        Step {
            id: "1".into(),
            name: name.into(),
            model_name: Some("M".into()),
            data: HashMap::new(),
            properties: Default::default(),
            actions: vec![],
            unvisited_elements: vec![],
        }
    }

    #[test]
    fn fans_out_to_every_registered_reporter() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut reporting = Reporting::new();
        reporting.add(Box::new(RecordingReporter { events: events.clone() }));
        reporting.add(Box::new(RecordingReporter { events: events.clone() }));

        reporting.start(&["M".into()], "random(length(2))");
        let step = sample_step("v0");
        reporting.step_start(&step);

        assert_eq!(
            *events.lock().unwrap(),
            vec!["start", "start", "step_start:v0", "step_start:v0"]
        );
    }

    #[test]
    fn step_start_then_step_end_pairs_match_by_name() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut reporting = Reporting::new();
        reporting.add(Box::new(RecordingReporter { events: events.clone() }));

        let step = sample_step("e0");
        reporting.step_start(&step);
        let report = StepReport {
            step_id: step.id.clone(),
            name: step.name.clone(),
            model_name: step.model_name.clone(),
            status: StepStatus::Passed,
            duration_ms: 1,
            error: None,
        };
        reporting.step_end(&step, &report);

        assert_eq!(*events.lock().unwrap(), vec!["step_start:e0", "step_end:e0"]);
    }
}
