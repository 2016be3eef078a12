//! The walker: the state machine tying planner, executor, and reporters
//! together (spec §4.5).
//!
//! States: `Idle -> RunSetup -> ModelSetup -> Step -> ModelTeardown ->
//! RunTeardown -> Done`, plus an orthogonal `Failed` flag. This module
//! doesn't model the states as an explicit enum — the control flow below
//! *is* the state machine — but each phase is commented with the state it
//! implements.

use crate::errors::{AltWalkerError, ExecutorProtocolError, GeneratorError};
use crate::executors::Executor;
use crate::planner::{GeneratorValue, Planner};
use crate::protocol::{ExecutionError, Step, StepReport, StepStatus};
use crate::reporter::{Reporter, RunStatistics};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

const FIXTURE_TEARDOWN_DEADLINE: Duration = Duration::from_secs(10);

/// Outcome of a completed (or interrupted) walk.
pub struct WalkOutcome {
    pub failed: bool,
    pub interrupted: bool,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
}

impl WalkOutcome {
    /// Spec §4.5 rule 4: success is `not Failed AND no step raised error`.
    pub fn passed(&self) -> bool {
        !self.failed && !self.interrupted
    }
}

pub struct Walker<P, E, R> {
    planner: P,
    executor: E,
    reporter: R,
    cancellation: CancellationToken,
    /// Presence cache keyed by (modelName, fixtureName); `None` model means a
    /// run-level fixture (spec §4.5 fixture visibility rule).
    fixture_presence: HashMap<(Option<String>, String), bool>,
}

impl<P: Planner, E: Executor, R: Reporter> Walker<P, E, R> {
    pub fn new(planner: P, executor: E, reporter: R, cancellation: CancellationToken) -> Self {
        Self {
            planner,
            executor,
            reporter,
            cancellation,
            fixture_presence: HashMap::new(),
        }
    }

    /// `model = None` queries a run-level fixture (spec §4.4: "absent model
    /// means a run-level fixture").
    async fn fixture_present(&mut self, model: Option<&str>, name: &str) -> Result<bool, ExecutorProtocolError> {
        let key = (model.map(str::to_string), name.to_string());
        if let Some(present) = self.fixture_presence.get(&key) {
            return Ok(*present);
        }
        let present = self.executor.has_step(model, name).await?;
        self.fixture_presence.insert(key, present);
        Ok(present)
    }

    fn synthetic_step(model: Option<&str>, name: &str) -> Step {
        Step {
            id: format!("fixture:{}:{}", model.unwrap_or(""), name),
            name: name.to_string(),
            model_name: model.map(str::to_string),
            data: HashMap::new(),
            properties: Default::default(),
            actions: vec![],
            unvisited_elements: vec![],
        }
    }

    fn is_fatal(e: &ExecutorProtocolError) -> bool {
        matches!(
            e,
            ExecutorProtocolError::PathNotFound { .. }
                | ExecutorProtocolError::LoadError { .. }
                | ExecutorProtocolError::NoCodeLoaded
        )
    }

    /// Invokes a fixture if present. Returns `Ok(None)` if absent (not an
    /// error), `Ok(Some(true/false))` for pass/fail, `Err` only for fatal
    /// protocol/transport failures that must abort the run.
    async fn invoke_fixture(
        &mut self,
        model: Option<&str>,
        name: &str,
    ) -> Result<Option<bool>, AltWalkerError> {
        let present = self
            .fixture_present(model, name)
            .await
            .map_err(AltWalkerError::ExecutorProtocol)?;
        if !present {
            return Ok(None);
        }

        let step = Self::synthetic_step(model, name);
        self.reporter.step_start(&step);
        let started = Instant::now();

        let outcome = self.executor.execute_step(&step).await;
        let (passed, error_message) = match outcome {
            Ok(result) => match &result.error {
                Some(err) => (false, Some(err.message.clone())),
                None => (true, None),
            },
            Err(e) if Self::is_fatal(&e) => return Err(AltWalkerError::ExecutorProtocol(e)),
            Err(e) => (false, Some(e.to_string())),
        };

        let report = StepReport {
            step_id: step.id.clone(),
            name: step.name.clone(),
            model_name: step.model_name.clone(),
            status: if passed { StepStatus::Passed } else { StepStatus::Failed },
            duration_ms: started.elapsed().as_millis() as u64,
            error: error_message,
        };
        self.reporter.step_end(&step, &report);

        Ok(Some(passed))
    }

    /// `beforeStep`: global then model-scoped. Returns `false` if either
    /// invoked fixture failed (step must be skipped but `afterStep` still
    /// runs).
    async fn run_before_step(&mut self, model: Option<&str>, failed: &mut bool) -> Result<bool, AltWalkerError> {
        let mut ok = true;
        if let Some(passed) = self.invoke_fixture(None, "beforeStep").await? {
            ok &= passed;
        }
        if let Some(m) = model {
            if let Some(passed) = self.invoke_fixture(Some(m), "beforeStep").await? {
                ok &= passed;
            }
        }
        if !ok {
            *failed = true;
        }
        Ok(ok)
    }

    /// `afterStep`: model-scoped then global. Failures flag but never unwind.
    async fn run_after_step(&mut self, model: Option<&str>, failed: &mut bool) -> Result<(), AltWalkerError> {
        if let Some(m) = model {
            if let Some(false) = self.invoke_fixture(Some(m), "afterStep").await? {
                *failed = true;
            }
        }
        if let Some(false) = self.invoke_fixture(None, "afterStep").await? {
            *failed = true;
        }
        Ok(())
    }

    async fn teardown_model(&mut self, model: &str, failed: &mut bool) {
        let result = tokio::time::timeout(
            FIXTURE_TEARDOWN_DEADLINE,
            self.invoke_fixture(Some(model), "tearDownModel"),
        )
        .await;
        match result {
            Ok(Ok(Some(false))) => *failed = true,
            Ok(Err(e)) => {
                warn!(error = %e, model, "tearDownModel failed");
                *failed = true;
            }
            Err(_) => {
                warn!(model, "tearDownModel timed out");
                *failed = true;
            }
            _ => {}
        }
    }

    async fn teardown_run(&mut self, failed: &mut bool) {
        let result = tokio::time::timeout(FIXTURE_TEARDOWN_DEADLINE, self.invoke_fixture(None, "tearDownRun")).await;
        match result {
            Ok(Ok(Some(false))) => *failed = true,
            Ok(Err(e)) => {
                warn!(error = %e, "tearDownRun failed");
                *failed = true;
            }
            Err(_) => {
                warn!("tearDownRun timed out");
                *failed = true;
            }
            _ => {}
        }
    }

    /// Runs the walk end-to-end: `RunSetup -> (ModelSetup -> Step)* ->
    /// ModelTeardown -> RunTeardown -> Done`.
    pub async fn run(&mut self, model_names: &[String], expression: &str) -> Result<WalkOutcome, AltWalkerError> {
        let start = Instant::now();
        self.reporter.start(model_names, expression);

        let mut failed = false;
        let mut interrupted = false;
        let mut steps: Vec<StepReport> = Vec::new();
        let mut current_model: Option<String> = None;
        let mut current_model_blocked = false;

        // --- Idle -> RunSetup ---
        let run_setup_ok = match self.invoke_fixture(None, "setUpRun").await {
            Ok(Some(false)) => {
                failed = true;
                false
            }
            Ok(_) => true,
            Err(e) => {
                failed = true;
                self.teardown_run(&mut failed).await;
                return Err(e);
            }
        };

        if run_setup_ok {
            'walk: loop {
                if self.cancellation.is_cancelled() {
                    interrupted = true;
                    break 'walk;
                }

                let has_next = match self.planner.has_next().await {
                    Ok(v) => v,
                    Err(e) => {
                        if let Some(model) = current_model.take() {
                            self.teardown_model(&model, &mut failed).await;
                        }
                        self.teardown_run(&mut failed).await;
                        return Err(AltWalkerError::Generator(e));
                    }
                };
                if !has_next {
                    break 'walk;
                }

                let step = match self.planner.get_next().await {
                    Ok(s) => s,
                    Err(e) => {
                        if let Some(model) = current_model.take() {
                            self.teardown_model(&model, &mut failed).await;
                        }
                        self.teardown_run(&mut failed).await;
                        return Err(AltWalkerError::Generator(e));
                    }
                };

                // --- ModelSetup ---
                if step.model_name != current_model {
                    if let Some(model) = current_model.take() {
                        self.teardown_model(&model, &mut failed).await;
                    }
                    current_model = step.model_name.clone();
                    current_model_blocked = false;
                    if let Some(model) = &current_model {
                        match self.invoke_fixture(Some(model), "setUpModel").await {
                            Ok(Some(false)) => {
                                failed = true;
                                current_model_blocked = true;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                self.teardown_run(&mut failed).await;
                                return Err(e);
                            }
                        }
                    }
                }

                if current_model_blocked {
                    continue 'walk;
                }

                // Anonymous vertex/edge (name ""): the generator still hands
                // it back, but no method is looked up for it.
                if step.name.is_empty() {
                    steps.push(StepReport {
                        step_id: step.id.clone(),
                        name: step.name.clone(),
                        model_name: step.model_name.clone(),
                        status: StepStatus::Skipped,
                        duration_ms: 0,
                        error: None,
                    });
                    continue 'walk;
                }

                // --- Step ---
                let before_ok = self.run_before_step(current_model.as_deref(), &mut failed).await?;

                if before_ok {
                    self.reporter.step_start(&step);
                    let started = Instant::now();

                    let (status, error_message) = match self.executor.execute_step(&step).await {
                        Ok(result) => {
                            for (key, value) in result.data {
                                if let Err(e) = self.planner.set_data(&key, GeneratorValue::Str(value)).await {
                                    warn!(error = %e, key, "setData failed");
                                }
                            }
                            match result.error {
                                Some(ExecutionError { message, .. }) => {
                                    failed = true;
                                    if let Err(e) = self.planner.fail(&message).await {
                                        warn!(error = %e, "planner.fail failed");
                                    }
                                    (StepStatus::Failed, Some(message))
                                }
                                None => (StepStatus::Passed, None),
                            }
                        }
                        Err(e) if Self::is_fatal(&e) => {
                            if let Some(model) = current_model.take() {
                                self.teardown_model(&model, &mut failed).await;
                            }
                            self.teardown_run(&mut failed).await;
                            return Err(AltWalkerError::ExecutorProtocol(e));
                        }
                        Err(e) => {
                            failed = true;
                            let message = e.to_string();
                            if let Err(fail_err) = self.planner.fail(&message).await {
                                warn!(error = %fail_err, "planner.fail failed");
                            }
                            (StepStatus::Failed, Some(message))
                        }
                    };

                    let report = StepReport {
                        step_id: step.id.clone(),
                        name: step.name.clone(),
                        model_name: step.model_name.clone(),
                        status,
                        duration_ms: started.elapsed().as_millis() as u64,
                        error: error_message,
                    };
                    self.reporter.step_end(&step, &report);
                    steps.push(report);
                } else {
                    steps.push(StepReport {
                        step_id: step.id.clone(),
                        name: step.name.clone(),
                        model_name: step.model_name.clone(),
                        status: StepStatus::Skipped,
                        duration_ms: 0,
                        error: None,
                    });
                }

                self.run_after_step(current_model.as_deref(), &mut failed).await?;
            }
        }

        // --- ModelTeardown, RunTeardown -> Done ---
        if let Some(model) = current_model.take() {
            self.teardown_model(&model, &mut failed).await;
        }
        self.teardown_run(&mut failed).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let statistics = RunStatistics {
            total_steps: steps.len(),
            passed: steps.iter().filter(|s| s.status == StepStatus::Passed).count(),
            failed: steps.iter().filter(|s| s.status == StepStatus::Failed).count(),
            skipped: steps.iter().filter(|s| s.status == StepStatus::Skipped).count(),
            duration_ms,
            interrupted,
        };
        self.reporter.end(&statistics);

        let _ = self.executor.kill().await;
        let _ = self.planner.close().await;

        Ok(WalkOutcome {
            failed,
            interrupted,
            steps,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::OfflineExecutor;
    use crate::planner::OfflinePlanner;
    use crate::reporter::Reporting;

    fn step(model: &str, name: &str, id: &str) -> Step {
        Step {
            id: id.into(),
            name: name.into(),
            model_name: Some(model.into()),
            data: HashMap::new(),
            properties: Default::default(),
            actions: vec![],
            unvisited_elements: vec![],
        }
    }

    #[tokio::test]
    async fn happy_path_with_offline_executor_passes_every_step() {
        let planner = OfflinePlanner::new(vec![step("Login", "v_start", "1"), step("Login", "e_submit", "2")]);
        let executor = OfflineExecutor::new();
        let reporter = Reporting::new();
        let mut walker = Walker::new(planner, executor, reporter, CancellationToken::new());

        let outcome = walker.run(&["Login".into()], "random(length(2))").await.unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.steps.len(), 2);
        assert!(outcome.steps.iter().all(|s| s.status == StepStatus::Passed));
    }

    #[tokio::test]
    async fn anonymous_element_is_skipped_without_dispatch() {
        struct PanicsOnDispatch;

        #[async_trait::async_trait]
        impl Executor for PanicsOnDispatch {
            async fn has_model(&self, _model_name: &str) -> Result<bool, ExecutorProtocolError> {
                Ok(true)
            }
            async fn has_step(&self, _model_name: Option<&str>, _step_name: &str) -> Result<bool, ExecutorProtocolError> {
                Ok(false)
            }
            async fn execute_step(&self, step: &Step) -> Result<crate::protocol::ExecutionResult, ExecutorProtocolError> {
                panic!("anonymous element {} must never be dispatched", step.id)
            }
            async fn reset(&self) -> Result<(), ExecutorProtocolError> {
                Ok(())
            }
            async fn kill(&self) -> Result<(), ExecutorProtocolError> {
                Ok(())
            }
        }

        let planner = OfflinePlanner::new(vec![step("Login", "", "1")]);
        let reporter = Reporting::new();
        let mut walker = Walker::new(planner, PanicsOnDispatch, reporter, CancellationToken::new());

        let outcome = walker.run(&["Login".into()], "random(length(1))").await.unwrap();
        assert!(outcome.passed());
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].status, StepStatus::Skipped);
    }

    #[tokio::test]
    async fn cancelled_before_any_step_marks_run_interrupted() {
        let planner = OfflinePlanner::new(vec![step("Login", "v_start", "1")]);
        let executor = OfflineExecutor::new();
        let reporter = Reporting::new();
        let token = CancellationToken::new();
        token.cancel();
        let mut walker = Walker::new(planner, executor, reporter, token);

        let outcome = walker.run(&["Login".into()], "random(length(1))").await.unwrap();
        assert!(outcome.interrupted);
        assert!(!outcome.passed());
        assert!(outcome.steps.is_empty());
    }
}
