//! Executor layer: dispatches steps to the test code (spec §4.4).
//!
//! `HttpExecutor` talks to a running executor service over the
//! `/altwalker` wire protocol; `OfflineExecutor` is the no-op implementation
//! used by `altwalker walk` when replaying a path without driving real test
//! code.

pub mod http;
pub mod offline;

use crate::errors::ExecutorProtocolError;
use crate::protocol::{ExecutionResult, Step};
use async_trait::async_trait;

pub use http::HttpExecutor;
pub use offline::OfflineExecutor;

#[async_trait]
pub trait Executor: Send + Sync {
    async fn has_model(&self, model_name: &str) -> Result<bool, ExecutorProtocolError>;

    /// `model_name` absent means a run-level fixture (`setUpRun`/`tearDownRun`).
    async fn has_step(
        &self,
        model_name: Option<&str>,
        step_name: &str,
    ) -> Result<bool, ExecutorProtocolError>;

    async fn execute_step(&self, step: &Step) -> Result<ExecutionResult, ExecutorProtocolError>;

    /// Idempotent: resetting an already-fresh executor must not error.
    async fn reset(&self) -> Result<(), ExecutorProtocolError>;

    /// Idempotent: killing an already-stopped executor must not error.
    async fn kill(&self) -> Result<(), ExecutorProtocolError>;
}
