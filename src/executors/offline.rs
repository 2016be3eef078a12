//! No-op executor used by `altwalker walk` when replaying a previously
//! recorded path without driving real test code (spec §4.4).

use super::Executor;
use crate::errors::ExecutorProtocolError;
use crate::protocol::{ExecutionResult, Step};
use async_trait::async_trait;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct OfflineExecutor;

impl OfflineExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for OfflineExecutor {
    async fn has_model(&self, _model_name: &str) -> Result<bool, ExecutorProtocolError> {
        Ok(true)
    }

    async fn has_step(&self, _model_name: Option<&str>, _step_name: &str) -> Result<bool, ExecutorProtocolError> {
        Ok(true)
    }

    async fn execute_step(&self, _step: &Step) -> Result<ExecutionResult, ExecutorProtocolError> {
        Ok(ExecutionResult {
            output: String::new(),
            result: None,
            data: HashMap::new(),
            error: None,
        })
    }

    async fn reset(&self) -> Result<(), ExecutorProtocolError> {
        Ok(())
    }

    async fn kill(&self) -> Result<(), ExecutorProtocolError> {
        Ok(())
    }
}
