//! Replays a finite, pre-computed path (spec §4.3). Used by `altwalker walk`
//! against a path file produced by an earlier online run.

use super::{GeneratorValue, Planner};
use crate::errors::GeneratorError;
use crate::protocol::Step;
use async_trait::async_trait;
use std::collections::HashMap;

pub struct OfflinePlanner {
    steps: Vec<Step>,
    cursor: usize,
}

impl OfflinePlanner {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps, cursor: 0 }
    }
}

#[async_trait]
impl Planner for OfflinePlanner {
    async fn has_next(&mut self) -> Result<bool, GeneratorError> {
        Ok(self.cursor < self.steps.len())
    }

    async fn get_next(&mut self) -> Result<Step, GeneratorError> {
        let step = self.steps.get(self.cursor).cloned().ok_or_else(|| {
            GeneratorError::MalformedResponse("offline path exhausted".to_string())
        })?;
        self.cursor += 1;
        Ok(step)
    }

    async fn get_data(&mut self) -> Result<HashMap<String, String>, GeneratorError> {
        Ok(HashMap::new())
    }

    async fn set_data(&mut self, _key: &str, _value: GeneratorValue) -> Result<(), GeneratorError> {
        Ok(())
    }

    async fn restart(&mut self) -> Result<(), GeneratorError> {
        Ok(())
    }

    async fn fail(&mut self, _message: &str) -> Result<(), GeneratorError> {
        Ok(())
    }

    async fn get_statistics(&mut self) -> Result<serde_json::Value, GeneratorError> {
        Ok(serde_json::json!({ "offline": true, "totalSteps": self.steps.len() }))
    }

    async fn close(&mut self) -> Result<(), GeneratorError> {
        Ok(())
    }
}
