//! Planner layer: abstracts over where the next `Step` comes from.
//!
//! `OnlinePlanner` asks a live GraphWalker-compatible generator subprocess;
//! `OfflinePlanner` replays a finite pre-computed path. The walker only ever
//! talks to the `Planner` trait, so it's agnostic to which mode it's driving.

pub mod offline;
pub mod online;

use crate::errors::GeneratorError;
use crate::protocol::Step;
use async_trait::async_trait;

pub use offline::OfflinePlanner;
pub use online::{GeneratorValue, OnlinePlanner};

#[async_trait]
pub trait Planner: Send + Sync {
    async fn has_next(&mut self) -> Result<bool, GeneratorError>;
    async fn get_next(&mut self) -> Result<Step, GeneratorError>;

    /// Online-only; a no-op for `OfflinePlanner`.
    async fn get_data(&mut self) -> Result<std::collections::HashMap<String, String>, GeneratorError>;

    /// Online-only; a no-op for `OfflinePlanner`.
    async fn set_data(&mut self, key: &str, value: GeneratorValue) -> Result<(), GeneratorError>;

    /// Online-only; a no-op for `OfflinePlanner`.
    async fn restart(&mut self) -> Result<(), GeneratorError>;

    /// Online-only; a no-op for `OfflinePlanner`. Tells the generator the
    /// last step failed, which may influence subsequent path choices.
    async fn fail(&mut self, message: &str) -> Result<(), GeneratorError>;

    async fn get_statistics(&mut self) -> Result<serde_json::Value, GeneratorError>;

    /// Idempotent: closing twice must not error.
    async fn close(&mut self) -> Result<(), GeneratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Step;
    use std::collections::HashMap;

    #[tokio::test]
    async fn offline_planner_replays_in_order() {
        let steps = vec![
            Step {
                id: "1".into(),
                name: "v_start".into(),
                model_name: Some("Login".into()),
                data: HashMap::new(),
                properties: Default::default(),
                actions: vec![],
                unvisited_elements: vec![],
            },
            Step {
                id: "2".into(),
                name: "e_submit".into(),
                model_name: Some("Login".into()),
                data: HashMap::new(),
                properties: Default::default(),
                actions: vec![],
                unvisited_elements: vec![],
            },
        ];

        let mut planner = OfflinePlanner::new(steps);
        assert!(planner.has_next().await.unwrap());
        assert_eq!(planner.get_next().await.unwrap().name, "v_start");
        assert!(planner.has_next().await.unwrap());
        assert_eq!(planner.get_next().await.unwrap().name, "e_submit");
        assert!(!planner.has_next().await.unwrap());
    }

    #[tokio::test]
    async fn offline_planner_control_calls_are_inert() {
        let mut planner = OfflinePlanner::new(vec![]);
        assert!(planner.restart().await.is_ok());
        assert!(planner.fail("whatever").await.is_ok());
        assert!(planner.get_data().await.unwrap().is_empty());
        assert!(planner.close().await.is_ok());
        assert!(planner.close().await.is_ok());
    }
}
