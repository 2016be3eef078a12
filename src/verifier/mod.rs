//! CodeVerifier: checks that the test code actually implements every model
//! and step the model set declares (spec §4.7).

use crate::errors::ExecutorProtocolError;
use crate::executors::Executor;
use crate::protocol::ModelSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Vertex,
    Edge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingElement {
    pub model: String,
    pub kind: ElementKind,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct VerificationReport {
    pub missing_models: Vec<String>,
    pub missing_elements: Vec<MissingElement>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.missing_models.is_empty() && self.missing_elements.is_empty()
    }
}

/// Walks every model/vertex/edge in declaration order, querying the executor
/// for presence. Unknown-but-present elements never produce a warning — only
/// absence does.
pub async fn verify_code(
    model_set: &ModelSet,
    executor: &dyn Executor,
) -> Result<VerificationReport, ExecutorProtocolError> {
    let mut report = VerificationReport::default();

    for model in &model_set.models {
        if !executor.has_model(&model.name).await? {
            report.missing_models.push(model.name.clone());
            continue;
        }

        for vertex in &model.vertices {
            if vertex.name.is_empty() {
                continue; // anonymous vertex; the walker never dispatches it
            }
            if !executor.has_step(Some(&model.name), &vertex.name).await? {
                report.missing_elements.push(MissingElement {
                    model: model.name.clone(),
                    kind: ElementKind::Vertex,
                    name: vertex.name.clone(),
                });
            }
        }

        for edge in &model.edges {
            let Some(name) = &edge.name else { continue };
            if name.is_empty() {
                continue;
            }
            if !executor.has_step(Some(&model.name), name).await? {
                report.missing_elements.push(MissingElement {
                    model: model.name.clone(),
                    kind: ElementKind::Edge,
                    name: name.clone(),
                });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::OfflineExecutor;
    use crate::protocol::{Edge, Model, Vertex};

    fn model_set() -> ModelSet {
        ModelSet {
            models: vec![Model {
                id: "m0".into(),
                name: "Login".into(),
                generator: "random(length(2))".into(),
                start_element_id: Some("v0".into()),
                vertices: vec![Vertex {
                    id: "v0".into(),
                    name: "v_start".into(),
                    shared_state: None,
                    properties: Default::default(),
                    requirements: vec![],
                    blocked: false,
                }],
                edges: vec![Edge {
                    id: "e0".into(),
                    name: Some("e_submit".into()),
                    source_vertex_id: Some("v0".into()),
                    target_vertex_id: "v0".into(),
                    guard: None,
                    actions: vec![],
                    weight: None,
                    dependency: None,
                }],
            }],
        }
    }

    #[tokio::test]
    async fn offline_executor_is_always_fully_covered() {
        let executor = OfflineExecutor::new();
        let report = verify_code(&model_set(), &executor).await.unwrap();
        assert!(report.is_clean());
    }

    struct PartialExecutor;

    #[async_trait::async_trait]
    impl Executor for PartialExecutor {
        async fn has_model(&self, _model_name: &str) -> Result<bool, ExecutorProtocolError> {
            Ok(true)
        }
        async fn has_step(&self, _model_name: Option<&str>, step_name: &str) -> Result<bool, ExecutorProtocolError> {
            Ok(step_name != "e_submit")
        }
        async fn execute_step(
            &self,
            _step: &crate::protocol::Step,
        ) -> Result<crate::protocol::ExecutionResult, ExecutorProtocolError> {
            unimplemented!()
        }
        async fn reset(&self) -> Result<(), ExecutorProtocolError> {
            Ok(())
        }
        async fn kill(&self) -> Result<(), ExecutorProtocolError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reports_missing_step_by_name() {
        let report = verify_code(&model_set(), &PartialExecutor).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.missing_elements.len(), 1);
        assert_eq!(report.missing_elements[0].name, "e_submit");
        assert_eq!(report.missing_elements[0].kind, ElementKind::Edge);
    }
}
