//! Data model for model sets, path steps, and execution reports.
//!
//! A model set is the JSON document the user authors: a named collection of
//! `Model`s, each a directed graph of `Vertex`/`Edge` elements. `Step` and
//! `ExecutionResult` are the wire shapes exchanged with the path generator and
//! the executor respectively; see `planner` and `executors`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root document: one or more models sharing a generator expression scope.
///
/// `#[serde(deny_unknown_fields)]` enforces the "unknown top-level keys are
/// rejected" rule from the model validator spec; `Model`/`Vertex`/`Edge`
/// themselves stay permissive (unknown per-element keys are accepted).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSet {
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,

    /// Generator expression, e.g. `"random(edge_coverage(100))"`.
    pub generator: String,

    #[serde(default)]
    pub start_element_id: Option<String>,

    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub shared_state: Option<String>,

    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub requirements: Vec<String>,

    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub source_vertex_id: Option<String>,
    pub target_vertex_id: String,

    #[serde(default)]
    pub guard: Option<String>,

    #[serde(default)]
    pub actions: Vec<String>,

    #[serde(default)]
    pub weight: Option<f64>,

    #[serde(default)]
    pub dependency: Option<u32>,
}

/// One unit of the path the generator hands to the walker — either a model
/// element (vertex/edge) or a fixture call (`modelName` absent).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub model_name: Option<String>,

    /// Generator-carried shared state, string-typed per the no-coercion rule.
    #[serde(default)]
    pub data: HashMap<String, String>,

    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub actions: Vec<String>,

    #[serde(default)]
    pub unvisited_elements: Vec<String>,
}

impl Step {
    pub fn is_fixture(&self) -> bool {
        self.model_name.is_none()
    }
}

/// What the executor returns after running a step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub output: String,

    /// Arbitrary, executor-defined return value; pass/fail is carried by
    /// `error` instead, not by this field.
    #[serde(default)]
    pub result: Option<serde_json::Value>,

    /// Updated shared state the executor wants written back through the
    /// generator via `setData`.
    #[serde(default)]
    pub data: HashMap<String, String>,

    #[serde(default)]
    pub error: Option<ExecutionError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionError {
    pub message: String,

    #[serde(default)]
    pub trace: Option<String>,
}

/// Per-step result as recorded for reporting, distinct from the executor's
/// raw `ExecutionResult` — carries timing and the step identity alongside it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step_id: String,
    pub name: String,
    pub model_name: Option<String>,
    pub status: StepStatus,
    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Full report for one walk, written by the `reporter` module.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub execution_id: String,
    pub status: String,
    pub start_time: String,
    pub end_time: String,
    pub summary: ExecutionSummary,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub total_steps: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl ExecutionSummary {
    pub fn from_results(results: &[StepReport], duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.status == StepStatus::Passed).count();
        let failed = results.iter().filter(|r| r.status == StepStatus::Failed).count();
        let skipped = results.iter().filter(|r| r.status == StepStatus::Skipped).count();

        Self {
            total_steps: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
        }
    }
}
