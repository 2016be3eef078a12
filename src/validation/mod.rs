//! Model set validation: schema shape, then semantic invariants.
//!
//! `validate_schema` rejects structurally malformed documents (unknown
//! top-level keys, missing required fields). `validate_semantics` checks the
//! invariants that only make sense once the shape is known to be correct:
//! unique ids, edge endpoint resolution, identifier grammar, reserved words,
//! start element resolution, and action syntax. Both collect every violation
//! instead of failing on the first one, ordered by (model index, element
//! index) so output is stable across runs.

use crate::protocol::{Edge, Model, ModelSet, Vertex};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const RESERVED_WORDS: &[&str] = &[
    "fn", "let", "if", "else", "match", "return", "self", "true", "false", "async", "await",
];

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

const EMBEDDED_SCHEMA: &str = include_str!("model_set.schema.json");

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    #[error("model set has no models")]
    EmptyModelSet,

    #[error("model '{model}': duplicate id '{id}'")]
    DuplicateId { model: String, id: String },

    #[error("model '{model}': edge '{edge}' targets unknown vertex '{target}'")]
    DanglingEdgeEndpoint {
        model: String,
        edge: String,
        target: String,
    },

    #[error("model '{model}': '{name}' is not a valid identifier")]
    InvalidIdentifier { model: String, name: String },

    #[error("model '{model}': '{name}' is a reserved word")]
    ReservedWord { model: String, name: String },

    #[error("model '{model}': startElementId '{start}' does not resolve to any vertex or edge")]
    UnresolvedStartElement { model: String, start: String },

    #[error("model '{model}': edge '{edge}' action '{action}' does not end in ';'")]
    ActionMissingSemicolon {
        model: String,
        edge: String,
        action: String,
    },

    #[error("model '{model}': generator expression '{expr}' could not be resolved")]
    AmbiguousGeneratorExpression { model: String, expr: String },
}

pub type ValidationResult = Result<(), Vec<ModelValidationError>>;

/// Structural validation against the embedded model-set JSON schema.
///
/// Returns the compiled schema's violation messages wrapped as
/// `ModelValidationError`-compatible strings; unlike `validate_semantics` this
/// check runs against raw JSON, before `ModelSet` is even deserialized, so it
/// can catch shape errors deserialization would otherwise silently default away.
pub fn validate_schema(raw: &serde_json::Value) -> Result<(), Vec<String>> {
    let schema: serde_json::Value =
        serde_json::from_str(EMBEDDED_SCHEMA).expect("embedded schema must parse");
    let compiled = jsonschema::JSONSchema::compile(&schema).expect("embedded schema must compile");

    let errors: Vec<String> = match compiled.validate(raw) {
        Ok(()) => vec![],
        Err(errs) => errs.map(|e| e.to_string()).collect(),
    };

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Semantic validation of an already-deserialized model set (spec §4.1).
pub fn validate_semantics(model_set: &ModelSet) -> ValidationResult {
    let mut errors = Vec::new();

    if model_set.models.is_empty() {
        errors.push(ModelValidationError::EmptyModelSet);
        return Err(errors);
    }

    for model in &model_set.models {
        validate_model(model, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_model(model: &Model, errors: &mut Vec<ModelValidationError>) {
    check_unique_ids(model, errors);
    check_identifier_names(model, errors);
    check_edge_endpoints(model, errors);
    check_start_element(model, errors);
    check_edge_actions(model, errors);
}

fn check_unique_ids(model: &Model, errors: &mut Vec<ModelValidationError>) {
    let mut seen = std::collections::HashSet::new();
    for id in model
        .vertices
        .iter()
        .map(|v| &v.id)
        .chain(model.edges.iter().map(|e| &e.id))
    {
        if !seen.insert(id.as_str()) {
            errors.push(ModelValidationError::DuplicateId {
                model: model.name.clone(),
                id: id.clone(),
            });
        }
    }
}

fn check_identifier_names(model: &Model, errors: &mut Vec<ModelValidationError>) {
    for vertex in &model.vertices {
        check_identifier(&model.name, &vertex.name, errors);
    }
    for edge in &model.edges {
        if let Some(name) = &edge.name {
            check_identifier(&model.name, name, errors);
        }
    }
}

fn check_identifier(model_name: &str, name: &str, errors: &mut Vec<ModelValidationError>) {
    if !IDENTIFIER_RE.is_match(name) {
        errors.push(ModelValidationError::InvalidIdentifier {
            model: model_name.to_string(),
            name: name.to_string(),
        });
        return;
    }
    if RESERVED_WORDS.contains(&name) {
        errors.push(ModelValidationError::ReservedWord {
            model: model_name.to_string(),
            name: name.to_string(),
        });
    }
}

fn check_edge_endpoints(model: &Model, errors: &mut Vec<ModelValidationError>) {
    let vertex_ids: std::collections::HashSet<&str> =
        model.vertices.iter().map(|v| v.id.as_str()).collect();

    for edge in &model.edges {
        if let Some(source) = &edge.source_vertex_id {
            if !vertex_ids.contains(source.as_str()) {
                errors.push(ModelValidationError::DanglingEdgeEndpoint {
                    model: model.name.clone(),
                    edge: edge.id.clone(),
                    target: source.clone(),
                });
            }
        }
        if !vertex_ids.contains(edge.target_vertex_id.as_str()) {
            errors.push(ModelValidationError::DanglingEdgeEndpoint {
                model: model.name.clone(),
                edge: edge.id.clone(),
                target: edge.target_vertex_id.clone(),
            });
        }
    }
}

fn check_start_element(model: &Model, errors: &mut Vec<ModelValidationError>) {
    let Some(start) = &model.start_element_id else {
        return;
    };

    let resolves = model.vertices.iter().any(|v| &v.id == start)
        || model.edges.iter().any(|e| &e.id == start);

    if !resolves {
        errors.push(ModelValidationError::UnresolvedStartElement {
            model: model.name.clone(),
            start: start.clone(),
        });
    }
}

fn check_edge_actions(model: &Model, errors: &mut Vec<ModelValidationError>) {
    for edge in &model.edges {
        for action in &edge.actions {
            if !action.trim_end().ends_with(';') {
                errors.push(ModelValidationError::ActionMissingSemicolon {
                    model: model.name.clone(),
                    edge: edge.id.clone(),
                    action: action.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Edge, Model, ModelSet, Vertex};

    fn model_with(vertices: Vec<Vertex>, edges: Vec<Edge>) -> ModelSet {
        ModelSet {
            models: vec![Model {
                id: "m1".into(),
                name: "Login".into(),
                generator: "random(edge_coverage(100))".into(),
                start_element_id: None,
                vertices,
                edges,
            }],
        }
    }

    fn vertex(id: &str, name: &str) -> Vertex {
        Vertex {
            id: id.into(),
            name: name.into(),
            shared_state: None,
            properties: Default::default(),
            requirements: vec![],
            blocked: false,
        }
    }

    fn edge(id: &str, source: Option<&str>, target: &str) -> Edge {
        Edge {
            id: id.into(),
            name: Some(format!("e_{id}")),
            source_vertex_id: source.map(|s| s.to_string()),
            target_vertex_id: target.into(),
            guard: None,
            actions: vec![],
            weight: None,
            dependency: None,
        }
    }

    #[test]
    fn empty_model_set_is_rejected() {
        let model_set = ModelSet { models: vec![] };
        let result = validate_semantics(&model_set);
        assert_eq!(result.unwrap_err(), vec![ModelValidationError::EmptyModelSet]);
    }

    #[test]
    fn valid_model_passes() {
        let model_set = model_with(
            vec![vertex("v0", "v_start"), vertex("v1", "v_end")],
            vec![edge("e0", Some("v0"), "v1")],
        );
        assert!(validate_semantics(&model_set).is_ok());
    }

    #[test]
    fn dangling_edge_endpoint_is_reported() {
        let model_set = model_with(vec![vertex("v0", "v_start")], vec![edge("e0", Some("v0"), "v99")]);
        let errors = validate_semantics(&model_set).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelValidationError::DanglingEdgeEndpoint { target, .. } if target == "v99")));
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let model_set = model_with(
            vec![vertex("v0", "v_a"), vertex("v0", "v_b")],
            vec![],
        );
        let errors = validate_semantics(&model_set).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelValidationError::DuplicateId { id, .. } if id == "v0")));
    }

    #[test]
    fn invalid_identifier_is_reported() {
        let model_set = model_with(vec![vertex("v0", "123bad")], vec![]);
        let errors = validate_semantics(&model_set).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelValidationError::InvalidIdentifier { .. })));
    }

    #[test]
    fn reserved_word_is_reported() {
        let model_set = model_with(vec![vertex("v0", "return")], vec![]);
        let errors = validate_semantics(&model_set).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelValidationError::ReservedWord { .. })));
    }

    #[test]
    fn action_without_semicolon_is_reported() {
        let mut e = edge("e0", Some("v0"), "v1");
        e.actions = vec!["x = 1".to_string()];
        let model_set = model_with(vec![vertex("v0", "v_a"), vertex("v1", "v_b")], vec![e]);
        let errors = validate_semantics(&model_set).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelValidationError::ActionMissingSemicolon { .. })));
    }

    #[test]
    fn unresolved_start_element_is_reported() {
        let mut model_set = model_with(vec![vertex("v0", "v_a")], vec![]);
        model_set.models[0].start_element_id = Some("does_not_exist".to_string());
        let errors = validate_semantics(&model_set).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelValidationError::UnresolvedStartElement { .. })));
    }

    #[test]
    fn schema_rejects_unknown_top_level_key() {
        let raw = serde_json::json!({ "models": [], "extra": true });
        assert!(validate_schema(&raw).is_err());
    }

    #[test]
    fn schema_accepts_well_formed_document() {
        let raw = serde_json::json!({
            "models": [{
                "id": "m1",
                "name": "Login",
                "generator": "random(edge_coverage(100))",
                "vertices": [{"id": "v0", "name": "v_start"}],
                "edges": []
            }]
        });
        assert!(validate_schema(&raw).is_ok());
    }
}
