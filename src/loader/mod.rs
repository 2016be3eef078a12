//! Loads model sets and path files from disk (spec §6).
//!
//! JSON is the primary model format; GraphML is accepted but delegated to
//! the generator's `convert` subcommand before parsing, since this crate
//! doesn't carry its own GraphML parser. Multiple JSON model files are
//! concatenated into one effective model set.

use crate::errors::AltWalkerError;
use crate::protocol::{ModelSet, Step};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Json,
    GraphMl,
}

impl ModelFormat {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("graphml") => Self::GraphMl,
            _ => Self::Json,
        }
    }
}

/// Loads one or more model files and concatenates them into a single
/// `ModelSet`. GraphML files are converted to JSON via the generator's
/// `convert` subcommand first.
pub fn load_model_set(generator_program: &str, paths: &[String]) -> Result<ModelSet> {
    if paths.is_empty() {
        return Err(AltWalkerError::Validation("no model files supplied".to_string()).into());
    }

    let mut models = Vec::new();
    for path in paths {
        let path = Path::new(path);
        let json = match ModelFormat::detect(path) {
            ModelFormat::Json => {
                std::fs::read_to_string(path).with_context(|| format!("failed to read model file {path:?}"))?
            }
            ModelFormat::GraphMl => convert_graphml(generator_program, path)?,
        };

        let model_set: ModelSet = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse model file {path:?}"))?;
        models.extend(model_set.models);
    }

    Ok(ModelSet { models })
}

/// Shells out to the generator's `convert` subcommand, which understands
/// GraphML and emits the JSON model-set shape this crate parses.
fn convert_graphml(generator_program: &str, path: &Path) -> Result<String> {
    let output = Command::new(generator_program)
        .arg("convert")
        .arg(path)
        .output()
        .with_context(|| format!("failed to invoke generator convert for {path:?}"))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "generator convert failed for {path:?}: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    Ok(String::from_utf8(output.stdout).context("generator convert produced non-UTF8 output")?)
}

/// Loads a path file (offline planner input / `offline` command output,
/// spec §6). Fixture steps omit `modelName`.
pub fn load_path_file<P: AsRef<Path>>(path: P) -> Result<Vec<Step>> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read path file {:?}", path.as_ref()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse path file {:?}", path.as_ref()))
}

/// Writes a path file from a recorded sequence of steps (`offline` command
/// with `-f`).
pub fn write_path_file<P: AsRef<Path>>(path: P, steps: &[Step]) -> Result<()> {
    let json = serde_json::to_string_pretty(steps).context("failed to serialize path file")?;
    std::fs::write(path, json).context("failed to write path file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(ModelFormat::detect(Path::new("models.json")), ModelFormat::Json);
        assert_eq!(ModelFormat::detect(Path::new("models.graphml")), ModelFormat::GraphMl);
        assert_eq!(ModelFormat::detect(Path::new("models")), ModelFormat::Json);
    }

    #[test]
    fn loads_and_concatenates_multiple_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(
            &a,
            r#"{"models":[{"id":"m0","name":"A","generator":"random(length(1))","vertices":[],"edges":[]}]}"#,
        )
        .unwrap();
        std::fs::write(
            &b,
            r#"{"models":[{"id":"m1","name":"B","generator":"random(length(1))","vertices":[],"edges":[]}]}"#,
        )
        .unwrap();

        let model_set = load_model_set(
            "graphwalker",
            &[a.to_string_lossy().into_owned(), b.to_string_lossy().into_owned()],
        )
        .unwrap();
        assert_eq!(model_set.models.len(), 2);
    }

    #[test]
    fn rejects_empty_path_list() {
        assert!(load_model_set("graphwalker", &[]).is_err());
    }

    #[test]
    fn round_trips_a_path_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.json");
        let steps = vec![Step {
            id: "1".into(),
            name: "v_start".into(),
            model_name: Some("Login".into()),
            data: Default::default(),
            properties: Default::default(),
            actions: vec![],
            unvisited_elements: vec![],
        }];
        write_path_file(&path, &steps).unwrap();
        let loaded = load_path_file(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "v_start");
    }
}
