//! Error taxonomy for the walker pipeline.
//!
//! Every failure mode the walker can hit maps to one variant here, and every
//! variant maps to exactly one process exit code (see [`AltWalkerError::exit_code`]).
//! Validation errors never reach the walker loop itself — they're surfaced by
//! the `check`/`verify` subcommands directly.

use std::fmt;
use thiserror::Error;

/// Reserved HTTP status codes an executor uses to report protocol-level
/// failures instead of handling the step at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorProtocolError {
    /// 463 — the requested model/test package path does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// 464 — the executor failed to load the test code.
    #[error("failed to load code: {message}")]
    LoadError { message: String },

    /// 465 — `executeStep`/`hasStep` called before `/load`.
    #[error("no code loaded")]
    NoCodeLoaded,

    /// 460 — the model named in the step is unknown to the executor.
    #[error("model '{model}' not found")]
    ModelNotFound { model: String },

    /// 461 — the step (vertex/edge) is unknown to the executor.
    #[error("step '{name}' not found in model '{model}'")]
    StepNotFound { model: String, name: String },

    /// 462 — the step handler exists but isn't callable as one.
    #[error("'{name}' in model '{model}' is not a valid step handler")]
    InvalidStepHandler { model: String, name: String },

    /// 500 or any other unrecognized status — treated as unhandled.
    #[error("unhandled executor error (status {status}): {body}")]
    Unhandled { status: u16, body: String },
}

impl ExecutorProtocolError {
    pub fn from_status(status: u16, body: impl Into<String>) -> Option<Self> {
        let body = body.into();
        match status {
            463 => Some(Self::PathNotFound { path: body }),
            464 => Some(Self::LoadError { message: body }),
            465 => Some(Self::NoCodeLoaded),
            460 => Some(Self::ModelNotFound { model: body }),
            461 => None, // caller fills in model/name from the request context
            462 => None,
            _ => None,
        }
    }
}

/// Top-level error type produced by the planner/executor/walker pipeline.
#[derive(Debug, Error)]
pub enum AltWalkerError {
    /// A model set failed schema or semantic validation.
    #[error("model validation failed: {0}")]
    Validation(String),

    /// The path generator process misbehaved (crashed, bad response, timed out).
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),

    /// Couldn't talk to the executor at all (connection refused, timeout).
    #[error("executor transport error: {0}")]
    ExecutorTransport(#[from] reqwest::Error),

    /// The executor responded, but with a protocol-level refusal.
    #[error("executor protocol error: {0}")]
    ExecutorProtocol(#[from] ExecutorProtocolError),

    /// A step executed but the test code itself reported failure.
    #[error("step '{step_id}' failed: {message}")]
    StepFailure { step_id: String, message: String },

    /// A fixture (setUpRun/tearDownRun/setUpModel/tearDownModel/before/afterStep) failed.
    #[error("fixture '{fixture}' failed: {message}")]
    FixtureFailure { fixture: String, message: String },

    /// The walk was cancelled before completion.
    #[error("interrupted")]
    Interrupted,
}

impl AltWalkerError {
    /// Maps this error to the CLI exit code contract (spec §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 4,
            Self::Generator(_) => 3,
            Self::ExecutorTransport(_) => 4,
            Self::ExecutorProtocol(_) => 4,
            Self::StepFailure { .. } | Self::FixtureFailure { .. } => 1,
            Self::Interrupted => 4,
        }
    }
}

/// Errors raised while talking to the path generator subprocess.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator process exited unexpectedly (code {exit_code:?}): {tail}")]
    GeneratorExited { exit_code: Option<i32>, tail: String },

    #[error("generator did not become healthy within the configured wait")]
    HealthTimeout,

    #[error("generator transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Step- or model-scoped context attached to an error for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub step_id: Option<String>,
    pub model_name: Option<String>,
}

impl ErrorContext {
    pub fn step(step_id: impl Into<String>) -> Self {
        Self {
            step_id: Some(step_id.into()),
            model_name: None,
        }
    }

    pub fn model(model_name: impl Into<String>) -> Self {
        Self {
            step_id: None,
            model_name: Some(model_name.into()),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.step_id, &self.model_name) {
            (Some(s), Some(m)) => write!(f, "model={m} step={s}"),
            (Some(s), None) => write!(f, "step={s}"),
            (None, Some(m)) => write!(f, "model={m}"),
            (None, None) => write!(f, "<no context>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_mapping() {
        assert_eq!(AltWalkerError::Validation("x".into()).exit_code(), 4);
        assert_eq!(
            AltWalkerError::StepFailure {
                step_id: "v1".into(),
                message: "boom".into()
            }
            .exit_code(),
            1
        );
        assert_eq!(AltWalkerError::Interrupted.exit_code(), 4);
    }

    #[test]
    fn executor_protocol_from_status() {
        assert_eq!(
            ExecutorProtocolError::from_status(465, String::new()),
            Some(ExecutorProtocolError::NoCodeLoaded)
        );
        assert!(matches!(
            ExecutorProtocolError::from_status(463, "models/login.py".to_string()),
            Some(ExecutorProtocolError::PathNotFound { .. })
        ));
    }

    #[test]
    fn error_context_display() {
        let ctx = ErrorContext::step("v_login");
        assert_eq!(ctx.to_string(), "step=v_login");
    }
}
