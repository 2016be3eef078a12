//! HTTP executor: talks to a running test-code server over the
//! `/altwalker` wire protocol (spec §4.4, §6). Reserved status codes (460-465)
//! are decoded into typed [`ExecutorProtocolError`] variants instead of being
//! treated as generic HTTP failures.

use super::Executor;
use crate::errors::ExecutorProtocolError;
use crate::process::{wait_until_healthy, ManagedSubprocess, ProcessLimits};
use crate::protocol::{ExecutionResult, Step};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;

pub struct HttpExecutor {
    client: Client,
    base_url: String,
    process: Option<Mutex<ManagedSubprocess>>,
    limits: ProcessLimits,
}

impl HttpExecutor {
    /// Connects to an already-running executor service; no subprocess owned.
    pub fn connect(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            process: None,
            limits: ProcessLimits::default(),
        }
    }

    /// Spawns the executor service as a subprocess this `HttpExecutor` owns
    /// (spec §4.4 ExecutorProcess). `kill` tears it down.
    pub async fn spawn(
        program: &str,
        args: &[String],
        port: u16,
        limits: ProcessLimits,
    ) -> Result<Self, ExecutorProtocolError> {
        let mut process = ManagedSubprocess::spawn(program, args, &limits)
            .await
            .map_err(|e| ExecutorProtocolError::LoadError {
                message: format!("failed to spawn executor: {e}"),
            })?;

        let base_url = format!("http://127.0.0.1:{port}/altwalker");
        let client = Client::new();

        {
            let health_url = format!("{base_url}/hasModel");
            let client = client.clone();
            wait_until_healthy(&mut process, &limits, || {
                let client = client.clone();
                let health_url = health_url.clone();
                async move { client.get(&health_url).send().await.is_ok() }
            })
            .await
            .map_err(|e| ExecutorProtocolError::LoadError {
                message: format!("executor failed to become healthy: {e}"),
            })?;
        }

        Ok(Self {
            client,
            base_url,
            process: Some(Mutex::new(process)),
            limits,
        })
    }

    fn decode_status(
        &self,
        status: u16,
        body: String,
        model: Option<&str>,
        name: Option<&str>,
    ) -> ExecutorProtocolError {
        match status {
            461 => ExecutorProtocolError::StepNotFound {
                model: model.unwrap_or_default().to_string(),
                name: name.unwrap_or_default().to_string(),
            },
            462 => ExecutorProtocolError::InvalidStepHandler {
                model: model.unwrap_or_default().to_string(),
                name: name.unwrap_or_default().to_string(),
            },
            460 => ExecutorProtocolError::ModelNotFound {
                model: model.map(|m| m.to_string()).unwrap_or(body),
            },
            _ => ExecutorProtocolError::from_status(status, body.clone())
                .unwrap_or(ExecutorProtocolError::Unhandled { status, body }),
        }
    }
}

/// Every 200 response is enveloped as `{"payload": {...}}` (spec §6); unwraps
/// it, falling back to the raw body if an executor omits the envelope.
fn unwrap_payload(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) => map.remove("payload").unwrap_or(serde_json::Value::Object(map)),
        other => other,
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    #[tracing::instrument(name = "has_model", skip(self), fields(model_name))]
    async fn has_model(&self, model_name: &str) -> Result<bool, ExecutorProtocolError> {
        let resp = self
            .client
            .get(format!("{}/hasModel", self.base_url))
            .query(&[("name", model_name)])
            .timeout(self.limits.control_call_timeout)
            .send()
            .await
            .map_err(|e| ExecutorProtocolError::Unhandled {
                status: 0,
                body: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.decode_status(status, body, Some(model_name), None));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| ExecutorProtocolError::Unhandled {
            status: 0,
            body: e.to_string(),
        })?;
        let payload = unwrap_payload(body);
        Ok(payload.get("hasModel").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    #[tracing::instrument(name = "has_step", skip(self), fields(model_name, step_name))]
    async fn has_step(&self, model_name: Option<&str>, step_name: &str) -> Result<bool, ExecutorProtocolError> {
        let mut query = vec![("name", step_name)];
        if let Some(model_name) = model_name {
            query.push(("modelName", model_name));
        }

        let resp = self
            .client
            .get(format!("{}/hasStep", self.base_url))
            .query(&query)
            .timeout(self.limits.control_call_timeout)
            .send()
            .await
            .map_err(|e| ExecutorProtocolError::Unhandled {
                status: 0,
                body: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.decode_status(status, body, model_name, Some(step_name)));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| ExecutorProtocolError::Unhandled {
            status: 0,
            body: e.to_string(),
        })?;
        let payload = unwrap_payload(body);
        Ok(payload.get("hasStep").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    #[tracing::instrument(name = "execute_step", skip(self, step), fields(step_id = %step.id, step_name = %step.name))]
    async fn execute_step(&self, step: &Step) -> Result<ExecutionResult, ExecutorProtocolError> {
        let mut query = vec![("name", step.name.as_str())];
        if let Some(model_name) = step.model_name.as_deref() {
            query.push(("modelName", model_name));
        }

        // No client-side timeout on executeStep, matching spec §5.
        let resp = self
            .client
            .post(format!("{}/executeStep", self.base_url))
            .query(&query)
            .json(&serde_json::json!({ "data": step.data }))
            .send()
            .await
            .map_err(|e| ExecutorProtocolError::Unhandled {
                status: 0,
                body: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.decode_status(status, body, step.model_name.as_deref(), Some(&step.name)));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| ExecutorProtocolError::Unhandled {
            status: 0,
            body: e.to_string(),
        })?;
        serde_json::from_value(unwrap_payload(body)).map_err(|e| ExecutorProtocolError::Unhandled {
            status: 0,
            body: e.to_string(),
        })
    }

    async fn reset(&self) -> Result<(), ExecutorProtocolError> {
        let resp = self
            .client
            .put(format!("{}/reset", self.base_url))
            .timeout(self.limits.control_call_timeout)
            .send()
            .await
            .map_err(|e| ExecutorProtocolError::Unhandled {
                status: 0,
                body: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.decode_status(status, body, None, None));
        }
        Ok(())
    }

    async fn kill(&self) -> Result<(), ExecutorProtocolError> {
        if let Some(process) = &self.process {
            process
                .lock()
                .await
                .kill()
                .await
                .map_err(|e| ExecutorProtocolError::Unhandled {
                    status: 0,
                    body: e.to_string(),
                })?;
        }
        Ok(())
    }
}
