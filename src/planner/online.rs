//! Drives a live GraphWalker-compatible generator subprocess over its REST
//! API (spec §4.2, §4.3). The subprocess is spawned in REST mode under the
//! `/graphwalker` base path; `wait_until_healthy` polls it before the first
//! request is issued.

use super::{GeneratorValue, Planner};
use crate::errors::GeneratorError;
use crate::process::{wait_until_healthy, ManagedSubprocess, ProcessLimits};
use crate::protocol::Step;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::net::TcpListener;

/// A value handed to the generator's `setData`, encoded as the JS literal the
/// wire protocol expects (spec §4.2: "string/int/bool → JS literal encoding").
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for GeneratorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Finds a free TCP port for the generator to bind when the caller asked for
/// port 0 ("OS-assigned"). We resolve it ourselves up front rather than
/// parsing it back out of the child, which the REST-mode generator has no
/// protocol for reporting.
fn pick_free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

pub struct OnlinePlanner {
    process: ManagedSubprocess,
    client: reqwest::Client,
    base_url: String,
    limits: ProcessLimits,
}

impl OnlinePlanner {
    pub async fn spawn(
        program: &str,
        model_paths: &[String],
        port: u16,
        limits: ProcessLimits,
    ) -> Result<Self, GeneratorError> {
        let resolved_port = if port == 0 {
            pick_free_port().map_err(|e| {
                GeneratorError::MalformedResponse(format!("could not reserve a port: {e}"))
            })?
        } else {
            port
        };

        let mut args = vec!["online".to_string(), "--port".to_string(), resolved_port.to_string()];
        args.extend(model_paths.iter().cloned());

        let mut process = ManagedSubprocess::spawn(program, &args, &limits)
            .await
            .map_err(|e| GeneratorError::MalformedResponse(format!("failed to spawn generator: {e}")))?;

        let base_url = format!("http://127.0.0.1:{resolved_port}/graphwalker");
        let client = reqwest::Client::new();

        {
            let health_url = format!("{base_url}/hasNext");
            let client = client.clone();
            wait_until_healthy(&mut process, &limits, || {
                let client = client.clone();
                let health_url = health_url.clone();
                async move { client.get(&health_url).send().await.is_ok() }
            })
            .await?;
        }

        Ok(Self {
            process,
            client,
            base_url,
            limits,
        })
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, GeneratorError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .timeout(self.limits.control_call_timeout)
            .send()
            .await?;
        resp.json().await.map_err(GeneratorError::Transport)
    }

    async fn put(&self, path: &str) -> Result<(), GeneratorError> {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .timeout(self.limits.control_call_timeout)
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Planner for OnlinePlanner {
    async fn has_next(&mut self) -> Result<bool, GeneratorError> {
        let body = self.get("/hasNext").await?;
        Ok(body.get("hasNext").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn get_next(&mut self) -> Result<Step, GeneratorError> {
        let body = self.get("/getNext").await?;
        serde_json::from_value(body)
            .map_err(|e| GeneratorError::MalformedResponse(format!("getNext: {e}")))
    }

    async fn get_data(&mut self) -> Result<HashMap<String, String>, GeneratorError> {
        let body = self.get("/getData").await?;
        serde_json::from_value(body)
            .map_err(|e| GeneratorError::MalformedResponse(format!("getData: {e}")))
    }

    async fn set_data(&mut self, key: &str, value: GeneratorValue) -> Result<(), GeneratorError> {
        let encoded: String = urlencoding::encode(&value.to_string()).into_owned();
        let path = format!("/setData/{}/{}", urlencoding::encode(key), encoded);
        self.put(&path).await
    }

    async fn restart(&mut self) -> Result<(), GeneratorError> {
        self.put("/restart").await
    }

    async fn fail(&mut self, message: &str) -> Result<(), GeneratorError> {
        let path = format!("/fail/{}", urlencoding::encode(message));
        self.put(&path).await
    }

    async fn get_statistics(&mut self) -> Result<serde_json::Value, GeneratorError> {
        self.get("/getStatistics").await
    }

    async fn close(&mut self) -> Result<(), GeneratorError> {
        self.process
            .kill()
            .await
            .map_err(|e| GeneratorError::MalformedResponse(format!("failed to stop generator: {e}")))
    }
}
