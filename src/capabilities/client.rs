// src/capabilities/client.rs
//! HTTP-backed capability client - one JSON POST per stage invocation.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::PipelineError;

use super::Capability;

pub struct CapabilityClient {
    client: reqwest::Client,
    url: String,
    stage: &'static str,
}

impl CapabilityClient {
    pub fn new(
        base_url: &str,
        stage: &'static str,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::CapabilityUnreachable {
                stage,
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: format!("{}/{}", base_url.trim_end_matches('/'), stage),
            stage,
        })
    }
}

#[async_trait]
impl Capability for CapabilityClient {
    fn name(&self) -> &'static str {
        self.stage
    }

    async fn call(&self, request: Value) -> Result<Value, PipelineError> {
        info!("Calling {} capability: {}", self.stage, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                PipelineError::CapabilityUnreachable {
                    stage: self.stage,
                    reason,
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::CapabilityUnreachable {
                stage: self.stage,
                reason: format!("failed to read response body: {}", e),
            })?;

        if !status.is_success() {
            warn!("{} returned HTTP {}: {}", self.stage, status, body);
            return Err(PipelineError::CapabilityUnreachable {
                stage: self.stage,
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        // The contract is strict JSON with no extraneous prose; anything
        // else counts as a validation failure, not a transport error.
        serde_json::from_str(&body).map_err(|_| PipelineError::CapabilityValidationFailed {
            stage: self.stage,
            reason: "response body is not valid JSON".to_string(),
        })
    }
}
