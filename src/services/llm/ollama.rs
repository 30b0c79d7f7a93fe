// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationRequest, LlmProvider};
use crate::config::Config;
use crate::error::{Error, Result};

pub struct OllamaProvider {
    client: Client,
    host: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

impl OllamaProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            // Sanitize: remove trailing slashes to avoid //api/generate
            host: config.ollama_host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn provider_error(message: impl Into<String>) -> Error {
        Error::Provider {
            provider: "ollama".into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.host);

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                system: &request.system,
                prompt: &request.prompt,
                stream: false,
                format: "json",
                options: Options {
                    temperature: request.temperature,
                    num_predict: request.max_tokens,
                },
            })
            .send()
            .await
            .map_err(|e| Self::provider_error(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::provider_error(format!("HTTP {status}: {body}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("unexpected response: {e}")))?;

        debug!(chars = body.response.len(), "ollama response");
        Ok(body.response.trim().to_string())
    }

    fn name(&self) -> &str {
        "ollama"
    }

    async fn verify(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.host);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| Error::OllamaNotRunning {
                host: self.host.clone(),
            })?;

        if !response.status().is_success() {
            return Err(Error::OllamaNotRunning {
                host: self.host.clone(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("unexpected /api/tags response: {e}")))?;

        let available: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        let wanted = self.model.as_str();
        let found = available.iter().any(|name| {
            name == wanted || name.strip_suffix(":latest") == Some(wanted)
        });

        if found {
            Ok(())
        } else {
            Err(Error::ModelNotFound {
                model: self.model.clone(),
                available,
            })
        }
    }
}
