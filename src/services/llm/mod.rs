// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use async_trait::async_trait;

pub mod ollama;
pub mod openai;

use crate::config::{Config, Provider};
use crate::error::Result;

pub const SYSTEM_PROMPT: &str = "You write git commit messages in the Conventional Commits format. \
Reply with a single JSON object with the keys type, scope, subject, body, breaking and \
breaking_description. No prose, no markdown, no code fences.";

/// One prompt for the text generator.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Raw completion text for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    fn name(&self) -> &str;

    /// Check the provider is reachable and configured before the first call.
    async fn verify(&self) -> Result<()> {
        Ok(())
    }
}

pub fn create_provider(config: &Config) -> Result<Box<dyn LlmProvider>> {
    match config.provider {
        Provider::Ollama => Ok(Box::new(ollama::OllamaProvider::new(config)?)),
        Provider::OpenAI => Ok(Box::new(openai::OpenAiProvider::new(config)?)),
    }
}
