//! Anthropic Messages API provider.

use super::messages::{decode_envelope, MessagesRequest};
use super::{CompletionRequest, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use std::time::Duration;

/// Anthropic API base URL.
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";

/// Value of the `anthropic-version` header.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model for the direct API.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";

/// Anthropic provider configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Anthropic text provider.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        tracing::debug!(
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            "Sending request to Anthropic API"
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest::for_anthropic(request, &self.config.model))
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Anthropic API error {}: {}",
                status, error_text
            )));
        }

        let body = response.bytes().await.map_err(ProviderError::NetworkError)?;
        decode_envelope(&body)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Anthropic API key not configured".to_string(),
            ));
        }
        Ok(())
    }
}
