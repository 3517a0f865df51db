//! Inference provider abstractions and implementations.
//!
//! Plans are generated through the [`TextProvider`] trait so the backend
//! (Bedrock, the Anthropic API, or a mock) is chosen at startup and injected
//! into the application state.

pub mod anthropic;
pub mod bedrock;
pub mod messages;
pub mod mock;

use crate::config::{InferenceConfig, ProviderKind};
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use bedrock::{BedrockConfig, BedrockProvider};
pub use mock::MockTextProvider;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error")]
    NetworkError(#[source] reqwest::Error),

    #[error("AWS request failed: {0}")]
    Sdk(String),

    #[error("Invalid response envelope")]
    InvalidEnvelope(#[from] serde_json::Error),

    #[error("Response envelope has no text content")]
    MissingContent,
}

/// One completion request: a system instruction plus a single user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    Other,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::Other => "other",
        }
    }
}

/// Text of the first content item plus usage reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub finish_reason: FinishReason,
}

/// Trait for text generation providers.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Short provider label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Generate a completion.
    async fn generate(&self, request: &CompletionRequest)
        -> Result<ProviderResponse, ProviderError>;

    /// Check the provider is usable.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Build the provider selected in configuration.
///
/// Bedrock credentials come from the default AWS chain (environment, profile,
/// web identity, container or instance role).
pub async fn build_text_provider(
    config: &InferenceConfig,
) -> Result<Arc<dyn TextProvider>, AppError> {
    let provider: Arc<dyn TextProvider> = match config.provider {
        ProviderKind::Bedrock => {
            let aws = config.aws.clone().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "AWS settings are required for the bedrock provider"
                ))
            })?;
            Arc::new(
                BedrockProvider::from_env(BedrockConfig {
                    region: aws.region,
                    endpoint: config.endpoint.clone(),
                    model_id: config.model_id.clone(),
                    timeout: config.timeout(),
                    max_attempts: aws.max_attempts,
                })
                .await,
            )
        }
        ProviderKind::Anthropic => {
            let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "ANTHROPIC_API_KEY is required for the anthropic provider"
                ))
            })?;
            Arc::new(AnthropicProvider::new(AnthropicConfig {
                api_key,
                base_url: config
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| anthropic::ANTHROPIC_API_BASE.to_string()),
                model: config.model_id.clone(),
                timeout: config.timeout(),
            })?)
        }
        ProviderKind::Mock => Arc::new(MockTextProvider::new()),
    };

    tracing::info!(
        provider = provider.name(),
        model = %provider.model(),
        "Initialized inference provider"
    );

    Ok(provider)
}
