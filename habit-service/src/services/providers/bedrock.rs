//! AWS Bedrock provider.
//!
//! Calls `InvokeModel` on the Bedrock runtime with an Anthropic messages body
//! through the AWS SDK.

use super::messages::{decode_envelope, MessagesRequest};
use super::{CompletionRequest, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockruntime::config::retry::RetryConfig;
use aws_sdk_bedrockruntime::config::timeout::TimeoutConfig;
use aws_sdk_bedrockruntime::config::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use std::time::Duration;

/// Default Bedrock model.
pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// Bedrock provider configuration.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: String,
    /// Overrides the regional `bedrock-runtime` endpoint.
    pub endpoint: Option<String>,
    pub model_id: String,
    pub timeout: Duration,
    /// Total attempts per call, including SDK retries.
    pub max_attempts: u32,
}

/// Bedrock text provider.
pub struct BedrockProvider {
    config: BedrockConfig,
    credentials: Option<SharedCredentialsProvider>,
    client: Client,
}

impl BedrockProvider {
    /// Load shared AWS settings and the default credential chain.
    pub async fn from_env(config: BedrockConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        Self::from_sdk_config(&shared, config)
    }

    /// Build on an already loaded [`SdkConfig`].
    pub fn from_sdk_config(shared: &SdkConfig, config: BedrockConfig) -> Self {
        let mut builder = aws_sdk_bedrockruntime::config::Builder::from(shared)
            .region(Region::new(config.region.clone()))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.timeout)
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            credentials: shared.credentials_provider(),
            client: Client::from_conf(builder.build()),
            config,
        }
    }
}

/// Throttling becomes [`ProviderError::RateLimited`]; transport failures and
/// other service errors keep the SDK's description.
fn map_sdk_error(err: SdkError<InvokeModelError>) -> ProviderError {
    match &err {
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            if status == 429 || ctx.err().is_throttling_exception() {
                ProviderError::RateLimited
            } else {
                ProviderError::ApiError(format!(
                    "Bedrock API error {}: {}",
                    status,
                    DisplayErrorContext(ctx.err())
                ))
            }
        }
        _ => ProviderError::Sdk(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl TextProvider for BedrockProvider {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    fn model(&self) -> &str {
        &self.config.model_id
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let payload = serde_json::to_vec(&MessagesRequest::for_bedrock(request))
            .map_err(|e| ProviderError::ApiError(format!("Failed to encode request: {}", e)))?;

        tracing::debug!(
            model = %self.config.model_id,
            region = %self.config.region,
            prompt_len = request.prompt.len(),
            "Sending request to Bedrock"
        );

        let output = self
            .client
            .invoke_model()
            .model_id(&self.config.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(map_sdk_error)?;

        decode_envelope(output.body().as_ref())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured("no AWS credentials provider".to_string())
        })?;

        credentials.provide_credentials().await.map_err(|e| {
            ProviderError::NotConfigured(format!(
                "AWS credentials unavailable: {}",
                DisplayErrorContext(&e)
            ))
        })?;
        Ok(())
    }
}
