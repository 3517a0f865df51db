//! Anthropic messages wire format, shared by the Bedrock and Anthropic providers.

use super::{CompletionRequest, FinishReason, ProviderError, ProviderResponse};
use serde::{Deserialize, Serialize};

/// Version string Bedrock expects in the body of Anthropic model calls.
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system: &'a str,
    pub messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    /// Body for Bedrock `InvokeModel`; the model lives in the URL.
    pub fn for_bedrock(request: &'a CompletionRequest) -> Self {
        Self::build(request, Some(BEDROCK_ANTHROPIC_VERSION), None)
    }

    /// Body for the Anthropic Messages API; the version travels as a header.
    pub fn for_anthropic(request: &'a CompletionRequest, model: &'a str) -> Self {
        Self::build(request, None, Some(model))
    }

    fn build(
        request: &'a CompletionRequest,
        anthropic_version: Option<&'a str>,
        model: Option<&'a str>,
    ) -> Self {
        Self {
            anthropic_version,
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Decode a raw response body and pull out the first content item's text.
pub fn decode_envelope(body: &[u8]) -> Result<ProviderResponse, ProviderError> {
    let envelope: MessagesResponse = serde_json::from_slice(body)?;

    let text = match envelope.content.into_iter().next() {
        Some(ContentBlock::Text { text }) => text,
        _ => return Err(ProviderError::MissingContent),
    };

    let usage = envelope.usage.unwrap_or_default();

    let finish_reason = match envelope.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") | None => FinishReason::Complete,
        Some("max_tokens") => FinishReason::Length,
        Some(_) => FinishReason::Other,
    };

    Ok(ProviderResponse {
        text,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        finish_reason,
    })
}
