//! Plan generation: prompt construction, the model call, and decoding of the
//! model's answer into a validated plan document.

use crate::error::{ParseError, PlanError};
use crate::models::HabitPlan;
use crate::services::metrics;
use crate::services::providers::{CompletionRequest, FinishReason, TextProvider};
use std::time::Instant;

/// Sampling temperature for plan generation.
pub const PLAN_TEMPERATURE: f32 = 0.5;

/// Output token ceiling for plan generation.
pub const PLAN_MAX_TOKENS: u32 = 600;

const SYSTEM_PROMPT: &str = "You are an expert habit-building coach. \
Break goals into small, realistic action steps. \
Identify common obstacles and provide practical solutions. \
Return ONLY valid JSON. Do not include any extra text.";

/// User turn describing the goal and the JSON shape to return.
pub fn build_user_prompt(goal: &str) -> String {
    format!(
        "\nUser habit goal: {goal}\n\n\
         Return JSON with:\n\
         - goal\n\
         - action_steps (array with step number, action, reason)\n\
         - obstacles (array with issue and solution)\n"
    )
}

pub fn build_request(goal: &str) -> CompletionRequest {
    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt: build_user_prompt(goal),
        temperature: PLAN_TEMPERATURE,
        max_tokens: PLAN_MAX_TOKENS,
    }
}

/// Parse the model's text and check it against the plan schema.
///
/// The returned value is the document as the model wrote it; the typed
/// [`HabitPlan`] is only used to reject output of the wrong shape.
pub fn decode_plan(text: &str) -> Result<serde_json::Value, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ParseError::PlanJson)?;
    serde_json::from_value::<HabitPlan>(value.clone()).map_err(ParseError::PlanSchema)?;
    Ok(value)
}

/// Ask the provider for a plan for `goal`.
#[tracing::instrument(skip(provider, goal), fields(provider = provider.name(), model = %provider.model()))]
pub async fn generate_habit_plan(
    provider: &dyn TextProvider,
    goal: &str,
) -> Result<serde_json::Value, PlanError> {
    let request = build_request(goal);

    let start = Instant::now();
    let result = provider.generate(&request).await;
    metrics::record_inference_latency(
        provider.name(),
        provider.model(),
        start.elapsed().as_secs_f64(),
    );

    let response = result?;
    metrics::record_tokens(
        provider.model(),
        response.input_tokens,
        response.output_tokens,
    );

    tracing::info!(
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        finish_reason = response.finish_reason.as_str(),
        "Model responded"
    );

    if response.finish_reason == FinishReason::Length {
        tracing::warn!(
            max_tokens = PLAN_MAX_TOKENS,
            "Model output hit the token limit; plan is likely truncated"
        );
    }

    Ok(decode_plan(&response.text)?)
}
