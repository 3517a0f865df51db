use crate::error::{PlanError, RequestError, ValidationError};
use crate::models::HabitPlanRecord;
use crate::services::{metrics, planner};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CreatePlanResponse {
    pub plan_id: String,
    pub plan: serde_json::Value,
}

/// Pull a usable goal out of the raw request body.
///
/// An empty body reads as `{}`. Any non-empty string is a goal, whitespace
/// included, and it is returned exactly as sent.
pub fn extract_goal(body: &[u8]) -> Result<String, PlanError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MissingGoal.into());
    }

    let value: serde_json::Value = serde_json::from_slice(body).map_err(RequestError::Json)?;
    let fields = value.as_object().ok_or(RequestError::NotAnObject)?;

    match fields.get("goal") {
        Some(serde_json::Value::String(goal)) if !goal.is_empty() => Ok(goal.clone()),
        _ => Err(ValidationError::MissingGoal.into()),
    }
}

/// Generate, store and return a habit plan for the submitted goal.
#[tracing::instrument(skip(state, body), fields(plan_id = tracing::field::Empty))]
pub async fn create_plan(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, PlanError> {
    let goal = extract_goal(&body)?;

    let plan = planner::generate_habit_plan(state.text_provider.as_ref(), &goal).await?;

    let record = HabitPlanRecord::new(goal, plan);
    tracing::Span::current().record("plan_id", record.plan_id.as_str());

    state
        .store
        .insert_plan(&record)
        .await
        .map_err(PlanError::Storage)?;

    metrics::record_plan_created();
    tracing::info!(plan_id = %record.plan_id, "Habit plan created");

    let mut response = (
        StatusCode::OK,
        Json(CreatePlanResponse {
            plan_id: record.plan_id,
            plan: record.plan,
        }),
    )
        .into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    Ok(response)
}
