//! Habit plan models.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A persisted coaching plan.
///
/// `plan` holds the model's JSON document exactly as returned; it has already
/// been checked against [`HabitPlan`] before a record is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitPlanRecord {
    /// Unique plan identifier (UUID v4).
    pub plan_id: String,

    /// The goal as submitted by the user.
    pub goal: String,

    /// Creation time, RFC 3339 in UTC.
    pub created_at: String,

    /// The generated plan.
    pub plan: serde_json::Value,
}

impl HabitPlanRecord {
    /// Create a new record with a fresh identifier and timestamp.
    pub fn new(goal: String, plan: serde_json::Value) -> Self {
        Self {
            plan_id: uuid::Uuid::new_v4().to_string(),
            goal,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            plan,
        }
    }
}

/// Shape the model is instructed to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitPlan {
    pub goal: String,
    pub action_steps: Vec<ActionStep>,
    pub obstacles: Vec<Obstacle>,
}

/// `step` takes any JSON number; models emit `1` and `1.0` alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    #[serde(alias = "step_number")]
    pub step: serde_json::Number,
    pub action: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub issue: String,
    pub solution: String,
}
