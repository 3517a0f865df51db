//! HTTP handlers for the habit service.

pub mod health;
pub mod plans;

pub use health::{health_check, metrics_handler, readiness_check};
pub use plans::{create_plan, extract_goal, CreatePlanResponse};
