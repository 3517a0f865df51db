//! Domain models for the habit service.

pub mod plan;

pub use plan::{ActionStep, HabitPlan, HabitPlanRecord, Obstacle};
