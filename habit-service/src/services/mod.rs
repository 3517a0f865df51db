pub mod database;
pub mod metrics;
pub mod planner;
pub mod providers;

pub use database::{MockPlanStore, MongoPlanStore, PlanStore};
