//! service-core: shared infrastructure for the habit services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
