//! Plan persistence.
//!
//! Plans are written once and never read back by this service, so the store
//! surface is a single insert plus a health check.

use crate::models::HabitPlanRecord;
use crate::services::metrics;
use async_trait::async_trait;
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::sync::Mutex;
use std::time::Instant;

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist a new plan record.
    async fn insert_plan(&self, record: &HabitPlanRecord) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoPlanStore {
    client: MongoClient,
    db: Database,
    collection: String,
}

impl MongoPlanStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self {
            client,
            db,
            collection: collection.to_string(),
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!(collection = %self.collection, "Creating MongoDB indexes for habit-service");

        // Unique index on plan_id
        let plan_id_index = IndexModel::builder()
            .keys(doc! { "plan_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("plan_id_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.plans().create_index(plan_id_index, None).await?;

        let created_at_index = IndexModel::builder()
            .keys(doc! { "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("created_at_idx".to_string())
                    .build(),
            )
            .build();

        self.plans().create_index(created_at_index, None).await?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn plans(&self) -> Collection<HabitPlanRecord> {
        self.db.collection(&self.collection)
    }
}

#[async_trait]
impl PlanStore for MongoPlanStore {
    async fn insert_plan(&self, record: &HabitPlanRecord) -> Result<(), AppError> {
        let start = Instant::now();
        let result = self.plans().insert_one(record, None).await;
        metrics::record_store_write(start.elapsed().as_secs_f64());

        result?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}

/// In-memory store for local runs and tests.
pub struct MockPlanStore {
    records: Mutex<Vec<HabitPlanRecord>>,
    fail_writes: bool,
}

impl Default for MockPlanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlanStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    /// A store whose every write fails.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<HabitPlanRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PlanStore for MockPlanStore {
    async fn insert_plan(&self, record: &HabitPlanRecord) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Mock store rejected write"
            )));
        }

        self.records
            .lock()
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Mock store mutex poisoned: {}", e))
            })?
            .push(record.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Mock store unavailable"
            )));
        }
        Ok(())
    }
}
