//! Experiment repository for CRUD operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use tracker_core::{Experiment, ExperimentId};

use crate::{DbError, get_db};

/// Repository for experiment persistence operations.
pub struct ExperimentRepository;

/// Internal record type for SurrealDB reads.
#[derive(Debug, Deserialize)]
struct ExperimentRecord {
    id: Option<Thing>,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExperimentRecord {
    fn into_experiment(self, experiment_id: ExperimentId) -> Experiment {
        Experiment {
            id: experiment_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn record_id(&self) -> ExperimentId {
        let id_str = self.id.as_ref().map(|t| t.id.to_raw()).unwrap_or_default();
        ExperimentId::parse(&id_str).unwrap_or_else(|_| ExperimentId::new())
    }
}

/// Struct for creating experiments - omits datetime fields to use SurrealDB defaults.
#[derive(Debug, Clone, Serialize)]
struct ExperimentCreate {
    name: String,
    description: Option<String>,
}

impl ExperimentRepository {
    /// Create a new experiment in the database.
    pub async fn create(experiment: &Experiment) -> Result<Experiment, DbError> {
        let db = get_db()?;
        let experiment_id = experiment.id.to_string();

        let create_data = ExperimentCreate {
            name: experiment.name.clone(),
            description: experiment.description.clone(),
        };

        let record: Option<ExperimentRecord> = db
            .create(("experiment", &experiment_id))
            .content(create_data)
            .await?;

        record
            .map(|r| r.into_experiment(experiment.id))
            .ok_or_else(|| DbError::Query("Failed to create experiment".into()))
    }

    /// Get an experiment by ID.
    pub async fn get(id: ExperimentId) -> Result<Experiment, DbError> {
        let db = get_db()?;

        let record: Option<ExperimentRecord> = db.select(("experiment", id.to_string())).await?;

        record
            .map(|r| r.into_experiment(id))
            .ok_or_else(|| DbError::NotFound(format!("Experiment not found: {}", id)))
    }

    /// List all experiments.
    pub async fn list() -> Result<Vec<Experiment>, DbError> {
        let db = get_db()?;

        let records: Vec<ExperimentRecord> = db.select("experiment").await?;

        Ok(records
            .into_iter()
            .map(|r| {
                let experiment_id = r.record_id();
                r.into_experiment(experiment_id)
            })
            .collect())
    }

    /// Delete an experiment. Jobs are not cascaded; callers remove them first.
    pub async fn delete(id: ExperimentId) -> Result<(), DbError> {
        let db = get_db()?;

        let _: Option<ExperimentRecord> = db.delete(("experiment", id.to_string())).await?;

        Ok(())
    }

    /// Check if an experiment exists.
    pub async fn exists(id: ExperimentId) -> Result<bool, DbError> {
        let db = get_db()?;

        let record: Option<ExperimentRecord> = db.select(("experiment", id.to_string())).await?;

        Ok(record.is_some())
    }
}
