//! Job repository for CRUD operations.

use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use tracker_core::{ExperimentId, Job, JobId, JobSnapshot, JobStatus, MetricHistory};

use crate::{DbError, get_db};

/// Repository for job persistence operations.
pub struct JobRepository;

/// Internal record type for SurrealDB.
#[derive(Debug, Serialize, Deserialize)]
struct JobRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    #[serde(flatten)]
    job: Job,
    #[serde(default)]
    history: MetricHistory,
}

/// Filter options for listing jobs.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub experiment_id: Option<ExperimentId>,
    pub status: Option<JobStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl JobFilter {
    /// Filter by the owning experiment.
    pub fn for_experiment(experiment_id: ExperimentId) -> Self {
        Self {
            experiment_id: Some(experiment_id),
            ..Default::default()
        }
    }
}

impl JobRepository {
    /// Create a new job in the database with an empty history.
    pub async fn create(job: &Job) -> Result<Job, DbError> {
        let db = get_db()?;

        let record: Option<JobRecord> = db
            .create(("job", job.id.to_string()))
            .content(JobRecord {
                id: None,
                job: job.clone(),
                history: MetricHistory::new(),
            })
            .await?;

        record
            .map(|r| r.job)
            .ok_or_else(|| DbError::Query("Failed to create job".into()))
    }

    /// Get a job by ID, without history.
    pub async fn get(id: JobId) -> Result<Job, DbError> {
        let db = get_db()?;

        let record: Option<JobRecord> = db.select(("job", id.to_string())).await?;

        record
            .map(|r| r.job)
            .ok_or_else(|| DbError::NotFound(format!("Job not found: {}", id)))
    }

    /// Get a job by ID together with its full metric history.
    pub async fn get_snapshot(id: JobId) -> Result<JobSnapshot, DbError> {
        let db = get_db()?;

        let record: Option<JobRecord> = db.select(("job", id.to_string())).await?;

        record
            .map(|r| JobSnapshot::new(r.job, r.history))
            .ok_or_else(|| DbError::NotFound(format!("Job not found: {}", id)))
    }

    /// List jobs with optional filtering. History is omitted for list views.
    pub async fn list(filter: JobFilter) -> Result<Vec<Job>, DbError> {
        let db = get_db()?;

        let mut conditions = Vec::new();
        let mut bindings: Vec<(&str, serde_json::Value)> = Vec::new();

        if let Some(experiment_id) = &filter.experiment_id {
            conditions.push("experiment_id = $experiment_id");
            bindings.push(("experiment_id", serde_json::json!(experiment_id.to_string())));
        }

        if let Some(status) = &filter.status {
            conditions.push("status = $status");
            bindings.push(("status", serde_json::json!(status.as_str())));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit_clause = filter
            .limit
            .map(|l| format!("LIMIT {}", l))
            .unwrap_or_default();

        let offset_clause = filter
            .offset
            .map(|o| format!("START {}", o))
            .unwrap_or_default();

        let query = format!(
            "SELECT * FROM job {} ORDER BY created_at ASC {} {}",
            where_clause, limit_clause, offset_clause
        );

        let mut result = db.query(&query);

        for (name, value) in bindings {
            result = result.bind((name, value));
        }

        let mut response = result.await?;
        let records: Vec<JobRecord> = response.take(0)?;

        Ok(records.into_iter().map(|r| r.job).collect())
    }

    /// Overwrite a job's authoritative state and history.
    pub async fn update(job: &Job, history: &MetricHistory) -> Result<Job, DbError> {
        let db = get_db()?;

        let record: Option<JobRecord> = db
            .update(("job", job.id.to_string()))
            .content(JobRecord {
                id: None,
                job: job.clone(),
                history: history.clone(),
            })
            .await?;

        record
            .map(|r| r.job)
            .ok_or_else(|| DbError::NotFound(format!("Job not found: {}", job.id)))
    }

    /// Delete a job and its history irrevocably.
    pub async fn delete(id: JobId) -> Result<(), DbError> {
        let db = get_db()?;

        let _: Option<JobRecord> = db.delete(("job", id.to_string())).await?;

        Ok(())
    }
}
