//! Database schema definitions using SurrealQL.

use crate::{DbError, get_db};

/// Initialize the database schema.
///
/// This creates all necessary tables, fields, and indexes.
pub async fn init_schema() -> Result<(), DbError> {
    let db = get_db()?;

    tracing::info!("Initializing database schema...");

    // Experiment table
    db.query(EXPERIMENT_SCHEMA).await?;

    // Job table
    db.query(JOB_SCHEMA).await?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Experiment table schema.
const EXPERIMENT_SCHEMA: &str = r#"
-- Experiment table for grouping training jobs
DEFINE TABLE IF NOT EXISTS experiment SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS name ON experiment TYPE string;
DEFINE FIELD IF NOT EXISTS description ON experiment TYPE option<string>;
DEFINE FIELD IF NOT EXISTS created_at ON experiment TYPE datetime DEFAULT time::now();
DEFINE FIELD IF NOT EXISTS updated_at ON experiment TYPE datetime DEFAULT time::now();

-- Indexes for efficient lookups
DEFINE INDEX IF NOT EXISTS experiment_name ON experiment FIELDS name;
"#;

/// Job table schema.
///
/// Timestamps ride along as RFC 3339 strings since the authoritative clock
/// is the job store, not the database.
const JOB_SCHEMA: &str = r#"
-- Job table for training runs and their metric history
DEFINE TABLE IF NOT EXISTS job SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS name ON job TYPE string;
DEFINE FIELD IF NOT EXISTS experiment_id ON job TYPE string;
DEFINE FIELD IF NOT EXISTS parameters ON job FLEXIBLE TYPE object;
DEFINE FIELD IF NOT EXISTS status ON job TYPE string DEFAULT "pending";
DEFINE FIELD IF NOT EXISTS epochs_completed ON job TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS best_accuracy ON job TYPE option<float>;
DEFINE FIELD IF NOT EXISTS error ON job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS total_time ON job TYPE option<float>;
DEFINE FIELD IF NOT EXISTS history ON job FLEXIBLE TYPE object DEFAULT {};
DEFINE FIELD IF NOT EXISTS created_at ON job TYPE string;
DEFINE FIELD IF NOT EXISTS started_at ON job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS completed_at ON job TYPE option<string>;

-- Indexes for efficient job queries
DEFINE INDEX IF NOT EXISTS job_experiment ON job FIELDS experiment_id;
DEFINE INDEX IF NOT EXISTS job_status ON job FIELDS status;
DEFINE INDEX IF NOT EXISTS job_created ON job FIELDS created_at;
"#;
