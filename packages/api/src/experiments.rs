//! Experiment CRUD passthroughs.
//!
//! Experiments are plain persistence; nothing here touches the job store.

use actors::StoreError;
use db::repositories::ExperimentRepository;
use tracker_core::{Experiment, ExperimentId, ValidationError};

fn parse_experiment_id(id: &str) -> Result<ExperimentId, StoreError> {
    ExperimentId::parse(id).map_err(|_| {
        StoreError::Validation(ValidationError::new(
            "experiment_id",
            format!("not a valid id: {}", id),
        ))
    })
}

/// Create a new experiment.
pub async fn create_experiment(
    name: &str,
    description: Option<&str>,
) -> Result<Experiment, StoreError> {
    let mut experiment = Experiment::new(name);
    if let Some(description) = description {
        experiment = experiment.with_description(description);
    }
    Ok(ExperimentRepository::create(&experiment).await?)
}

/// Get an experiment by ID.
pub async fn get_experiment(id: &str) -> Result<Experiment, StoreError> {
    let experiment_id = parse_experiment_id(id)?;
    match ExperimentRepository::get(experiment_id).await {
        Ok(experiment) => Ok(experiment),
        Err(db::DbError::NotFound(message)) => Err(StoreError::NotFound(message)),
        Err(e) => Err(StoreError::Storage(e)),
    }
}

/// List all experiments.
pub async fn list_experiments() -> Result<Vec<Experiment>, StoreError> {
    Ok(ExperimentRepository::list().await?)
}

/// Delete an experiment. Its jobs are not cascaded.
pub async fn delete_experiment(id: &str) -> Result<(), StoreError> {
    let experiment_id = parse_experiment_id(id)?;
    Ok(ExperimentRepository::delete(experiment_id).await?)
}
