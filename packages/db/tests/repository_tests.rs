mod common;

use std::error::Error;

use chrono::Utc;
use tracker_core::{
    EpochMetrics, Experiment, Job, JobParameters, JobStatus, MetricHistory, Optimizer,
    SharedParams,
};

use db::{DbError, repositories::ExperimentRepository, repositories::JobFilter,
    repositories::JobRepository};

fn cnn_parameters(batch_size: u32) -> JobParameters {
    JobParameters::Cnn {
        kernel_size: 3,
        shared: SharedParams {
            optimizer: Optimizer::Adam,
            learning_rate: 0.001,
            batch_size,
            epochs: 5,
            dropout_rate: None,
            hidden_size: None,
            use_scheduler: false,
        },
    }
}

fn metric_row(epoch: u32) -> EpochMetrics {
    EpochMetrics {
        train_loss: 1.0 / epoch as f64,
        val_loss: 1.1 / epoch as f64,
        train_accuracy: 60.0 + epoch as f64,
        val_accuracy: 62.0 + epoch as f64,
        epoch_time: 10.0,
    }
}

#[tokio::test]
async fn test_repositories() -> Result<(), Box<dyn Error>> {
    let _guard = common::setup_db().await?;

    // ExperimentRepository: create/get/list/exists/delete
    let experiment = Experiment::new("mnist-baselines").with_description("sweep over optimizers");
    let created = ExperimentRepository::create(&experiment).await?;
    assert_eq!(created.name, "mnist-baselines");
    assert_eq!(created.description.as_deref(), Some("sweep over optimizers"));

    let loaded = ExperimentRepository::get(experiment.id).await?;
    assert_eq!(loaded.id, experiment.id);

    let other = Experiment::new("mnist-lr-sweep");
    ExperimentRepository::create(&other).await?;
    let list = ExperimentRepository::list().await?;
    assert_eq!(list.len(), 2);

    assert!(ExperimentRepository::exists(experiment.id).await?);

    ExperimentRepository::delete(other.id).await?;
    assert!(!ExperimentRepository::exists(other.id).await?);
    let missing = ExperimentRepository::get(other.id).await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    // JobRepository: create/get/update/delete with history round-trip
    let job = Job::new("cnn-k3", experiment.id, cnn_parameters(64));
    let created_job = JobRepository::create(&job).await?;
    assert_eq!(created_job.name, "cnn-k3");
    assert_eq!(created_job.status, JobStatus::Pending);

    let loaded_job = JobRepository::get(job.id).await?;
    assert_eq!(loaded_job.id, job.id);
    assert_eq!(loaded_job.parameters, job.parameters);

    let empty_snapshot = JobRepository::get_snapshot(job.id).await?;
    assert!(empty_snapshot.history.is_empty());

    let mut running = loaded_job;
    running.status = JobStatus::Running;
    running.started_at = Some(Utc::now());
    running.epochs_completed = 2;
    running.best_accuracy = Some(71.5);

    let mut history = MetricHistory::new();
    history.push(metric_row(1));
    history.push(metric_row(2));

    let updated = JobRepository::update(&running, &history).await?;
    assert_eq!(updated.status, JobStatus::Running);
    assert_eq!(updated.epochs_completed, 2);
    assert_eq!(updated.best_accuracy, Some(71.5));

    let snapshot = JobRepository::get_snapshot(job.id).await?;
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.history.val_accuracy[1], 64.0);
    assert_eq!(snapshot.job.epochs_completed, 2);

    // JobRepository: list filters by experiment and status
    let second_experiment = Experiment::new("fashion-mnist");
    ExperimentRepository::create(&second_experiment).await?;
    let foreign_job = Job::new("cnn-other", second_experiment.id, cnn_parameters(32));
    JobRepository::create(&foreign_job).await?;

    let for_experiment = JobRepository::list(JobFilter::for_experiment(experiment.id)).await?;
    assert_eq!(for_experiment.len(), 1);
    assert_eq!(for_experiment[0].id, job.id);

    let running_filter = JobFilter {
        status: Some(JobStatus::Running),
        ..Default::default()
    };
    let running_jobs = JobRepository::list(running_filter).await?;
    assert!(running_jobs.iter().all(|j| j.status == JobStatus::Running));
    assert!(running_jobs.iter().any(|j| j.id == job.id));

    let all_jobs = JobRepository::list(JobFilter::default()).await?;
    assert_eq!(all_jobs.len(), 2);

    // Deletion removes the job and its history for good
    JobRepository::delete(job.id).await?;
    let missing_job = JobRepository::get(job.id).await;
    assert!(matches!(missing_job, Err(DbError::NotFound(_))));
    let missing_snapshot = JobRepository::get_snapshot(job.id).await;
    assert!(matches!(missing_snapshot, Err(DbError::NotFound(_))));

    Ok(())
}
