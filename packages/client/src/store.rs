//! Collection of merged job views.

use std::collections::HashMap;

use tracker_core::{Job, JobId, JobSnapshot, ProgressEvent};

use crate::view::{JobView, merge_event};

/// Observer-side store merging snapshots and deltas into one coherent view
/// per job.
///
/// A snapshot fully replaces a job's view; a delta is folded in through
/// [`merge_event`]. Deltas for jobs the store has never seen a snapshot or
/// list entry for are ignored: a pull always precedes trusted deltas.
#[derive(Debug, Default)]
pub struct ReconciliationStore {
    jobs: HashMap<JobId, JobView>,
}

impl ReconciliationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a job's view with a freshly pulled snapshot.
    pub fn apply_snapshot(&mut self, snapshot: JobSnapshot) {
        self.jobs.insert(snapshot.job.id, JobView::from(snapshot));
    }

    /// Fold one streamed delta into the matching view.
    ///
    /// Returns false when the job is unknown and the delta was ignored.
    pub fn apply_event(&mut self, event: &ProgressEvent) -> bool {
        match self.jobs.remove(&event.job_id) {
            Some(view) => {
                self.jobs.insert(event.job_id, merge_event(view, event));
                true
            }
            None => {
                tracing::debug!("Ignoring delta for untracked job {}", event.job_id);
                false
            }
        }
    }

    /// Merge a pulled job list into the collection.
    ///
    /// Latest wins: a job already present is fully replaced by the incoming
    /// copy, with no field-level merge across the two. Histories stay with
    /// the snapshot/delta flow; list views carry none.
    pub fn merge_jobs(&mut self, jobs: Vec<Job>) {
        for job in jobs {
            match self.jobs.get_mut(&job.id) {
                Some(view) => view.job = job,
                None => {
                    self.jobs.insert(
                        job.id,
                        JobView {
                            job,
                            history: Default::default(),
                        },
                    );
                }
            }
        }
    }

    /// Drop a job's view, e.g. after deletion.
    pub fn remove(&mut self, job_id: JobId) -> Option<JobView> {
        self.jobs.remove(&job_id)
    }

    /// Look up one job's view.
    pub fn get(&self, job_id: JobId) -> Option<&JobView> {
        self.jobs.get(&job_id)
    }

    /// Iterate over all tracked views.
    pub fn views(&self) -> impl Iterator<Item = &JobView> {
        self.jobs.values()
    }

    /// Number of tracked jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the store tracks no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::{
        EpochMetrics, Envelope, ExperimentId, JobParameters, JobStatus, MetricHistory, Optimizer,
        SharedParams,
    };

    fn job(epochs: u32) -> Job {
        let params = JobParameters::Cnn {
            kernel_size: 3,
            shared: SharedParams {
                optimizer: Optimizer::Adam,
                learning_rate: 0.001,
                batch_size: 64,
                epochs,
                dropout_rate: None,
                hidden_size: None,
                use_scheduler: true,
            },
        };
        Job::new("cnn-k3", ExperimentId::new(), params)
    }

    fn row(epoch: u32) -> EpochMetrics {
        EpochMetrics {
            train_loss: 0.5,
            val_loss: 0.6,
            train_accuracy: 70.0 + epoch as f64,
            val_accuracy: 72.0 + epoch as f64,
            epoch_time: 8.0,
        }
    }

    #[test]
    fn deltas_before_any_snapshot_are_ignored() {
        let mut store = ReconciliationStore::new();
        let event = ProgressEvent::status_only(JobId::new(), JobStatus::Running, 0, 5);
        assert!(!store.apply_event(&event));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_replaces_the_whole_view() {
        let mut store = ReconciliationStore::new();
        let job = job(5);
        let job_id = job.id;

        store.apply_snapshot(JobSnapshot::new(job.clone(), MetricHistory::new()));
        store.apply_event(&ProgressEvent::epoch(job_id, 1, 5, row(1), Some(71.0)));
        assert_eq!(store.get(job_id).unwrap().history.len(), 1);

        // A fresh pull showing four epochs supersedes the local view.
        let mut fresh = job;
        fresh.status = JobStatus::Running;
        fresh.epochs_completed = 4;
        let mut history = MetricHistory::new();
        for epoch in 1..=4 {
            history.push(row(epoch));
        }
        store.apply_snapshot(JobSnapshot::new(fresh, history));

        let view = store.get(job_id).unwrap();
        assert_eq!(view.history.len(), 4);
        assert_eq!(view.job.epochs_completed, 4);
    }

    #[test]
    fn snapshot_then_delta_closes_the_gap() {
        // Disconnect after epoch 2, snapshot shows 4, push for 5 lands: the
        // final history has five rows and no gap.
        let mut store = ReconciliationStore::new();
        let job = job(6);
        let job_id = job.id;

        let mut early = MetricHistory::new();
        early.push(row(1));
        early.push(row(2));
        let mut at_two = job.clone();
        at_two.status = JobStatus::Running;
        at_two.epochs_completed = 2;
        store.apply_snapshot(JobSnapshot::new(at_two, early));

        let mut at_four = job.clone();
        at_four.status = JobStatus::Running;
        at_four.epochs_completed = 4;
        let mut history = MetricHistory::new();
        for epoch in 1..=4 {
            history.push(row(epoch));
        }
        store.apply_snapshot(JobSnapshot::new(at_four, history));

        assert!(store.apply_event(&ProgressEvent::epoch(job_id, 5, 6, row(5), Some(77.0))));

        let view = store.get(job_id).unwrap();
        assert_eq!(view.history.len(), 5);
        assert_eq!(view.job.epochs_completed, 5);
        assert_eq!(view.history.val_accuracy, vec![73.0, 74.0, 75.0, 76.0, 77.0]);
    }

    #[test]
    fn job_list_merge_is_latest_wins() {
        let mut store = ReconciliationStore::new();
        let mut stale = job(5);
        let job_id = stale.id;
        stale.status = JobStatus::Running;
        stale.epochs_completed = 1;

        let mut fresh = stale.clone();
        fresh.status = JobStatus::Completed;
        fresh.epochs_completed = 5;
        fresh.best_accuracy = Some(91.2);

        store.merge_jobs(vec![stale, fresh.clone()]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(job_id).unwrap().job, fresh);
    }

    #[test]
    fn wire_envelope_feeds_the_store() {
        let mut store = ReconciliationStore::new();
        let job = job(3);
        let job_id = job.id;
        store.apply_snapshot(JobSnapshot::new(job, MetricHistory::new()));

        let wire = serde_json::to_string(&Envelope::new(ProgressEvent::epoch(
            job_id,
            1,
            3,
            row(1),
            Some(73.5),
        )))
        .unwrap();
        let envelope = Envelope::parse(&wire).unwrap();
        assert!(store.apply_event(&envelope.data));
        assert_eq!(store.get(job_id).unwrap().job.best_accuracy, Some(73.5));
    }
}
