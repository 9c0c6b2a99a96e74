//! Per-job merged view and the delta reducer.

use serde::{Deserialize, Serialize};
use tracker_core::{Job, JobSnapshot, MetricHistory, ProgressEvent};

/// One job's merged view: the last full snapshot plus every delta applied
/// since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub job: Job,
    pub history: MetricHistory,
}

impl From<JobSnapshot> for JobView {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job: snapshot.job,
            history: snapshot.history,
        }
    }
}

/// Apply one streamed delta to a view, returning the new view.
///
/// The merge rules, in order:
/// 1. the status always follows the event;
/// 2. `best_accuracy` only ever increases;
/// 3. a history row is appended only for `epoch == len + 1` with a complete
///    metric row, so partial, duplicate, or out-of-order events can never
///    corrupt the series;
/// 4. `epochs_completed` follows the event's epoch forward, never backward.
///
/// Pure: no transport, no clock, no I/O.
pub fn merge_event(mut view: JobView, event: &ProgressEvent) -> JobView {
    if view.job.status != event.status {
        view.job.status = event.status;
    }
    if let Some(error) = &event.error {
        view.job.error = Some(error.clone());
    }

    if let Some(best) = event.best_accuracy {
        let merged = match view.job.best_accuracy {
            Some(current) => current.max(best),
            None => best,
        };
        view.job.best_accuracy = Some(merged);
    }

    if let Some(metrics) = event.metrics
        && event.epoch > 0
        && event.epoch as usize == view.history.len() + 1
    {
        view.history.push(metrics);
    }

    if event.epoch >= view.job.epochs_completed {
        view.job.epochs_completed = event.epoch;
    }

    view
}
