//! Progress event deltas for real-time updates.

use serde::{Deserialize, Serialize};

use crate::{EpochMetrics, JobId, JobStatus};

/// One incremental update describing an epoch boundary or a status change.
///
/// `epoch` is zero for pure status changes; an epoch boundary carries a full
/// [`EpochMetrics`] row. Delivery is at-most-once and best-effort: observers
/// that miss events recover by re-pulling a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub epoch: u32,
    pub epochs_total: u32,
    /// Full metric row, present only on epoch boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EpochMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_accuracy: Option<f64>,
    /// Failure explanation, present only on terminal `failed` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    /// A pure status change with no metrics attached.
    pub fn status_only(job_id: JobId, status: JobStatus, epoch: u32, epochs_total: u32) -> Self {
        Self {
            job_id,
            status,
            epoch,
            epochs_total,
            metrics: None,
            best_accuracy: None,
            error: None,
        }
    }

    /// An epoch boundary carrying one full metric row.
    pub fn epoch(
        job_id: JobId,
        epoch: u32,
        epochs_total: u32,
        metrics: EpochMetrics,
        best_accuracy: Option<f64>,
    ) -> Self {
        Self {
            job_id,
            status: JobStatus::Running,
            epoch,
            epochs_total,
            metrics: Some(metrics),
            best_accuracy,
            error: None,
        }
    }

    /// The terminal event of a successful run.
    pub fn completed(job_id: JobId, epochs_total: u32, best_accuracy: Option<f64>) -> Self {
        Self {
            job_id,
            status: JobStatus::Completed,
            epoch: epochs_total,
            epochs_total,
            metrics: None,
            best_accuracy,
            error: None,
        }
    }

    /// The terminal event of a failed or cancelled run.
    pub fn failed(job_id: JobId, epoch: u32, epochs_total: u32, error: impl Into<String>) -> Self {
        Self {
            job_id,
            status: JobStatus::Failed,
            epoch,
            epochs_total,
            metrics: None,
            best_accuracy: None,
            error: Some(error.into()),
        }
    }

    /// Whether this event ends the job's lifecycle.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this event carries a complete metric row.
    pub fn has_full_metrics(&self) -> bool {
        self.metrics.is_some()
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self.status {
            JobStatus::Running if self.metrics.is_some() => {
                format!("Job {} epoch {}/{}", self.job_id, self.epoch, self.epochs_total)
            }
            JobStatus::Failed => {
                let error = self.error.as_deref().unwrap_or("unknown error");
                format!("Job {} failed: {}", self.job_id, error)
            }
            status => format!("Job {} -> {}", self.job_id, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_events_carry_no_metrics() {
        let event = ProgressEvent::status_only(JobId::new(), JobStatus::Running, 0, 5);
        assert!(!event.has_full_metrics());
        assert!(!event.is_terminal());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "running");
        assert!(json.get("metrics").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_event_keeps_the_error_text() {
        let event = ProgressEvent::failed(JobId::new(), 3, 10, "out of memory");
        assert!(event.is_terminal());
        let json = serde_json::to_string(&event).unwrap();
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error.as_deref(), Some("out of memory"));
        assert_eq!(back.epoch, 3);
    }
}
