//! Per-epoch metric history for a training job.

use serde::{Deserialize, Serialize};

/// One complete row of per-epoch metrics.
///
/// All five fields are required; a progress event missing any of them is a
/// status update, not an epoch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub train_loss: f64,
    pub val_loss: f64,
    pub train_accuracy: f64,
    pub val_accuracy: f64,
    pub epoch_time: f64,
}

/// Parallel metric sequences accumulated over a job's epochs.
///
/// Owned exclusively by the job store once a job starts. The five sequences
/// always have equal length, equal to the job's `epochs_completed`; rows are
/// appended via [`MetricHistory::push`] and never truncated or reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricHistory {
    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub train_accuracy: Vec<f64>,
    pub val_accuracy: Vec<f64>,
    pub epoch_times: Vec<f64>,
}

impl MetricHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed epochs recorded.
    pub fn len(&self) -> usize {
        self.train_loss.len()
    }

    /// Whether no epochs have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.train_loss.is_empty()
    }

    /// Append one full metric row.
    pub fn push(&mut self, row: EpochMetrics) {
        self.train_loss.push(row.train_loss);
        self.val_loss.push(row.val_loss);
        self.train_accuracy.push(row.train_accuracy);
        self.val_accuracy.push(row.val_accuracy);
        self.epoch_times.push(row.epoch_time);
    }

    /// The row for a zero-based epoch index, if recorded.
    pub fn row(&self, index: usize) -> Option<EpochMetrics> {
        if index >= self.len() {
            return None;
        }
        Some(EpochMetrics {
            train_loss: self.train_loss[index],
            val_loss: self.val_loss[index],
            train_accuracy: self.train_accuracy[index],
            val_accuracy: self.val_accuracy[index],
            epoch_time: self.epoch_times[index],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_sequences_parallel() {
        let mut history = MetricHistory::new();
        assert!(history.is_empty());

        history.push(EpochMetrics {
            train_loss: 0.9,
            val_loss: 0.8,
            train_accuracy: 61.0,
            val_accuracy: 63.5,
            epoch_time: 12.4,
        });
        history.push(EpochMetrics {
            train_loss: 0.5,
            val_loss: 0.45,
            train_accuracy: 80.2,
            val_accuracy: 82.0,
            epoch_time: 11.9,
        });

        assert_eq!(history.len(), 2);
        assert_eq!(history.val_loss.len(), 2);
        assert_eq!(history.epoch_times.len(), 2);

        let second = history.row(1).unwrap();
        assert_eq!(second.train_accuracy, 80.2);
        assert!(history.row(2).is_none());
    }
}
