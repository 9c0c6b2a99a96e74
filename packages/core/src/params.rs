//! Training-job parameter variants and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A parameter value was rejected before job creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Why the value was rejected.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error for the named field.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Gradient optimizer selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    #[default]
    Sgd,
    Adam,
}

impl std::fmt::Display for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Optimizer::Sgd => write!(f, "sgd"),
            Optimizer::Adam => write!(f, "adam"),
        }
    }
}

/// Hyperparameters common to every model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedParams {
    /// Optimizer used for gradient updates.
    pub optimizer: Optimizer,
    /// Learning rate, must be in (0, 1].
    pub learning_rate: f64,
    /// Mini-batch size, must be in [1, 1024].
    pub batch_size: u32,
    /// Number of epochs to train, must be in [1, 100].
    pub epochs: u32,
    /// Optional dropout probability in [0, 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropout_rate: Option<f64>,
    /// Optional hidden layer width in [1, 4096].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u32>,
    /// Whether to reduce the learning rate on validation-loss plateaus.
    #[serde(default)]
    pub use_scheduler: bool,
}

/// Parameters for one training job, keyed by model type.
///
/// Parameters are immutable after creation; deep equality of a variant is
/// the fingerprint used for idempotent job creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "lowercase")]
pub enum JobParameters {
    Mlp {
        /// Number of fully-connected layers, must be in [1, 32].
        num_layers: u32,
        #[serde(flatten)]
        shared: SharedParams,
    },
    Cnn {
        /// Convolution kernel size, must be in [1, 15].
        kernel_size: u32,
        #[serde(flatten)]
        shared: SharedParams,
    },
    Rnn {
        /// Number of recurrent layers, must be in [1, 32].
        num_layers: u32,
        #[serde(flatten)]
        shared: SharedParams,
    },
}

impl JobParameters {
    /// The model type tag for display and filtering.
    pub fn model_type(&self) -> &'static str {
        match self {
            JobParameters::Mlp { .. } => "mlp",
            JobParameters::Cnn { .. } => "cnn",
            JobParameters::Rnn { .. } => "rnn",
        }
    }

    /// Hyperparameters shared across model types.
    pub fn shared(&self) -> &SharedParams {
        match self {
            JobParameters::Mlp { shared, .. }
            | JobParameters::Cnn { shared, .. }
            | JobParameters::Rnn { shared, .. } => shared,
        }
    }

    /// Total number of epochs this job will run.
    pub fn epochs(&self) -> u32 {
        self.shared().epochs
    }

    /// Range-check every field, model-specific ones included.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let shared = self.shared();

        if !(shared.learning_rate > 0.0 && shared.learning_rate <= 1.0) {
            return Err(ValidationError::new(
                "learning_rate",
                format!("{} is outside (0, 1]", shared.learning_rate),
            ));
        }
        if !(1..=1024).contains(&shared.batch_size) {
            return Err(ValidationError::new(
                "batch_size",
                format!("{} is outside [1, 1024]", shared.batch_size),
            ));
        }
        if !(1..=100).contains(&shared.epochs) {
            return Err(ValidationError::new(
                "epochs",
                format!("{} is outside [1, 100]", shared.epochs),
            ));
        }
        if let Some(rate) = shared.dropout_rate
            && !(0.0..1.0).contains(&rate)
        {
            return Err(ValidationError::new(
                "dropout_rate",
                format!("{} is outside [0, 1)", rate),
            ));
        }
        if let Some(size) = shared.hidden_size
            && !(1..=4096).contains(&size)
        {
            return Err(ValidationError::new(
                "hidden_size",
                format!("{} is outside [1, 4096]", size),
            ));
        }

        match self {
            JobParameters::Mlp { num_layers, .. } | JobParameters::Rnn { num_layers, .. } => {
                if !(1..=32).contains(num_layers) {
                    return Err(ValidationError::new(
                        "num_layers",
                        format!("{} is outside [1, 32]", num_layers),
                    ));
                }
            }
            JobParameters::Cnn { kernel_size, .. } => {
                if !(1..=15).contains(kernel_size) {
                    return Err(ValidationError::new(
                        "kernel_size",
                        format!("{} is outside [1, 15]", kernel_size),
                    ));
                }
            }
        }

        Ok(())
    }
}
