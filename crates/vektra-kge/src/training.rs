//! Training configuration for the reference models.

use serde::{Deserialize, Serialize};

use crate::corruption::CorruptSide;
use crate::params::HyperParams;
use crate::{Error, Result};

/// Loss function for minibatch SGD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LossKind {
    /// Margin-based pairwise ranking loss:
    /// `max(0, margin + score(neg) - score(pos))`.
    Pairwise {
        /// Ranking margin.
        margin: f32,
    },
    /// Negative log-likelihood (logistic) loss:
    /// `softplus(-score(pos)) + softplus(score(neg))`.
    Nll,
}

impl Default for LossKind {
    fn default() -> Self {
        Self::Pairwise { margin: 1.0 }
    }
}

/// Hyperparameters shared by all reference models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Embedding dimensionality (default: 100).
    pub k: usize,
    /// Negatives generated per positive (default: 5).
    pub eta: usize,
    /// Training epochs (default: 100).
    pub epochs: usize,
    /// Number of batches the training set is split into (default: 10).
    pub batches_count: usize,
    /// Seed for embedding init and corruption draws (default: 0).
    pub seed: u64,
    /// Learning rate (default: 0.01).
    pub lr: f32,
    /// Loss function (default: pairwise, margin 1.0).
    pub loss: LossKind,
    /// Sides corrupted during training, applied round-robin across the eta
    /// budget (default: `["s,o"]`).
    pub corrupt_sides: Vec<CorruptSide>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            k: 100,
            eta: 5,
            epochs: 100,
            batches_count: 10,
            seed: 0,
            lr: 0.01,
            loss: LossKind::default(),
            corrupt_sides: vec![CorruptSide::Both],
        }
    }
}

impl TrainConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_eta(mut self, eta: usize) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batches_count(mut self, batches_count: usize) -> Self {
        self.batches_count = batches_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_lr(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    pub fn with_loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_corrupt_sides(mut self, sides: Vec<CorruptSide>) -> Self {
        self.corrupt_sides = sides;
        self
    }

    /// Build a config from a resolved hyperparameter assignment, using the
    /// defaults above for anything absent. Reads the conventional keys
    /// `k`, `eta`, `epochs`, `batches_count`, `seed`, `loss`,
    /// `loss_params.margin` and `optimizer_params.lr`.
    pub fn from_params(params: &HyperParams) -> Result<Self> {
        let defaults = Self::default();

        let loss = match params.str_or("loss", "pairwise")? {
            "pairwise" => LossKind::Pairwise {
                margin: params.nested_f64_or("loss_params", "margin", 1.0)? as f32,
            },
            "nll" => LossKind::Nll,
            other => {
                return Err(Error::InvalidParam(format!("loss `{other}`")));
            }
        };

        Ok(Self {
            k: params.usize_or("k", defaults.k)?,
            eta: params.usize_or("eta", defaults.eta)?,
            epochs: params.usize_or("epochs", defaults.epochs)?,
            batches_count: params.usize_or("batches_count", defaults.batches_count)?,
            seed: params.i64_or("seed", defaults.seed as i64)? as u64,
            lr: params.nested_f64_or("optimizer_params", "lr", f64::from(defaults.lr))? as f32,
            loss,
            corrupt_sides: defaults.corrupt_sides,
        })
    }
}
