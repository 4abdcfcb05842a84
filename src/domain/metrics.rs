// ============================================================
// Layer 3 — Epoch Metrics and Run History
// ============================================================
// One EpochMetrics is emitted per completed epoch and never
// modified afterwards. RunHistory accumulates them into the
// three series reported after every epoch:
//
//   epoch_losses   mean training loss per epoch
//   iter_losses    every batch loss, in order
//   accuracies     test accuracy per epoch

use serde::{Deserialize, Serialize};

/// Metrics of a single completed epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 0-based epoch index
    pub epoch: usize,

    /// Mean cross-entropy over the epoch's batches
    pub mean_loss: f64,

    /// Loss of every training batch, in consumption order
    pub batch_losses: Vec<f64>,

    /// Fraction of test samples classified correctly, in [0, 1]
    pub accuracy: f64,
}

impl EpochMetrics {
    /// Returns None when the epoch produced no batch losses.
    pub fn new(epoch: usize, batch_losses: Vec<f64>, accuracy: f64) -> Option<Self> {
        if batch_losses.is_empty() {
            return None;
        }
        let mean_loss = batch_losses.iter().sum::<f64>() / batch_losses.len() as f64;
        Some(Self { epoch, mean_loss, batch_losses, accuracy })
    }
}

/// Axis labels and legend of one reported series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesLabels {
    pub legend: &'static str,
    pub xlabel: &'static str,
    pub ylabel: &'static str,
}

pub const EPOCH_LOSS_LABELS: SeriesLabels = SeriesLabels {
    legend: "Training CE (epoch)",
    xlabel: "nb_epochs",
    ylabel: "CE loss",
};

pub const ITER_LOSS_LABELS: SeriesLabels = SeriesLabels {
    legend: "Training CE (batch)",
    xlabel: "nb_iterations",
    ylabel: "CE loss",
};

pub const ACCURACY_LABELS: SeriesLabels = SeriesLabels {
    legend: "Test accuracies",
    xlabel: "nb_epochs",
    ylabel: "Accuracy",
};

/// A labelled, borrowed view on one history series
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    /// File-friendly identifier
    pub name:   &'static str,
    pub labels: SeriesLabels,
    pub values: &'a [f64],
}

/// Cumulative histories owned by the training loop for the whole run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunHistory {
    pub epoch_losses: Vec<f64>,
    pub iter_losses:  Vec<f64>,
    pub accuracies:   Vec<f64>,
    epochs:           Vec<usize>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one epoch to all three series.
    pub fn record(&mut self, m: &EpochMetrics) {
        self.epochs.push(m.epoch);
        self.epoch_losses.push(m.mean_loss);
        self.iter_losses.extend_from_slice(&m.batch_losses);
        self.accuracies.push(m.accuracy);
    }

    /// Epoch indices recorded during this run, in order
    pub fn epochs(&self) -> &[usize] {
        &self.epochs
    }

    pub fn series(&self) -> [Series<'_>; 3] {
        [
            Series { name: "epoch_losses", labels: EPOCH_LOSS_LABELS, values: &self.epoch_losses },
            Series { name: "iter_losses",  labels: ITER_LOSS_LABELS,  values: &self.iter_losses },
            Series { name: "accuracies",   labels: ACCURACY_LABELS,   values: &self.accuracies },
        ]
    }
}
