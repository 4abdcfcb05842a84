// ============================================================
// Layer 3 — Checkpoint Schedule
// ============================================================
// After each evaluated epoch two independent triggers decide
// what to persist. Both may fire in the same epoch.
//
//   best      accuracy strictly above every earlier epoch
//             of this run (the marker starts at 0.0)
//   regular   epoch % save_every == 0

use crate::domain::error::{TrainError, TrainResult};

/// Highest test accuracy observed so far in the run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BestModelMarker {
    best: f64,
}

impl BestModelMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Returns true and moves the marker when `accuracy` beats it strictly.
    pub fn observe(&mut self, accuracy: f64) -> bool {
        if accuracy > self.best {
            self.best = accuracy;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckpointDecision {
    pub best:    bool,
    pub regular: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointPolicy {
    save_every: usize,
}

impl CheckpointPolicy {
    pub fn new(save_every: usize) -> TrainResult<Self> {
        if save_every == 0 {
            return Err(TrainError::config("'save_every' must be greater than zero"));
        }
        Ok(Self { save_every })
    }

    pub fn decide(&self, epoch: usize, accuracy: f64, marker: &mut BestModelMarker) -> CheckpointDecision {
        CheckpointDecision {
            best:    marker.observe(accuracy),
            regular: epoch % self.save_every == 0,
        }
    }
}
