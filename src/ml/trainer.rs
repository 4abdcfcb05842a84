// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives one run through its states:
//
//   Initializing → Resuming | FreshStart
//                → { TrainEpoch → EvaluateEpoch → Report → Checkpoint }*
//                → Completed
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend with
//     batch norm in inference mode
//   - The test loader must therefore batch on B::InnerBackend
//
// Epoch indices are 0-based and n_epochs is an exclusive bound.
// Every failure aborts the run; nothing is retried.
//
// Reference: Burn Book §5, Robbins & Monro (1951) SGD

use std::time::Instant;

use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::ImageBatch;
use crate::domain::error::{TrainError, TrainResult};
use crate::domain::metrics::{EpochMetrics, RunHistory};
use crate::domain::params::{RunStart, TrainingParams};
use crate::domain::schedule::{BestModelMarker, CheckpointPolicy};
use crate::domain::traits::MetricsSink;
use crate::ml::evaluator::evaluate;
use crate::ml::state::{CheckpointStore, TrainingState};

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Epochs executed by this invocation (resumed epochs excluded)
    pub epochs_run:    usize,
    /// Best test accuracy of this invocation, 0.0 when nothing ran
    pub best_accuracy: f64,
    /// Index of the last epoch executed, if any
    pub final_epoch:   Option<usize>,
}

pub struct TrainingLoop<'a, B, C, S>
where
    B: AutodiffBackend,
    C: CheckpointStore<B>,
    S: MetricsSink,
{
    state:       TrainingState<B>,
    start_epoch: usize,
    policy:      CheckpointPolicy,
    marker:      BestModelMarker,
    history:     RunHistory,
    store:       &'a C,
    sink:        &'a S,
}

impl<'a, B, C, S> TrainingLoop<'a, B, C, S>
where
    B: AutodiffBackend,
    C: CheckpointStore<B>,
    S: MetricsSink,
{
    /// Resumes from `load_model` when set, otherwise starts from scratch.
    pub fn initialize(
        params: TrainingParams,
        store:  &'a C,
        sink:   &'a S,
        device: &B::Device,
    ) -> TrainResult<Self> {
        let state = match params.run_start() {
            RunStart::Resuming { checkpoint } => {
                let mut state = store.load(&checkpoint, device)?;
                tracing::info!(
                    "Resuming '{}' from '{}' after {} completed epochs",
                    state.params.model_name,
                    checkpoint.display(),
                    state.epoch
                );
                // a run may be extended beyond the stored bound, and its
                // outputs go where the current parameters point
                state.params.n_epochs   = params.n_epochs;
                state.params.model_name = params.model_name;
                state
            }
            RunStart::FreshStart => {
                tracing::info!(
                    "Fresh start: ResNet-{} '{}'",
                    params.resnet_depth,
                    params.model_name
                );
                TrainingState::fresh(params, device)?
            }
        };
        Self::new(state, store, sink)
    }

    /// Wraps an already restored or freshly built state. The loop starts at
    /// `state.epoch` and the best-model marker starts at 0.0.
    pub fn new(state: TrainingState<B>, store: &'a C, sink: &'a S) -> TrainResult<Self> {
        let policy = CheckpointPolicy::new(state.params.save_every)?;
        if state.params.batch_every == 0 {
            return Err(TrainError::config("'batch_every' must be greater than zero"));
        }
        Ok(Self {
            start_epoch: state.epoch,
            state,
            policy,
            marker: BestModelMarker::new(),
            history: RunHistory::new(),
            store,
            sink,
        })
    }

    /// Runs epochs `start_epoch..n_epochs`, reporting metrics after each one
    /// and saving checkpoints as the policy decides. The first error aborts.
    pub fn run(
        &mut self,
        train: &dyn DataLoader<ImageBatch<B>>,
        test:  &dyn DataLoader<ImageBatch<B::InnerBackend>>,
    ) -> TrainResult<RunSummary> {
        let n_epochs = self.state.params.n_epochs;
        if self.start_epoch >= n_epochs {
            tracing::warn!(
                "Nothing to do: {} epochs already completed, n_epochs is {}",
                self.start_epoch,
                n_epochs
            );
        }

        for epoch in self.start_epoch..n_epochs {
            let started = Instant::now();

            // ── TrainEpoch ────────────────────────────────────────────────────
            let batch_losses = self.train_epoch(epoch, train)?;

            // ── EvaluateEpoch ─────────────────────────────────────────────────
            let accuracy = evaluate(&self.state.model.valid(), test)?;

            let metrics = EpochMetrics::new(epoch, batch_losses, accuracy)
                .ok_or_else(|| TrainError::resource("training set yielded no batches"))?;
            self.state.epoch    = epoch + 1;
            self.state.accuracy = Some(accuracy);
            self.history.record(&metrics);

            println!(
                "Epoch n°{}, ce loss: {}, test accuracy: {}, duration {}s",
                epoch,
                metrics.mean_loss,
                accuracy,
                started.elapsed().as_secs_f64()
            );

            // ── Report ────────────────────────────────────────────────────────
            self.sink.report(&self.history, &self.state.params.model_name, epoch)?;

            // ── Checkpoint ────────────────────────────────────────────────────
            let decision = self.policy.decide(epoch, accuracy, &mut self.marker);
            if decision.best {
                tracing::info!("New best accuracy {:.4} at epoch {}", accuracy, epoch);
                self.store.save(&self.state, epoch, true)?;
            }
            if decision.regular {
                self.store.save(&self.state, epoch, false)?;
            }
        }

        tracing::info!("Training complete!");
        let epochs = self.history.epochs();
        Ok(RunSummary {
            epochs_run:    epochs.len(),
            best_accuracy: self.marker.best(),
            final_epoch:   epochs.last().copied(),
        })
    }

    /// One pass over the training loader; returns every batch loss.
    fn train_epoch(
        &mut self,
        epoch: usize,
        train: &dyn DataLoader<ImageBatch<B>>,
    ) -> TrainResult<Vec<f64>> {
        let lr          = self.state.params.lr;
        let batch_every = self.state.params.batch_every;
        let mut losses  = Vec::new();
        let mut running = 0.0f64;

        for (i, batch) in train.iter().enumerate() {
            let (loss, _) = self
                .state
                .model
                .forward_classification(batch.images, batch.targets);

            let value: f64 = loss.clone().into_scalar().elem::<f64>();
            if !value.is_finite() {
                return Err(TrainError::NumericInstability { epoch, batch: i, loss: value });
            }
            losses.push(value);
            running += value;

            // Backward pass + SGD update
            let grads = GradientsParams::from_grads(loss.backward(), &self.state.model);
            self.state.model = self.state.optimizer.step(lr, self.state.model.clone(), grads);

            if (i + 1) % batch_every == 0 {
                tracing::info!(
                    "[{}, {:5}] loss: {:.3}",
                    epoch,
                    i + 1,
                    running / batch_every as f64
                );
                running = 0.0;
            }
        }

        if losses.is_empty() {
            return Err(TrainError::resource("training set yielded no batches"));
        }
        Ok(losses)
    }
}
