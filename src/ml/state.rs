// ============================================================
// Layer 5 — Training State
// ============================================================
// Everything a run needs to continue where it stopped:
//
//   model        ResNet parameters and batch-norm statistics
//   optimizer    SGD with its momentum buffers
//   params       the hyperparameters the run was started with
//   epoch        number of completed epochs, which is also the
//                0-based index of the next epoch to run
//
// Persisted and restored through a CheckpointStore.

use std::path::Path;

use burn::{
    optim::{adaptor::OptimizerAdaptor, momentum::MomentumConfig, Sgd, SgdConfig},
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::TrainResult;
use crate::domain::params::TrainingParams;
use crate::ml::model::{ResNet, ResNetConfig};

pub type ModelOptimizer<B> =
    OptimizerAdaptor<Sgd<<B as AutodiffBackend>::InnerBackend>, ResNet<B>, B>;

/// None when momentum is zero; heavy-ball momentum without dampening otherwise.
pub fn momentum_config(params: &TrainingParams) -> Option<MomentumConfig> {
    (params.momentum > 0.0).then(|| {
        MomentumConfig::new()
            .with_momentum(params.momentum)
            .with_dampening(0.0)
    })
}

pub fn sgd_config(params: &TrainingParams) -> SgdConfig {
    SgdConfig::new().with_momentum(momentum_config(params))
}

/// A run's resumable state, owned by the training loop.
pub struct TrainingState<B: AutodiffBackend> {
    pub model:     ResNet<B>,
    /// Carries one momentum buffer per parameter once a step was taken
    pub optimizer: ModelOptimizer<B>,
    pub params:    TrainingParams,
    /// Completed epochs
    pub epoch:     usize,
    /// Test accuracy of the last evaluated epoch
    pub accuracy:  Option<f64>,
}

impl<B: AutodiffBackend> TrainingState<B> {
    /// New model and optimizer built from `params`, at epoch 0.
    pub fn fresh(params: TrainingParams, device: &B::Device) -> TrainResult<Self> {
        let model = ResNetConfig::from_params(&params)?.init(device)?;
        Ok(Self::with_model(model, params))
    }

    /// Pairs an already built model with a new optimizer at epoch 0.
    pub fn with_model(model: ResNet<B>, params: TrainingParams) -> Self {
        let optimizer = sgd_config(&params).init();
        Self { model, optimizer, params, epoch: 0, accuracy: None }
    }
}

// ─── CheckpointStore ──────────────────────────────────────────────────────────
/// Persistence of TrainingState. `epoch` is the 0-based index of the
/// epoch that just completed.
pub trait CheckpointStore<B: AutodiffBackend> {
    fn save(&self, state: &TrainingState<B>, epoch: usize, is_best: bool) -> TrainResult<()>;

    fn load(&self, source: &Path, device: &B::Device) -> TrainResult<TrainingState<B>>;
}
