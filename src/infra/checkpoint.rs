// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a TrainingState with Burn's gzip'd
// MessagePack recorder.
//
// What gets saved per checkpoint:
//   1. model.mpk.gz   model parameters and batch-norm statistics
//   2. optim.mpk.gz   SGD momentum buffers
//   3. state.json     completed epochs, last accuracy and the
//                     training parameters needed to rebuild the
//                     model before its weights are loaded
//
// File naming convention:
//   <models>/<model_name>/
//     epoch_0/        ← regular snapshot after epoch 0
//     epoch_2/
//     ...
//     best/           ← best test accuracy so far, overwritten
//
// Weights are kept at full precision so a resumed run
// continues exactly where the interrupted one stopped.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    module::Module,
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{TrainError, TrainResult};
use crate::domain::params::TrainingParams;
use crate::ml::model::ResNetConfig;
use crate::ml::state::{sgd_config, CheckpointStore, TrainingState};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const MODEL_FILE: &str = "model";
const OPTIM_FILE: &str = "optim";
const STATE_FILE: &str = "state.json";
const BEST_DIR:   &str = "best";

/// Contents of state.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// Completed epochs
    pub epoch:    usize,
    pub accuracy: Option<f64>,
    pub params:   TrainingParams,
}

/// Writes checkpoints under `<models>/<model_name>/`
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    /// `<models>/<model_name>`, created on construction
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the model directory if it doesn't already exist.
    pub fn new(models_dir: impl AsRef<Path>, model_name: &str) -> TrainResult<Self> {
        let dir = models_dir.as_ref().join(model_name);
        fs::create_dir_all(&dir).map_err(|e| {
            TrainError::resource(format!("cannot create checkpoint directory '{}': {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    /// Directory a checkpoint of `epoch` is written to.
    pub fn destination(&self, epoch: usize, is_best: bool) -> PathBuf {
        if is_best {
            self.dir.join(BEST_DIR)
        } else {
            self.dir.join(format!("epoch_{epoch}"))
        }
    }
}

fn write_failed(path: &Path, e: impl std::fmt::Display) -> TrainError {
    TrainError::resource(format!("cannot write checkpoint '{}': {e}", path.display()))
}

fn load_failed(path: &Path, e: impl std::fmt::Display) -> TrainError {
    TrainError::config(format!("cannot load checkpoint '{}': {e}", path.display()))
}

impl<B: AutodiffBackend> CheckpointStore<B> for CheckpointManager {
    fn save(&self, state: &TrainingState<B>, epoch: usize, is_best: bool) -> TrainResult<()> {
        let dest = self.destination(epoch, is_best);
        fs::create_dir_all(&dest).map_err(|e| write_failed(&dest, e))?;

        let recorder = CheckpointRecorder::new();
        recorder
            .record(state.model.clone().into_record(), dest.join(MODEL_FILE))
            .map_err(|e| write_failed(&dest, e))?;
        recorder
            .record(state.optimizer.to_record(), dest.join(OPTIM_FILE))
            .map_err(|e| write_failed(&dest, e))?;

        let meta = StateFile {
            epoch:    state.epoch,
            accuracy: state.accuracy,
            params:   state.params.clone(),
        };
        let json = serde_json::to_string_pretty(&meta).map_err(|e| write_failed(&dest, e))?;
        fs::write(dest.join(STATE_FILE), json).map_err(|e| write_failed(&dest, e))?;

        tracing::info!(
            "Saved {} checkpoint for epoch {} to '{}'",
            if is_best { "best" } else { "regular" },
            epoch,
            dest.display()
        );
        Ok(())
    }

    fn load(&self, source: &Path, device: &B::Device) -> TrainResult<TrainingState<B>> {
        let json = fs::read_to_string(source.join(STATE_FILE)).map_err(|e| load_failed(source, e))?;
        let meta: StateFile = serde_json::from_str(&json).map_err(|e| load_failed(source, e))?;
        meta.params.validate()?;

        // Rebuild the exact architecture before loading weights into it
        let model = ResNetConfig::from_params(&meta.params)?.init::<B>(device)?;

        let recorder = CheckpointRecorder::new();
        let record = recorder
            .load(source.join(MODEL_FILE), device)
            .map_err(|e| load_failed(source, e))?;
        let model = model.load_record(record);

        let record = recorder
            .load(source.join(OPTIM_FILE), device)
            .map_err(|e| load_failed(source, e))?;
        let optimizer = sgd_config(&meta.params).init().load_record(record);

        tracing::debug!("Loaded checkpoint '{}' (epoch {})", source.display(), meta.epoch);
        Ok(TrainingState {
            model,
            optimizer,
            params:   meta.params,
            epoch:    meta.epoch,
            accuracy: meta.accuracy,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use burn::backend::{Autodiff, NdArray};
    use burn::module::{AutodiffModule, ParamId};
    use burn::optim::GradientsParams;
    use burn::tensor::{Distribution, Int, Tensor};

    type TB = Autodiff<NdArray>;

    fn params() -> TrainingParams {
        serde_json::from_value(serde_json::json!({
            "batch_size": 4, "lr": 0.01, "momentum": 0.9, "batch_every": 1,
            "n_epochs": 3, "num_workers": 0, "model_name": "tiny", "save_every": 1,
            "reduction_ratio": 2, "kernel_cbam": 3, "use_cbam_block": 1,
            "use_cbam_class": 0, "resnet_depth": 18, "base_width": 4, "num_classes": 4
        }))
        .unwrap()
    }

    /// One SGD step on a fixed batch, the way the training loop takes it.
    fn step(state: &mut TrainingState<TB>) {
        let device = Default::default();
        let images = Tensor::<TB, 1, Int>::arange(0..768, &device)
            .float()
            .mul_scalar(0.37)
            .sin()
            .reshape([4, 3, 8, 8]);
        let targets = Tensor::<TB, 1, Int>::from_ints([0, 1, 2, 3], &device);

        let (loss, _) = state.model.forward_classification(images, targets);
        let grads = GradientsParams::from_grads(loss.backward(), &state.model);
        state.model = state.optimizer.step(state.params.lr, state.model.clone(), grads);
    }

    fn momentum_keys(state: &TrainingState<TB>) -> HashSet<ParamId> {
        state.optimizer.to_record().into_keys().collect()
    }

    #[test]
    fn test_destinations() {
        let dir = tempfile::tempdir().unwrap();
        let m = CheckpointManager::new(dir.path(), "resnet18").unwrap();
        assert!(dir.path().join("resnet18").is_dir());
        assert_eq!(m.destination(4, false), dir.path().join("resnet18").join("epoch_4"));
        assert_eq!(m.destination(4, true), dir.path().join("resnet18").join("best"));
    }

    #[test]
    fn test_save_then_load_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let m = CheckpointManager::new(dir.path(), "tiny").unwrap();

        let mut state = TrainingState::<TB>::fresh(params(), &device).unwrap();
        state.epoch = 3;
        state.accuracy = Some(0.25);
        CheckpointStore::<TB>::save(&m, &state, 2, false).unwrap();

        let dest = m.destination(2, false);
        for file in ["model.mpk.gz", "optim.mpk.gz", "state.json"] {
            assert!(dest.join(file).is_file(), "missing {file}");
        }

        let loaded: TrainingState<TB> = m.load(&dest, &device).unwrap();
        assert_eq!(loaded.epoch, 3);
        assert_eq!(loaded.accuracy, Some(0.25));
        assert_eq!(loaded.params, state.params);

        let x = Tensor::<NdArray, 4>::random([2, 3, 8, 8], Distribution::Normal(0.0, 1.0), &device);
        let before = state.model.valid().forward(x.clone());
        let after  = loaded.model.valid().forward(x);
        before.into_data().assert_approx_eq(&after.into_data(), 5);
    }

    #[test]
    fn test_momentum_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let m = CheckpointManager::new(dir.path(), "tiny").unwrap();

        let mut p = params();
        p.lr = 0.1;
        let mut state = TrainingState::<TB>::fresh(p, &device).unwrap();
        step(&mut state);
        state.epoch = 1;

        let keys = momentum_keys(&state);
        assert!(!keys.is_empty());
        CheckpointStore::<TB>::save(&m, &state, 0, false).unwrap();
        let mut loaded: TrainingState<TB> = m.load(&m.destination(0, false), &device).unwrap();
        assert_eq!(momentum_keys(&loaded), keys);

        // Same batch on both: lost buffers would change the second update
        step(&mut state);
        step(&mut loaded);

        let x = Tensor::<NdArray, 4>::random([2, 3, 8, 8], Distribution::Normal(0.0, 1.0), &device);
        let expected = state.model.valid().forward(x.clone());
        let actual   = loaded.model.valid().forward(x);
        expected.into_data().assert_approx_eq(&actual.into_data(), 5);
    }

    #[test]
    fn test_best_and_regular_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let m = CheckpointManager::new(dir.path(), "tiny").unwrap();
        let state = TrainingState::<TB>::fresh(params(), &Default::default()).unwrap();

        CheckpointStore::<TB>::save(&m, &state, 0, true).unwrap();
        CheckpointStore::<TB>::save(&m, &state, 0, false).unwrap();
        assert!(m.destination(0, true).join("state.json").is_file());
        assert!(m.destination(0, false).join("state.json").is_file());
    }

    #[test]
    fn test_missing_source_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let m = CheckpointManager::new(dir.path(), "tiny").unwrap();
        let err = CheckpointStore::<TB>::load(&m, &dir.path().join("nope"), &Default::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }
}
