// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Read project + training parameters  (Layer 3 - domain)
//   Step 2: Seed the backend RNG
//   Step 3: Load train / test images            (Layer 4 - data)
//   Step 4: Build the data loaders              (Layer 4 - data)
//   Step 5: Open checkpoint + metrics outputs   (Layer 6 - infra)
//   Step 6: Resume or start fresh, then train   (Layer 5 - ml)
//
// The backend is a type parameter chosen by the CLI; nothing
// here depends on which one runs.
//
// Reference: Burn Book §5 (Training)

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    cifar::{Cifar10Loader, CIFAR10_SHAPE},
    dataset::ImageDataset,
    synthetic::SyntheticImages,
};
use crate::domain::error::TrainError;
use crate::domain::params::{ProjectParams, TrainingParams};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::trainer::{RunSummary, TrainingLoop};

/// Where the images come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// CIFAR-10 binary batches under `<data_dir>/cifar-10-batches-bin`
    Cifar10,
    /// Seeded random images with CIFAR-10 geometry
    Synthetic { train_items: usize, test_items: usize },
}

// ─── Run Configuration ────────────────────────────────────────────────────────
// Everything the CLI decides. Parameters themselves live in the
// two JSON files so a run can be reproduced from them alone.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_params:  PathBuf,
    pub training_params: PathBuf,
    pub data_dir:        PathBuf,
    pub dataset:         DatasetKind,
}

pub struct TrainUseCase {
    config: RunConfig,
}

impl TrainUseCase {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<RunSummary> {
        let cfg = &self.config;

        // ── Step 1: Parameters ────────────────────────────────────────────────
        let project = read_project(&cfg.project_params)?;
        let training = read_training(&cfg.training_params)?;
        tracing::info!(
            "Run '{}': ResNet-{}, {} epochs, batch size {}",
            training.model_name,
            training.resnet_depth,
            training.n_epochs,
            training.batch_size
        );

        // ── Step 2: Seed ──────────────────────────────────────────────────────
        B::seed(project.random_seed);

        // ── Step 3: Images ────────────────────────────────────────────────────
        let (train_set, test_set) = self.load_datasets(project.random_seed, training.num_classes)?;
        for set in [&train_set, &test_set] {
            if set.label_span() > training.num_classes {
                return Err(TrainError::config(format!(
                    "dataset has labels up to {} but num_classes is {}",
                    set.label_span() - 1,
                    training.num_classes
                ))
                .into());
            }
        }
        tracing::info!(
            "Dataset: {} train, {} test images",
            train_set.item_count(),
            test_set.item_count()
        );

        // ── Step 4: Loaders ───────────────────────────────────────────────────
        // The test loader batches on the inner backend: evaluation
        // runs on model.valid(), without autodiff
        let train_loader = build_loader(
            ImageBatcher::<B>::new(device.clone(), train_set.shape()),
            train_set,
            &training,
            Some(project.random_seed),
        );
        let test_loader = build_loader(
            ImageBatcher::<B::InnerBackend>::new(device.clone(), test_set.shape()),
            test_set,
            &training,
            None,
        );

        // ── Step 5: Outputs ───────────────────────────────────────────────────
        let store = CheckpointManager::new(&project.models_dir, &training.model_name)?;
        let sink  = MetricsLogger::new(&project.losses_dir)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let mut run = TrainingLoop::<B, _, _>::initialize(training, &store, &sink, &device)?;
        let summary = run.run(train_loader.as_ref(), test_loader.as_ref())?;

        tracing::info!(
            "Finished {} epochs, best test accuracy {:.4}",
            summary.epochs_run,
            summary.best_accuracy
        );
        Ok(summary)
    }

    fn load_datasets(&self, seed: u64, num_classes: usize) -> Result<(ImageDataset, ImageDataset)> {
        match self.config.dataset {
            DatasetKind::Cifar10 => {
                let loader = Cifar10Loader::new(&self.config.data_dir);
                Ok((loader.load_train()?, loader.load_test()?))
            }
            DatasetKind::Synthetic { train_items, test_items } => {
                let images = |count, seed| SyntheticImages {
                    count,
                    num_classes,
                    shape: CIFAR10_SHAPE,
                    seed,
                };
                Ok((
                    images(train_items, seed).generate()?,
                    images(test_items, seed.wrapping_add(1)).generate()?,
                ))
            }
        }
    }
}

fn read_project(path: &Path) -> Result<ProjectParams> {
    let json = fs::read_to_string(path)
        .map_err(|e| TrainError::config(format!("cannot read '{}': {e}", path.display())))?;
    ProjectParams::from_json(&json)
        .with_context(|| format!("Invalid project parameters in '{}'", path.display()))
}

fn read_training(path: &Path) -> Result<TrainingParams> {
    let json = fs::read_to_string(path)
        .map_err(|e| TrainError::config(format!("cannot read '{}': {e}", path.display())))?;
    TrainingParams::from_json(&json)
        .with_context(|| format!("Invalid training parameters in '{}'", path.display()))
}

/// Shuffles with `shuffle_seed` when given; worker threads only when asked for.
fn build_loader<B: Backend>(
    batcher:      ImageBatcher<B>,
    dataset:      ImageDataset,
    params:       &TrainingParams,
    shuffle_seed: Option<u64>,
) -> Arc<dyn DataLoader<ImageBatch<B>>> {
    let mut builder = DataLoaderBuilder::new(batcher).batch_size(params.batch_size);
    if let Some(seed) = shuffle_seed {
        builder = builder.shuffle(seed);
    }
    if params.num_workers > 0 {
        builder = builder.num_workers(params.num_workers);
    }
    builder.build(dataset)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TB = Autodiff<NdArray>;

    fn write_params(dir: &Path, n_epochs: usize, load_model: &str) -> RunConfig {
        let project = dir.join("project.json");
        let training = dir.join("training.json");
        fs::write(
            &project,
            serde_json::json!({
                "random_seed": 42,
                "models": dir.join("models"),
                "losses": dir.join("losses"),
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            &training,
            serde_json::json!({
                "batch_size": 4, "lr": 0.01, "momentum": 0.9, "batch_every": 2,
                "n_epochs": n_epochs, "num_workers": 0, "model_name": "smoke",
                "load_model": load_model, "save_every": 1, "reduction_ratio": 2,
                "kernel_cbam": 3, "use_cbam_block": 1, "use_cbam_class": 1,
                "resnet_depth": 18, "base_width": 4
            })
            .to_string(),
        )
        .unwrap();
        RunConfig {
            project_params:  project,
            training_params: training,
            data_dir:        dir.join("data"),
            dataset:         DatasetKind::Synthetic { train_items: 8, test_items: 4 },
        }
    }

    #[test]
    fn test_synthetic_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_params(dir.path(), 1, "");

        let summary = TrainUseCase::new(cfg).execute::<TB>(Default::default()).unwrap();
        assert_eq!(summary.epochs_run, 1);

        assert!(dir.path().join("models/smoke/epoch_0/state.json").is_file());
        for series in ["epoch_losses", "iter_losses", "accuracies"] {
            assert!(dir.path().join(format!("losses/smoke/{series}.csv")).is_file());
        }
    }

    #[test]
    fn test_resume_extends_run() {
        let dir = tempfile::tempdir().unwrap();
        TrainUseCase::new(write_params(dir.path(), 1, ""))
            .execute::<TB>(Default::default())
            .unwrap();

        let checkpoint = dir.path().join("models/smoke/epoch_0");
        let cfg = write_params(dir.path(), 2, checkpoint.to_str().unwrap());
        let summary = TrainUseCase::new(cfg).execute::<TB>(Default::default()).unwrap();

        assert_eq!(summary.epochs_run, 1);
        assert_eq!(summary.final_epoch, Some(1));
        assert!(dir.path().join("models/smoke/epoch_1/state.json").is_file());
    }

    #[test]
    fn test_missing_cifar_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = write_params(dir.path(), 1, "");
        cfg.dataset = DatasetKind::Cifar10;

        let err = TrainUseCase::new(cfg).execute::<TB>(Default::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrainError>(), Some(TrainError::Resource(_))));
    }

    #[test]
    fn test_missing_parameter_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = write_params(dir.path(), 1, "");
        cfg.training_params = dir.path().join("absent.json");

        let err = TrainUseCase::new(cfg).execute::<TB>(Default::default()).unwrap_err();
        assert!(err.downcast_ref::<TrainError>().is_some_and(TrainError::is_configuration));
    }
}
