// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Run arguments and their conversion into the application
// layer's RunConfig. Hyperparameters are not flags: they come
// from the parameter files so every run is reproducible.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::application::train_use_case::{DatasetKind, RunConfig};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetArg {
    /// CIFAR-10 binary batches (not downloaded)
    Cifar10,
    /// Seeded random images, for smoke runs
    Synthetic,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    /// GPU through wgpu
    Wgpu,
    /// CPU through ndarray
    Ndarray,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project parameters: random_seed, models and losses directories
    #[arg(long, default_value = "parameters/project.json")]
    pub project: PathBuf,

    /// Training parameters: optimiser, schedule and model shape
    #[arg(long, default_value = "parameters/training.json")]
    pub training: PathBuf,

    /// Directory holding cifar-10-batches-bin/
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = DatasetArg::Cifar10)]
    pub dataset: DatasetArg,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,

    /// Training images generated with --dataset synthetic
    #[arg(long, default_value_t = 512)]
    pub synthetic_train: usize,

    /// Test images generated with --dataset synthetic
    #[arg(long, default_value_t = 128)]
    pub synthetic_test: usize,
}

/// The application layer never sees clap types.
impl From<&RunArgs> for RunConfig {
    fn from(a: &RunArgs) -> Self {
        let dataset = match a.dataset {
            DatasetArg::Cifar10 => DatasetKind::Cifar10,
            DatasetArg::Synthetic => DatasetKind::Synthetic {
                train_items: a.synthetic_train,
                test_items:  a.synthetic_test,
            },
        };
        RunConfig {
            project_params:  a.project.clone(),
            training_params: a.training.clone(),
            data_dir:        a.data_dir.clone(),
            dataset,
        }
    }
}
