// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for user interaction, parsed with `clap`.
// One invocation is one training run; the only decision made
// here is which Burn backend executes it. All work is
// delegated to Layer 2 (application).
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod args;

use anyhow::Result;
use burn::backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use clap::Parser;

use crate::application::train_use_case::TrainUseCase;
use args::{BackendArg, RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "cbam-resnet",
    version,
    about = "Train a ResNet with convolutional block attention on CIFAR-10."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: RunArgs,
}

impl Cli {
    /// Picks the backend and hands off to the use case.
    pub fn run(self) -> Result<()> {
        let use_case = TrainUseCase::new((&self.args).into());

        let summary = match self.args.backend {
            BackendArg::Wgpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                use_case.execute::<Autodiff<Wgpu>>(device)?
            }
            BackendArg::Ndarray => {
                let device = NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                use_case.execute::<Autodiff<NdArray>>(device)?
            }
        };

        println!(
            "Training complete: {} epochs, best test accuracy {}",
            summary.epochs_run, summary.best_accuracy
        );
        Ok(())
    }
}
