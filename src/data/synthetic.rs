// ============================================================
// Layer 4 — Synthetic Images
// ============================================================
// Small seeded datasets for smoke runs (`--dataset synthetic`)
// and tests. Item i gets label i % num_classes; its pixels are
// a class-dependent level plus uniform noise, so the classes
// are separable and a few epochs of training move accuracy.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::{ImageDataset, ImageItem, ImageShape};
use crate::domain::error::{TrainError, TrainResult};

pub struct SyntheticImages {
    pub count:       usize,
    pub num_classes: usize,
    pub shape:       ImageShape,
    pub seed:        u64,
}

impl SyntheticImages {
    pub fn generate(&self) -> TrainResult<ImageDataset> {
        if self.num_classes == 0 {
            return Err(TrainError::config("synthetic dataset needs at least one class"));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);

        let items = (0..self.count)
            .map(|i| {
                let label = i % self.num_classes;
                // class levels spread evenly over [-0.5, 0.5]
                let level = if self.num_classes > 1 {
                    label as f32 / (self.num_classes - 1) as f32 - 0.5
                } else {
                    0.0
                };
                let pixels = (0..self.shape.len())
                    .map(|_| level + rng.gen_range(-0.5f32..0.5))
                    .collect();
                ImageItem { pixels, label }
            })
            .collect();

        ImageDataset::new(items, self.shape)
    }
}
