// ============================================================
// Layer 4 — Normaliser
// ============================================================
// Maps channel-major pixel bytes to floats:
//
//   x = (byte / 255 - mean[c]) / std[c]
//
// With mean = std = 0.5 on every channel the output lies in
// [-1, 1]. This is the only transform applied to images.

use crate::data::dataset::ImageShape;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    mean: [f32; 3],
    std:  [f32; 3],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { mean: [0.5; 3], std: [0.5; 3] }
    }
}

impl Normalizer {
    /// `raw` is channel-major: every pixel of channel 0, then channel 1, …
    pub fn apply(&self, raw: &[u8], shape: ImageShape) -> Vec<f32> {
        debug_assert_eq!(raw.len(), shape.len());
        let plane = shape.height * shape.width;

        raw.iter()
            .enumerate()
            .map(|(i, &byte)| {
                let c = (i / plane).min(2);
                (byte as f32 / 255.0 - self.mean[c]) / self.std[c]
            })
            .collect()
    }
}
