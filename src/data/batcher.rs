// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageItem>
// into one ImageBatch:
//
//   Input:  N items, each with C*H*W channel-major floats
//   Output: images  [N, C, H, W]
//           targets [N]
//
// The pixels of all items are concatenated and reshaped, so
// item k occupies images[k, .., .., ..].
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::{ImageItem, ImageShape};

// ─── ImageBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Class indices, shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
    shape:  ImageShape,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, shape: ImageShape) -> Self {
        Self { device, shape }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let ImageShape { channels, height, width } = self.shape;

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items.iter().map(|item| item.label as i32).collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, channels, height, width]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}
