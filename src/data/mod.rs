// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From raw bytes on disk to tensor batches:
//
//   cifar-10-batches-bin/*.bin   (or SyntheticImages)
//       │
//       ▼
//   Cifar10Loader     → parses fixed-size records
//       │
//       ▼
//   Normalizer        → bytes to floats in [-1, 1]
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → stacks items into [N, C, H, W] tensors
//       │
//       ▼
//   DataLoader        → shuffles / prefetches, feeds the loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the CIFAR-10 binary distribution
pub mod cifar;

/// Per-channel normalisation of raw pixel bytes
pub mod normalize;

/// Seeded random images for smoke runs and tests
pub mod synthetic;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
