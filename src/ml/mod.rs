// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All modules, optimisation and evaluation code built on Burn.
// The domain layer stays framework-free; the data layer only
// touches Burn through its Dataset and Batcher traits.
//
// What's in this layer:
//
//   attention.rs   CBAM: channel gate then spatial gate
//   residual.rs    basic / bottleneck residual units with an
//                  optional attention gate on the main branch
//   model.rs       the ResNet backbone (depth 18 to 152),
//                  optional attention on the pooled embedding,
//                  linear classifier
//   state.rs       model + SGD optimiser + params + epoch,
//                  and the CheckpointStore trait persisting it
//   evaluator.rs   test-set accuracy
//   trainer.rs     the epoch loop: train, evaluate, report,
//                  checkpoint, resume
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            He et al. (2016) Deep Residual Learning
//            Woo et al. (2018) CBAM

/// Convolutional block attention module
pub mod attention;

/// Residual units
pub mod residual;

/// ResNet backbone and classifier
pub mod model;

/// Training state and checkpoint store abstraction
pub mod state;

/// Accuracy over a test loader
pub mod evaluator;

/// Full training loop with evaluation and checkpointing
pub mod trainer;
