// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem implementations of the collaborators the
// training loop talks to through traits:
//
//   checkpoint.rs   CheckpointStore on disk
//                   model / optimiser records plus a JSON
//                   sidecar with epoch and parameters
//
//   metrics.rs      MetricsSink writing one CSV per series
//                   (epoch losses, batch losses, accuracies)
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Checkpoint saving and loading
pub mod checkpoint;

/// Loss and accuracy series as CSV
pub mod metrics;
