// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe a training run:
// the parameter files, the metric histories, the
// best-model / checkpoint schedule and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums and traits
//
// Everything here is unit-testable without a tensor backend.

/// Error taxonomy shared by every layer below the CLI
pub mod error;

/// Project-level and training-level parameter sets
pub mod params;

/// Per-epoch metrics and the cumulative run history
pub mod metrics;

/// Best-model marker and checkpoint trigger policy
pub mod schedule;

/// Reporting abstraction implemented by the infra layer
pub mod traits;
