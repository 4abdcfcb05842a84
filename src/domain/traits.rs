// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Collaborators the training loop talks to without knowing
// their implementation. The checkpoint store is declared in
// the ML layer because its signature carries Burn types;
// this one is framework-free.
//
// Implementations:
//   - MetricsLogger (infra) → CSV series on disk
//   - tests                 → in-memory recorders

use crate::domain::error::TrainResult;
use crate::domain::metrics::RunHistory;

// ─── MetricsSink ──────────────────────────────────────────────────────────────
/// Receives the cumulative run history after every epoch.
/// Pure reporting: nothing flows back into the training loop.
pub trait MetricsSink {
    fn report(&self, history: &RunHistory, model_name: &str, epoch: usize) -> TrainResult<()>;
}
