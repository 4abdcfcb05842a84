// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Writes the run history to CSV files after each epoch, one
// file per series, ready to be plotted:
//
//   <losses>/<model_name>/epoch_losses.csv
//   <losses>/<model_name>/iter_losses.csv
//   <losses>/<model_name>/accuracies.csv
//
// Each file is rewritten in full every epoch, so it always
// holds the cumulative series of the current run.
//
// Example epoch_losses.csv:
//   # Training CE (epoch)
//   nb_epochs,CE loss
//   0,2.104311
//   1,1.787650
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::error::{TrainError, TrainResult};
use crate::domain::metrics::{RunHistory, Series};
use crate::domain::traits::MetricsSink;

/// Writes CSV series under `<losses>/<model_name>/`
pub struct MetricsLogger {
    /// Root losses directory; one sub-directory per model name
    dir: PathBuf,
}

impl MetricsLogger {
    /// Creates the losses directory if it doesn't already exist.
    pub fn new(losses_dir: impl AsRef<Path>) -> TrainResult<Self> {
        let dir = losses_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            TrainError::resource(format!("cannot create metrics directory '{}': {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    /// Path of one series' CSV file
    pub fn csv_path(&self, model_name: &str, series: &str) -> PathBuf {
        self.dir.join(model_name).join(format!("{series}.csv"))
    }

    fn write_series(&self, model_name: &str, series: &Series<'_>) -> std::io::Result<PathBuf> {
        let path = self.csv_path(model_name, series.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut f = fs::File::create(&path)?;
        writeln!(f, "# {}", series.labels.legend)?;
        writeln!(f, "{},{}", series.labels.xlabel, series.labels.ylabel)?;
        for (x, y) in series.values.iter().enumerate() {
            writeln!(f, "{x},{y:.6}")?;
        }
        Ok(path)
    }
}

impl MetricsSink for MetricsLogger {
    fn report(&self, history: &RunHistory, model_name: &str, epoch: usize) -> TrainResult<()> {
        for series in history.series() {
            let path = self.write_series(model_name, &series).map_err(|e| {
                TrainError::resource(format!("cannot write '{}' series: {e}", series.name))
            })?;
            tracing::debug!("Wrote {} points to '{}'", series.values.len(), path.display());
        }
        tracing::debug!("Reported metrics after epoch {}", epoch);
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::EpochMetrics;

    fn history() -> RunHistory {
        let mut h = RunHistory::new();
        h.record(&EpochMetrics::new(0, vec![2.0, 1.0], 0.25).unwrap());
        h.record(&EpochMetrics::new(1, vec![0.5, 0.5], 0.5).unwrap());
        h
    }

    #[test]
    fn test_writes_one_csv_per_series() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.report(&history(), "resnet18", 1).unwrap();

        let epoch = fs::read_to_string(logger.csv_path("resnet18", "epoch_losses")).unwrap();
        assert_eq!(
            epoch,
            "# Training CE (epoch)\nnb_epochs,CE loss\n0,1.500000\n1,0.500000\n"
        );

        let iter = fs::read_to_string(logger.csv_path("resnet18", "iter_losses")).unwrap();
        assert_eq!(iter.lines().count(), 2 + 4);
        assert!(iter.starts_with("# Training CE (batch)\nnb_iterations,CE loss\n"));

        let acc = fs::read_to_string(logger.csv_path("resnet18", "accuracies")).unwrap();
        assert!(acc.ends_with("0,0.250000\n1,0.500000\n"));
    }

    #[test]
    fn test_report_overwrites_previous_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();

        let mut h = RunHistory::new();
        h.record(&EpochMetrics::new(0, vec![1.0], 0.1).unwrap());
        logger.report(&h, "m", 0).unwrap();
        h.record(&EpochMetrics::new(1, vec![0.9], 0.2).unwrap());
        logger.report(&h, "m", 1).unwrap();

        let acc = fs::read_to_string(logger.csv_path("m", "accuracies")).unwrap();
        assert_eq!(acc.lines().count(), 4);
    }
}
