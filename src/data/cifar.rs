// ============================================================
// Layer 4 — CIFAR-10 Loader
// ============================================================
// Reads the binary distribution of CIFAR-10:
//
//   <data_dir>/cifar-10-batches-bin/
//     data_batch_1.bin … data_batch_5.bin   ← 50 000 training images
//     test_batch.bin                         ← 10 000 test images
//
// Every file is a sequence of fixed-size records:
//
//   [label: 1 byte][red: 1024][green: 1024][blue: 1024]
//
// Each colour plane is 32×32 in row-major order, which is
// exactly the channel-major layout the batcher expects.
//
// The files are not downloaded; a missing file is fatal.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::dataset::{ImageDataset, ImageItem, ImageShape};
use crate::data::normalize::Normalizer;
use crate::domain::error::{TrainError, TrainResult};

pub const CIFAR10_SHAPE: ImageShape = ImageShape::new(3, 32, 32);
pub const CIFAR10_CLASSES: usize = 10;

const BATCH_DIR: &str = "cifar-10-batches-bin";
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

/// Loads CIFAR-10 splits from a data directory.
pub struct Cifar10Loader {
    root:       PathBuf,
    normalizer: Normalizer,
}

impl Cifar10Loader {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root:       data_dir.as_ref().join(BATCH_DIR),
            normalizer: Normalizer::default(),
        }
    }

    pub fn load_train(&self) -> TrainResult<ImageDataset> {
        let mut items = Vec::with_capacity(50_000);
        for file in TRAIN_FILES {
            items.extend(self.load_file(file)?);
        }
        tracing::info!("Loaded {} CIFAR-10 training images", items.len());
        ImageDataset::new(items, CIFAR10_SHAPE)
    }

    pub fn load_test(&self) -> TrainResult<ImageDataset> {
        let items = self.load_file(TEST_FILE)?;
        tracing::info!("Loaded {} CIFAR-10 test images", items.len());
        ImageDataset::new(items, CIFAR10_SHAPE)
    }

    fn load_file(&self, name: &str) -> TrainResult<Vec<ImageItem>> {
        let path = self.root.join(name);
        let bytes = fs::read(&path).map_err(|e| {
            TrainError::resource(format!(
                "cannot read CIFAR-10 file '{}': {e}. Expected the binary distribution under '{}'",
                path.display(),
                self.root.display()
            ))
        })?;
        tracing::debug!("Read {} bytes from '{}'", bytes.len(), path.display());

        parse_records(&bytes, &self.normalizer)
            .map_err(|e| TrainError::resource(format!("'{}': {e}", path.display())))
    }
}

/// Split a CIFAR-10 binary blob into normalised items.
pub fn parse_records(bytes: &[u8], normalizer: &Normalizer) -> TrainResult<Vec<ImageItem>> {
    let record_len = 1 + CIFAR10_SHAPE.len();
    if bytes.len() % record_len != 0 {
        return Err(TrainError::resource(format!(
            "{} bytes is not a whole number of {record_len}-byte records",
            bytes.len()
        )));
    }

    bytes
        .chunks_exact(record_len)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0] as usize;
            if label >= CIFAR10_CLASSES {
                return Err(TrainError::resource(format!("record {i} has label {label}")));
            }
            Ok(ImageItem {
                pixels: normalizer.apply(&record[1..], CIFAR10_SHAPE),
                label,
            })
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut r = vec![label];
        r.extend(std::iter::repeat(fill).take(CIFAR10_SHAPE.len()));
        r
    }

    #[test]
    fn test_parses_consecutive_records() {
        let mut bytes = record(3, 255);
        bytes.extend(record(7, 0));

        let items = parse_records(&bytes, &Normalizer::default()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, 3);
        assert_eq!(items[1].label, 7);
        assert!(items[0].pixels.iter().all(|&p| p == 1.0));
        assert!(items[1].pixels.iter().all(|&p| p == -1.0));
    }

    #[test]
    fn test_truncated_blob_is_rejected() {
        let mut bytes = record(1, 10);
        bytes.pop();
        assert!(parse_records(&bytes, &Normalizer::default()).is_err());
    }

    #[test]
    fn test_out_of_range_label_is_rejected() {
        let bytes = record(10, 0);
        assert!(parse_records(&bytes, &Normalizer::default()).is_err());
    }

    #[test]
    fn test_missing_directory_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Cifar10Loader::new(dir.path()).load_test().err().unwrap();
        assert!(matches!(err, TrainError::Resource(_)));
    }

    #[test]
    fn test_loads_test_split_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let batches = dir.path().join(BATCH_DIR);
        fs::create_dir_all(&batches).unwrap();
        let mut bytes = record(0, 128);
        bytes.extend(record(9, 64));
        fs::write(batches.join(TEST_FILE), bytes).unwrap();

        let ds = Cifar10Loader::new(dir.path()).load_test().unwrap();
        assert_eq!(ds.item_count(), 2);
        assert_eq!(ds.shape(), CIFAR10_SHAPE);
    }
}
