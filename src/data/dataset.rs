use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::error::{TrainError, TrainResult};

/// Channel-major image geometry shared by every item of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
}

impl ImageShape {
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self { channels, height, width }
    }

    /// Number of values in one image
    pub const fn len(&self) -> usize {
        self.channels * self.height * self.width
    }
}

/// One normalised image and its class label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageItem {
    /// `shape.len()` floats, channel-major
    pub pixels: Vec<f32>,
    pub label:  usize,
}

/// In-memory labelled images of one geometry, served to Burn's data
/// loaders through the `Dataset` trait.
pub struct ImageDataset {
    items: Vec<ImageItem>,
    /// Geometry every item was checked against on construction
    shape: ImageShape,
}

impl ImageDataset {
    /// Rejects any item whose pixel count does not match `shape`.
    pub fn new(items: Vec<ImageItem>, shape: ImageShape) -> TrainResult<Self> {
        if let Some((i, item)) = items.iter().enumerate().find(|(_, it)| it.pixels.len() != shape.len()) {
            return Err(TrainError::resource(format!(
                "image {i} has {} values, expected {} for shape {:?}",
                item.pixels.len(),
                shape.len(),
                shape
            )));
        }
        Ok(Self { items, shape })
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// One past the largest label, i.e. the class count the data implies
    pub fn label_span(&self) -> usize {
        self.items.iter().map(|it| it.label + 1).max().unwrap_or(0)
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
