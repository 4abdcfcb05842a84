// ============================================================
// Layer 5 — Evaluation
// ============================================================
// Classification accuracy of a model over a whole test loader.
//
//   prediction = argmax over class scores
//   accuracy   = correct / total
//
// The caller passes the inference-mode model (`model.valid()`),
// so batch norm uses its running statistics and repeated calls
// on the same data give the same result.

use burn::{data::dataloader::DataLoader, prelude::*};

use crate::data::batcher::ImageBatch;
use crate::domain::error::{TrainError, TrainResult};
use crate::ml::model::ResNet;

pub fn evaluate<B: Backend>(
    model:  &ResNet<B>,
    loader: &dyn DataLoader<ImageBatch<B>>,
) -> TrainResult<f64> {
    let mut correct = 0usize;
    let mut total   = 0usize;

    for batch in loader.iter() {
        total += batch.targets.dims()[0];

        // argmax(1) returns shape [batch, 1]; flatten to [batch]
        let predictions = model.forward(batch.images).argmax(1).flatten::<1>(0, 1);
        let hits: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        correct += hits as usize;
    }

    if total == 0 {
        return Err(TrainError::resource("test set yielded no samples"));
    }

    tracing::debug!("Evaluated {} test samples, {} correct", total, correct);
    Ok(correct as f64 / total as f64)
}
