// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure of a run falls in one of three classes.
// All of them are fatal: nothing is retried and nothing
// is swallowed. The CLI turns them into a non-zero exit.
//
//   Configuration        bad parameter file, unsupported depth,
//                        invalid checkpoint path
//   NumericInstability   a non-finite training loss
//   Resource             dataset / output directory unavailable

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("non-finite training loss {loss} at epoch {epoch}, batch {batch}")]
    NumericInstability {
        epoch: usize,
        batch: usize,
        loss:  f64,
    },

    #[error("resource error: {0}")]
    Resource(String),
}

impl TrainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }
}

#[cfg(test)]
impl TrainError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type TrainResult<T> = std::result::Result<T, TrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_descriptive() {
        let e = TrainError::NumericInstability { epoch: 3, batch: 17, loss: f64::NAN };
        let msg = e.to_string();
        assert!(msg.contains("epoch 3"));
        assert!(msg.contains("batch 17"));
        assert!(msg.contains("NaN"));

        let e = TrainError::config("resnet_depth 20 is not supported");
        assert!(e.is_configuration());
        assert_eq!(e.to_string(), "configuration error: resnet_depth 20 is not supported");
    }
}
