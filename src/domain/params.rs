// ============================================================
// Layer 3 — Parameter Sets
// ============================================================
// Two JSON parameter files drive a run:
//
//   parameters/project.json     seed and output directories
//   parameters/training.json    optimiser, schedule and model shape
//
// Example training.json:
//   {
//     "batch_size": 4, "lr": 0.001, "momentum": 0.9,
//     "batch_every": 100, "n_epochs": 15, "num_workers": 2,
//     "model_name": "resnet18_cifar10_cbam_block",
//     "load_model": "", "save_every": 1,
//     "reduction_ratio": 16, "kernel_cbam": 3,
//     "use_cbam_block": 1, "use_cbam_class": 0,
//     "resnet_depth": 18
//   }
//
// Flags accept either JSON booleans or the integers 0 / 1.
// `use_cbam_block` is either one flag for every stage or
// a list with one flag per stage.
//
// Both sets are parsed and validated once, before training
// starts. Any problem is a configuration error.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::domain::error::{TrainError, TrainResult};

// ─── Flag ─────────────────────────────────────────────────────────────────────
/// A boolean that also deserializes from 0 / 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Flag(pub bool);

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(Flag(b)),
            Raw::Int(0)  => Ok(Flag(false)),
            Raw::Int(1)  => Ok(Flag(true)),
            Raw::Int(n)  => Err(D::Error::custom(format!("expected a flag (0 or 1), got {n}"))),
        }
    }
}

impl From<Flag> for bool {
    fn from(f: Flag) -> bool {
        f.0
    }
}

// ─── StageFlags ───────────────────────────────────────────────────────────────
/// Attention toggles for the residual stages of the backbone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageFlags {
    Uniform(Flag),
    PerStage(Vec<Flag>),
}

impl StageFlags {
    /// Expand to exactly one boolean per stage.
    pub fn resolve(&self, stages: usize) -> TrainResult<Vec<bool>> {
        match self {
            StageFlags::Uniform(flag) => Ok(vec![flag.0; stages]),
            StageFlags::PerStage(flags) if flags.len() == stages => {
                Ok(flags.iter().map(|f| f.0).collect())
            }
            StageFlags::PerStage(flags) => Err(TrainError::config(format!(
                "use_cbam_block lists {} flags but the backbone has {} stages",
                flags.len(),
                stages
            ))),
        }
    }
}

// ─── ProjectParams ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectParams {
    pub random_seed: u64,

    /// Directory receiving checkpoints
    #[serde(rename = "models")]
    pub models_dir: String,

    /// Directory receiving the loss / accuracy series
    #[serde(rename = "losses")]
    pub losses_dir: String,
}

impl ProjectParams {
    pub fn from_json(json: &str) -> TrainResult<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| TrainError::config(format!("invalid project parameters: {e}")))?;
        if params.models_dir.trim().is_empty() || params.losses_dir.trim().is_empty() {
            return Err(TrainError::config("project parameters need non-empty 'models' and 'losses' directories"));
        }
        Ok(params)
    }
}

// ─── TrainingParams ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub batch_size:      usize,
    pub lr:              f64,
    pub momentum:        f64,
    /// Log the running loss every `batch_every` batches
    pub batch_every:     usize,
    /// Exclusive upper bound of the epoch index
    pub n_epochs:        usize,
    pub num_workers:     usize,
    pub model_name:      String,
    /// Checkpoint directory to resume from; empty for a fresh start
    #[serde(default)]
    pub load_model:      String,
    pub save_every:      usize,
    pub reduction_ratio: usize,
    pub kernel_cbam:     usize,
    pub use_cbam_block:  StageFlags,
    pub use_cbam_class:  Flag,
    pub resnet_depth:    usize,
    /// Channel attention pools with max as well as average
    #[serde(default = "default_cbam_max_pool")]
    pub cbam_max_pool:   Flag,
    #[serde(default = "default_base_width")]
    pub base_width:      usize,
    #[serde(default = "default_num_classes")]
    pub num_classes:     usize,
}

fn default_cbam_max_pool() -> Flag {
    Flag(true)
}

fn default_base_width() -> usize {
    64
}

fn default_num_classes() -> usize {
    10
}

/// How a run begins: from a stored checkpoint or from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStart {
    Resuming { checkpoint: PathBuf },
    FreshStart,
}

impl TrainingParams {
    pub fn from_json(json: &str) -> TrainResult<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| TrainError::config(format!("invalid training parameters: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Range checks that serde cannot express.
    pub fn validate(&self) -> TrainResult<()> {
        let positive = [
            ("batch_size",      self.batch_size),
            ("batch_every",     self.batch_every),
            ("save_every",      self.save_every),
            ("reduction_ratio", self.reduction_ratio),
            ("kernel_cbam",     self.kernel_cbam),
            ("base_width",      self.base_width),
            ("num_classes",     self.num_classes),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(TrainError::config(format!("'{key}' must be greater than zero")));
            }
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(TrainError::config(format!("'lr' must be a positive number, got {}", self.lr)));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(TrainError::config(format!("'momentum' must lie in [0, 1), got {}", self.momentum)));
        }
        if self.model_name.trim().is_empty()
            || self.model_name.contains(['/', '\\'])
        {
            return Err(TrainError::config(format!(
                "'model_name' must be a plain non-empty name, got '{}'",
                self.model_name
            )));
        }
        Ok(())
    }

    pub fn run_start(&self) -> RunStart {
        let path = self.load_model.trim();
        if path.is_empty() {
            RunStart::FreshStart
        } else {
            RunStart::Resuming { checkpoint: PathBuf::from(path) }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const TRAINING_JSON: &str = r#"{
        "batch_size": 4,
        "lr": 0.001,
        "momentum": 0.9,
        "batch_every": 100,
        "n_epochs": 15,
        "num_workers": 2,
        "model_name": "resnet18_cifar10_cbam_block",
        "load_model": "",
        "save_every": 1,
        "reduction_ratio": 16,
        "kernel_cbam": 3,
        "use_cbam_block": 1,
        "use_cbam_class": 0,
        "resnet_depth": 18
    }"#;

    #[test]
    fn test_parses_integer_flags_and_defaults() {
        let p = TrainingParams::from_json(TRAINING_JSON).unwrap();
        assert_eq!(p.use_cbam_block, StageFlags::Uniform(Flag(true)));
        assert_eq!(p.use_cbam_class, Flag(false));
        assert_eq!(p.cbam_max_pool, Flag(true));
        assert_eq!(p.base_width, 64);
        assert_eq!(p.num_classes, 10);
        assert_eq!(p.run_start(), RunStart::FreshStart);
    }

    #[test]
    fn test_per_stage_flags() {
        let json = TRAINING_JSON.replace(
            r#""use_cbam_block": 1"#,
            r#""use_cbam_block": [0, 1, true, false]"#,
        );
        let p = TrainingParams::from_json(&json).unwrap();
        assert_eq!(p.use_cbam_block.resolve(4).unwrap(), vec![false, true, true, false]);
        assert!(p.use_cbam_block.resolve(3).unwrap_err().is_configuration());
    }

    #[test]
    fn test_flag_rejects_other_integers() {
        let json = TRAINING_JSON.replace(r#""use_cbam_class": 0"#, r#""use_cbam_class": 2"#);
        assert!(TrainingParams::from_json(&json).unwrap_err().is_configuration());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let json = TRAINING_JSON.replace(r#""resnet_depth": 18"#, r#""unused": 18"#);
        let err = TrainingParams::from_json(&json).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("resnet_depth"));
    }

    #[test]
    fn test_zero_save_every_rejected() {
        let json = TRAINING_JSON.replace(r#""save_every": 1"#, r#""save_every": 0"#);
        assert!(TrainingParams::from_json(&json).unwrap_err().is_configuration());
    }

    #[test]
    fn test_load_model_selects_resume() {
        let json = TRAINING_JSON.replace(
            r#""load_model": """#,
            r#""load_model": "models/run/epoch_3""#,
        );
        let p = TrainingParams::from_json(&json).unwrap();
        assert_eq!(
            p.run_start(),
            RunStart::Resuming { checkpoint: PathBuf::from("models/run/epoch_3") }
        );
    }

    #[test]
    fn test_project_params_use_short_keys() {
        let p = ProjectParams::from_json(
            r#"{"random_seed": 42, "models": "models/", "losses": "losses/"}"#,
        )
        .unwrap();
        assert_eq!(p.random_seed, 42);
        assert_eq!(p.models_dir, "models/");
        assert_eq!(p.losses_dir, "losses/");
    }

    #[test]
    fn test_params_round_trip_through_json() {
        let p = TrainingParams::from_json(TRAINING_JSON).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(TrainingParams::from_json(&json).unwrap(), p);
    }
}
