// ============================================================
// Layer 5 — Convolutional Block Attention Module (CBAM)
// ============================================================
// Gates a feature map [batch, C, H, W] twice, keeping its shape:
//
//   1. Channel gate  [batch, C, 1, 1]
//        pooled = avg_hw(x)            (+ max_hw(x) under AverageMax)
//        gate   = σ( Σ MLP(pooled) )   MLP = Linear(C,C/r) → ReLU → Linear(C/r,C)
//        x      = x * gate
//
//   2. Spatial gate  [batch, 1, H, W]
//        stats  = [mean_c(x), max_c(x)] (mean only under Average)
//        gate   = σ( Conv2d_k×k(stats) )
//        x      = x * gate
//
// Both gates are recomputed on every forward pass; only the
// MLP and the spatial convolution carry parameters.
//
// Reference: Woo et al. (2018) CBAM: Convolutional Block Attention Module

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{TrainError, TrainResult};

/// Which global statistics feed the channel and spatial gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPooling {
    Average,
    AverageMax,
}

impl ChannelPooling {
    pub fn from_max_pool(max_pool: bool) -> Self {
        if max_pool {
            ChannelPooling::AverageMax
        } else {
            ChannelPooling::Average
        }
    }

    /// Number of pooled statistics, i.e. spatial conv input channels
    pub fn statistics(&self) -> usize {
        match self {
            ChannelPooling::Average => 1,
            ChannelPooling::AverageMax => 2,
        }
    }
}

/// Attention hyperparameters independent of the channel count.
#[derive(Config, Debug)]
pub struct AttentionSettings {
    #[config(default = 16)]
    pub reduction_ratio: usize,

    #[config(default = 3)]
    pub kernel_size: usize,

    #[config(default = "ChannelPooling::AverageMax")]
    pub pooling: ChannelPooling,
}

impl AttentionSettings {
    pub fn for_channels(&self, channels: usize) -> CbamConfig {
        CbamConfig::new(channels).with_settings(self.clone())
    }
}

/// One attention block: the channel count it gates plus shared settings.
#[derive(Config, Debug)]
pub struct CbamConfig {
    pub channels: usize,

    #[config(default = "AttentionSettings::new()")]
    pub settings: AttentionSettings,
}

impl CbamConfig {
    /// Bottleneck width: C / r rounded down, never below 1.
    pub fn hidden_width(&self) -> usize {
        (self.channels / self.settings.reduction_ratio.max(1)).max(1)
    }

    pub fn validate(&self) -> TrainResult<()> {
        if self.channels == 0 {
            return Err(TrainError::config("attention block needs at least one channel"));
        }
        if self.settings.reduction_ratio == 0 {
            return Err(TrainError::config("attention reduction ratio must be positive"));
        }
        if self.settings.kernel_size % 2 == 0 {
            return Err(TrainError::config(format!(
                "attention kernel size must be odd, got {}",
                self.settings.kernel_size
            )));
        }
        Ok(())
    }

    /// Fails with a Configuration error before allocating any parameter.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TrainResult<Cbam<B>> {
        self.validate()?;
        let AttentionSettings { kernel_size, pooling, .. } = self.settings;
        let hidden = self.hidden_width();
        let pad    = kernel_size / 2;

        let mlp_in  = LinearConfig::new(self.channels, hidden).init(device);
        let mlp_out = LinearConfig::new(hidden, self.channels).init(device);
        let spatial = Conv2dConfig::new([pooling.statistics(), 1], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .init(device);

        Ok(Cbam { mlp_in, mlp_out, spatial, pooling: Ignored(pooling) })
    }
}

#[derive(Module, Debug)]
pub struct Cbam<B: Backend> {
    pub mlp_in:  Linear<B>,
    pub mlp_out: Linear<B>,
    pub spatial: Conv2d<B>,
    pub pooling: Ignored<ChannelPooling>,
}

impl<B: Backend> Cbam<B> {
    /// x: [batch, C, H, W] → [batch, C, H, W]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let gate = self.channel_gate(x.clone());
        let x    = x * gate;
        let gate = self.spatial_gate(x.clone());
        x * gate
    }

    /// Per-channel weights in (0, 1), shape [batch, C, 1, 1]
    pub fn channel_gate(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, channels, _, _] = x.dims();

        let avg    = x.clone().mean_dim(3).mean_dim(2).reshape([batch, channels]);
        let logits = match self.pooling.0 {
            ChannelPooling::Average => self.mlp(avg),
            ChannelPooling::AverageMax => {
                let max = x.max_dim(3).max_dim(2).reshape([batch, channels]);
                self.mlp(avg) + self.mlp(max)
            }
        };

        sigmoid(logits).reshape([batch, channels, 1, 1])
    }

    /// Per-position weights in (0, 1), shape [batch, 1, H, W]
    pub fn spatial_gate(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mean  = x.clone().mean_dim(1);
        let stats = match self.pooling.0 {
            ChannelPooling::Average => mean,
            ChannelPooling::AverageMax => Tensor::cat(vec![mean, x.max_dim(1)], 1),
        };
        sigmoid(self.spatial.forward(stats))
    }

    fn mlp(&self, pooled: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp_out.forward(relu(self.mlp_in.forward(pooled)))
    }
}
