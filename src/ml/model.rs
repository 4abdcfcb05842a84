use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{TrainError, TrainResult};
use crate::domain::params::TrainingParams;
use crate::ml::attention::{AttentionSettings, Cbam, ChannelPooling};
use crate::ml::residual::{ConvNorm, ResidualUnit, ResidualUnitConfig, UnitKind};

pub const STAGES: usize = 4;

/// Supported ResNet depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Depth {
    D18,
    D34,
    D50,
    D101,
    D152,
}

impl TryFrom<usize> for Depth {
    type Error = TrainError;

    fn try_from(k: usize) -> TrainResult<Self> {
        match k {
            18  => Ok(Depth::D18),
            34  => Ok(Depth::D34),
            50  => Ok(Depth::D50),
            101 => Ok(Depth::D101),
            152 => Ok(Depth::D152),
            _ => Err(TrainError::config(format!(
                "resnet_depth {k} is not supported (expected 18, 34, 50, 101 or 152)"
            ))),
        }
    }
}

impl Depth {
    pub fn units_per_stage(&self) -> [usize; STAGES] {
        match self {
            Depth::D18  => [2, 2, 2, 2],
            Depth::D34  => [3, 4, 6, 3],
            Depth::D50  => [3, 4, 6, 3],
            Depth::D101 => [3, 4, 23, 3],
            Depth::D152 => [3, 8, 36, 3],
        }
    }

    pub fn unit_kind(&self) -> UnitKind {
        match self {
            Depth::D18 | Depth::D34 => UnitKind::Basic,
            _ => UnitKind::Bottleneck,
        }
    }

    /// Weighted layers: every main-path conv, the stem and the classifier
    pub fn layers(&self) -> usize {
        let units: usize = self.units_per_stage().iter().sum();
        units * self.unit_kind().main_convs() + 2
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub depth: usize,

    pub attention: AttentionSettings,

    /// CBAM on every unit of stage i when `stage_attention[i]`
    pub stage_attention: Vec<bool>,

    /// CBAM on the pooled embedding, before the classifier
    #[config(default = false)]
    pub classifier_attention: bool,

    #[config(default = 10)]
    pub num_classes: usize,

    #[config(default = 3)]
    pub in_channels: usize,

    #[config(default = 64)]
    pub base_width: usize,
}

impl ResNetConfig {
    /// Maps the training parameters onto a backbone description.
    pub fn from_params(p: &TrainingParams) -> TrainResult<Self> {
        let attention = AttentionSettings::new()
            .with_reduction_ratio(p.reduction_ratio)
            .with_kernel_size(p.kernel_cbam)
            .with_pooling(ChannelPooling::from_max_pool(p.cbam_max_pool.into()));

        Ok(ResNetConfig::new(p.resnet_depth, attention, p.use_cbam_block.resolve(STAGES)?)
            .with_classifier_attention(p.use_cbam_class.into())
            .with_num_classes(p.num_classes)
            .with_base_width(p.base_width))
    }

    /// Builds the backbone. Every structural problem (unsupported depth,
    /// wrong number of stage flags, zero widths, malformed attention
    /// settings) is a Configuration error raised here, before training.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TrainResult<ResNet<B>> {
        let depth = Depth::try_from(self.depth)?;
        if self.stage_attention.len() != STAGES {
            return Err(TrainError::config(format!(
                "expected {STAGES} stage attention flags, got {}",
                self.stage_attention.len()
            )));
        }
        if self.num_classes == 0 || self.in_channels == 0 || self.base_width == 0 {
            return Err(TrainError::config("classes, input channels and base width must be positive"));
        }

        let kind = depth.unit_kind();
        let stem = ConvNorm::new(self.in_channels, self.base_width, 3, 1, device);

        let mut units    = Vec::new();
        let mut channels = self.base_width;
        for (stage, &count) in depth.units_per_stage().iter().enumerate() {
            let width  = self.base_width << stage;
            let stride = if stage == 0 { 1 } else { 2 };
            let attention = self.stage_attention[stage].then(|| self.attention.clone());

            for i in 0..count {
                let unit = ResidualUnitConfig::new(channels, width)
                    .with_stride(if i == 0 { stride } else { 1 })
                    .with_kind(kind)
                    .with_attention(attention.clone());
                channels = unit.out_channels();
                units.push(unit.init(device)?);
            }
        }

        let embedding_attention = if self.classifier_attention {
            Some(self.attention.for_channels(channels).init(device)?)
        } else {
            None
        };

        let head  = LinearConfig::new(channels, self.num_classes).init(device);
        let model = ResNet { stem, units, embedding_attention, head };

        tracing::debug!(
            "Built ResNet-{}: {} weighted layers in {} units, {} attention blocks, embedding width {}",
            self.depth,
            depth.layers(),
            model.units.len(),
            model.attention_blocks(),
            channels
        );
        Ok(model)
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub stem:                ConvNorm<B>,
    pub units:               Vec<ResidualUnit<B>>,
    pub embedding_attention: Option<Cbam<B>>,
    pub head:                Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, C, H, W] → class scores [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = relu(self.stem.forward(images));
        for unit in &self.units {
            x = unit.forward(x);
        }

        let [batch, channels, _, _] = x.dims();
        let pooled = x.mean_dim(3).mean_dim(2); // [batch, channels, 1, 1]
        let pooled = match &self.embedding_attention {
            Some(cbam) => cbam.forward(pooled),
            None => pooled,
        };

        self.head.forward(pooled.reshape([batch, channels]))
    }

    /// Returns (mean cross-entropy, class scores).
    pub fn forward_classification(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }

    /// Number of CBAM blocks, embedding block included
    pub fn attention_blocks(&self) -> usize {
        self.units.iter().filter(|u| u.has_attention()).count()
            + usize::from(self.embedding_attention.is_some())
    }
}
