// ============================================================
// Layer 5 — Residual Unit
// ============================================================
//   main = conv-bn → ReLU → … → conv-bn     (2 stages basic, 3 bottleneck)
//   main = CBAM(main)                       (only when attention is on)
//   skip = x | conv1×1-bn(x)                (projection when shape changes)
//   out  = ReLU(main + skip)
//
// Attention acts on the main branch only, before the addition.
//
// Reference: He et al. (2016) Deep Residual Learning

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{TrainError, TrainResult};
use crate::ml::attention::{AttentionSettings, Cbam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// 3×3 → 3×3
    Basic,
    /// 1×1 → 3×3 → 1×1, output width × 4
    Bottleneck,
}

impl UnitKind {
    pub fn expansion(&self) -> usize {
        match self {
            UnitKind::Basic => 1,
            UnitKind::Bottleneck => 4,
        }
    }

    /// Convolutions on the main path
    pub fn main_convs(&self) -> usize {
        match self {
            UnitKind::Basic => 2,
            UnitKind::Bottleneck => 3,
        }
    }
}

// ─── ConvNorm ─────────────────────────────────────────────────────────────────
/// Bias-free convolution followed by batch normalisation.
#[derive(Module, Debug)]
pub struct ConvNorm<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvNorm<B> {
    pub fn new(
        in_channels:  usize,
        out_channels: usize,
        kernel:       usize,
        stride:       usize,
        device:       &B::Device,
    ) -> Self {
        let pad  = kernel / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .with_bias(false)
            .init(device);
        let norm = BatchNormConfig::new(out_channels).init(device);
        Self { conv, norm }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(x))
    }
}

// ─── ResidualUnitConfig ───────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ResidualUnitConfig {
    pub in_channels: usize,

    /// Inner width; the unit outputs `width * kind.expansion()` channels
    pub width: usize,

    #[config(default = 1)]
    pub stride: usize,

    #[config(default = "UnitKind::Basic")]
    pub kind: UnitKind,

    /// Gate the main path with CBAM when present
    pub attention: Option<AttentionSettings>,
}

impl ResidualUnitConfig {
    pub fn out_channels(&self) -> usize {
        self.width * self.kind.expansion()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TrainResult<ResidualUnit<B>> {
        if self.in_channels == 0 || self.width == 0 || self.stride == 0 {
            return Err(TrainError::config(format!(
                "residual unit needs positive channels and stride, got in={} width={} stride={}",
                self.in_channels, self.width, self.stride
            )));
        }
        let (cin, w, s, out) = (self.in_channels, self.width, self.stride, self.out_channels());

        let main = match self.kind {
            UnitKind::Basic => vec![
                ConvNorm::new(cin, w, 3, s, device),
                ConvNorm::new(w, w, 3, 1, device),
            ],
            UnitKind::Bottleneck => vec![
                ConvNorm::new(cin, w, 1, 1, device),
                ConvNorm::new(w, w, 3, s, device),
                ConvNorm::new(w, out, 1, 1, device),
            ],
        };

        let attention = match &self.attention {
            Some(settings) => Some(settings.for_channels(out).init(device)?),
            None => None,
        };

        let skip = (s != 1 || cin != out).then(|| ConvNorm::new(cin, out, 1, s, device));

        Ok(ResidualUnit { main, attention, skip })
    }
}

// ─── ResidualUnit ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResidualUnit<B: Backend> {
    pub main:      Vec<ConvNorm<B>>,
    pub attention: Option<Cbam<B>>,
    pub skip:      Option<ConvNorm<B>>,
}

impl<B: Backend> ResidualUnit<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward_gated(x, |main| match &self.attention {
            Some(cbam) => cbam.forward(main),
            None => main,
        })
    }

    /// Forward pass with an explicit gate applied to the main branch.
    pub fn forward_gated<F>(&self, x: Tensor<B, 4>, gate: F) -> Tensor<B, 4>
    where
        F: FnOnce(Tensor<B, 4>) -> Tensor<B, 4>,
    {
        let skip = match &self.skip {
            Some(projection) => projection.forward(x.clone()),
            None => x.clone(),
        };

        let last = self.main.len() - 1;
        let mut out = x;
        for (i, stage) in self.main.iter().enumerate() {
            out = stage.forward(out);
            if i < last {
                out = relu(out);
            }
        }

        relu(gate(out) + skip)
    }

    pub fn has_attention(&self) -> bool {
        self.attention.is_some()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TB = NdArray;

    fn input(shape: [usize; 4]) -> Tensor<TB, 4> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_identity_skip_keeps_shape() {
        let unit = ResidualUnitConfig::new(8, 8).init::<TB>(&Default::default()).unwrap();
        assert!(unit.skip.is_none());
        assert_eq!(unit.forward(input([2, 8, 6, 6])).dims(), [2, 8, 6, 6]);
    }

    #[test]
    fn test_projection_on_stride_and_width_change() {
        let unit = ResidualUnitConfig::new(8, 16)
            .with_stride(2)
            .init::<TB>(&Default::default())
            .unwrap();
        assert!(unit.skip.is_some());
        assert_eq!(unit.forward(input([2, 8, 6, 6])).dims(), [2, 16, 3, 3]);
    }

    #[test]
    fn test_bottleneck_expands_width() {
        let cfg = ResidualUnitConfig::new(16, 4).with_kind(UnitKind::Bottleneck);
        assert_eq!(cfg.out_channels(), 16);
        let unit = cfg.init::<TB>(&Default::default()).unwrap();
        assert_eq!(unit.main.len(), 3);
        // 16 in, 16 out, stride 1: identity skip
        assert!(unit.skip.is_none());
        assert_eq!(unit.forward(input([1, 16, 4, 4])).dims(), [1, 16, 4, 4]);
    }

    #[test]
    fn test_disabled_attention_equals_identity_gate() {
        let device = Default::default();
        let with_attention = ResidualUnitConfig::new(8, 16)
            .with_stride(2)
            .with_attention(Some(AttentionSettings::new().with_reduction_ratio(4)))
            .init::<TB>(&device)
            .unwrap();

        // Same parameters, attention removed
        let without_attention = ResidualUnit {
            attention: None,
            ..with_attention.clone()
        };

        let x = input([2, 8, 6, 6]);
        let identity_gated = with_attention.forward_gated(x.clone(), |main| main);
        let plain = without_attention.forward(x.clone());

        identity_gated.into_data().assert_approx_eq(&plain.clone().into_data(), 5);

        // and the real gate does change the output
        let gated = with_attention.forward(x);
        let diff = (gated - plain).abs().sum().into_scalar().elem::<f32>();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_attention_block_sized_to_unit_output() {
        let unit = ResidualUnitConfig::new(16, 4)
            .with_kind(UnitKind::Bottleneck)
            .with_attention(Some(AttentionSettings::new()))
            .init::<TB>(&Default::default())
            .unwrap();
        let cbam = unit.attention.as_ref().unwrap();
        // 16 output channels, ratio 16 → hidden width 1
        assert_eq!(cbam.mlp_in.weight.val().dims(), [16, 1]);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let err = ResidualUnitConfig::new(8, 8)
            .with_stride(0)
            .init::<TB>(&Default::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
