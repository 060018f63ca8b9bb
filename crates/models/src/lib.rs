//! Burn CNN for waste-image classification.
//!
//! `TrashCnn` is a small Sequential-style network: three valid 3x3 convolutions with
//! ReLU (the first two followed by 2x2 max pooling), global average pooling, a hidden
//! dense layer, and a class head. It is a pure Burn `Module`; loading checkpoints and
//! preprocessing images live in the `training` and `inference` crates.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::fmt::Write as _;

const KERNEL: usize = 3;
const CONV_CHANNELS: [usize; 3] = [32, 64, 128];
const HIDDEN: usize = 128;

#[derive(Debug, Clone)]
pub struct TrashCnnConfig {
    pub num_classes: usize,
    /// Square input side length.
    pub image_size: usize,
    pub channels: usize,
}

impl Default for TrashCnnConfig {
    fn default() -> Self {
        Self {
            num_classes: 6,
            image_size: 128,
            channels: 3,
        }
    }
}

/// One row of a layer-by-layer model summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: &'static str,
    /// Output shape excluding the batch dimension, channels last.
    pub output_shape: Vec<usize>,
    pub params: usize,
}

impl TrashCnnConfig {
    pub fn new(num_classes: usize, image_size: usize) -> Self {
        Self {
            num_classes,
            image_size,
            ..Default::default()
        }
    }

    pub fn layer_summary(&self) -> Vec<LayerSummary> {
        let conv_params = |cin: usize, cout: usize| KERNEL * KERNEL * cin * cout + cout;
        let s1 = self.image_size.saturating_sub(KERNEL - 1);
        let p1 = s1 / 2;
        let s2 = p1.saturating_sub(KERNEL - 1);
        let p2 = s2 / 2;
        let s3 = p2.saturating_sub(KERNEL - 1);
        let [c1, c2, c3] = CONV_CHANNELS;
        vec![
            LayerSummary {
                name: "conv2d",
                output_shape: vec![s1, s1, c1],
                params: conv_params(self.channels, c1),
            },
            LayerSummary {
                name: "max_pooling2d",
                output_shape: vec![p1, p1, c1],
                params: 0,
            },
            LayerSummary {
                name: "conv2d_1",
                output_shape: vec![s2, s2, c2],
                params: conv_params(c1, c2),
            },
            LayerSummary {
                name: "max_pooling2d_1",
                output_shape: vec![p2, p2, c2],
                params: 0,
            },
            LayerSummary {
                name: "conv2d_2",
                output_shape: vec![s3, s3, c3],
                params: conv_params(c2, c3),
            },
            LayerSummary {
                name: "global_average_pooling2d",
                output_shape: vec![c3],
                params: 0,
            },
            LayerSummary {
                name: "dense",
                output_shape: vec![HIDDEN],
                params: c3 * HIDDEN + HIDDEN,
            },
            LayerSummary {
                name: "dense_1",
                output_shape: vec![self.num_classes],
                params: HIDDEN * self.num_classes + self.num_classes,
            },
        ]
    }

    pub fn total_params(&self) -> usize {
        self.layer_summary().iter().map(|l| l.params).sum()
    }

    /// Human-readable table of layers, output shapes, and parameter counts.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<28}{:<24}{:>10}", "Layer", "Output Shape", "Param #");
        let _ = writeln!(out, "{}", "=".repeat(62));
        for layer in self.layer_summary() {
            let dims: Vec<String> = layer.output_shape.iter().map(|d| d.to_string()).collect();
            let shape = format!("(None, {})", dims.join(", "));
            let _ = writeln!(out, "{:<28}{:<24}{:>10}", layer.name, shape, layer.params);
        }
        let _ = writeln!(out, "{}", "=".repeat(62));
        let _ = write!(out, "Total params: {}", self.total_params());
        out
    }
}

#[derive(Debug, Module)]
pub struct TrashCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    gap: AdaptiveAvgPool2d,
    dense: nn::Linear<B>,
    head: nn::Linear<B>,
    num_classes: usize,
}

impl<B: Backend> TrashCnn<B> {
    pub fn new(cfg: TrashCnnConfig, device: &B::Device) -> Self {
        let [c1, c2, c3] = CONV_CHANNELS;
        let conv = |cin: usize, cout: usize| {
            Conv2dConfig::new([cin, cout], [KERNEL, KERNEL]).init(device)
        };
        let num_classes = cfg.num_classes.max(1);
        Self {
            conv1: conv(cfg.channels, c1),
            conv2: conv(c1, c2),
            conv3: conv(c2, c3),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            gap: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dense: nn::LinearConfig::new(c3, HIDDEN).init(device),
            head: nn::LinearConfig::new(HIDDEN, num_classes).init(device),
            num_classes,
        }
    }

    /// Class logits, shape `[batch, num_classes]`, for images shaped `[batch, 3, H, W]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(images));
        let x = self.pool.forward(x);
        let x = relu(self.conv2.forward(x));
        let x = self.pool.forward(x);
        let x = relu(self.conv3.forward(x));
        let x = self.gap.forward(x);
        let [batch, channels, _, _] = x.dims();
        let x = x.reshape([batch, channels]);
        let x = relu(self.dense.forward(x));
        self.head.forward(x)
    }

    /// Softmax class probabilities, shape `[batch, num_classes]`.
    pub fn forward_probs(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

pub mod prelude {
    pub use super::{LayerSummary, TrashCnn, TrashCnnConfig};
}
