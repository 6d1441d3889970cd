//! The CIFAR maxout network
//!
//! Reimplements the CIFAR-10 maxout architecture of Goodfellow et al.
//! (2013): three maxout-convolution blocks followed by a 5-piece maxout
//! dense layer and a softmax classifier. Block hyperparameters are fixed
//! per the original configuration (see [`BLOCKS`]).

use burn::config::Config;
use burn::module::Module;
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::model::graph;
use crate::model::maxout::{MaxoutConv2d, MaxoutConv2dConfig, MaxoutLinear, MaxoutLinearConfig};
use crate::CHANNELS;

/// Fixed hyperparameters of one maxout-convolution block
#[derive(Clone, Copy, Debug)]
pub struct BlockSpec {
    /// Symmetric zero padding before the convolutions
    pub padding: usize,
    /// Output channels per convolution piece
    pub channels: usize,
    /// Number of maxout pieces
    pub pieces: usize,
    /// Square convolution kernel size
    pub kernel: usize,
    /// Square pooling window size
    pub pool: usize,
    /// Pooling stride
    pub pool_stride: usize,
}

/// The three convolution blocks of the reference configuration
pub const BLOCKS: [BlockSpec; 3] = [
    BlockSpec {
        padding: 4,
        channels: 96,
        pieces: 2,
        kernel: 8,
        pool: 4,
        pool_stride: 2,
    },
    BlockSpec {
        padding: 3,
        channels: 192,
        pieces: 2,
        kernel: 8,
        pool: 4,
        pool_stride: 2,
    },
    BlockSpec {
        padding: 3,
        channels: 192,
        pieces: 2,
        kernel: 5,
        pool: 2,
        pool_stride: 2,
    },
];

/// Configuration for the [maxout network](MaxoutNetwork)
#[derive(Config, Debug)]
pub struct MaxoutNetworkConfig {
    /// Number of output classes
    #[config(default = "10")]
    pub num_classes: usize,

    /// Dropout probability applied to the raw input
    #[config(default = "0.2")]
    pub input_dropout: f64,

    /// Dropout probability after each block and the dense layer
    #[config(default = "0.5")]
    pub dropout: f64,

    /// Output units of the maxout dense layer
    #[config(default = "500")]
    pub dense_units: usize,

    /// Maxout pieces of the dense layer
    #[config(default = "5")]
    pub dense_pieces: usize,
}

impl MaxoutNetworkConfig {
    /// Initialize a new [maxout network](MaxoutNetwork)
    pub fn init<B: Backend>(&self, device: &B::Device) -> MaxoutNetwork<B> {
        let block1 = MaxoutConvBlock::new(CHANNELS, &BLOCKS[0], self.dropout, device);
        let block2 = MaxoutConvBlock::new(BLOCKS[0].channels, &BLOCKS[1], self.dropout, device);
        let block3 = MaxoutConvBlock::new(BLOCKS[1].channels, &BLOCKS[2], self.dropout, device);

        let dense = MaxoutLinearConfig::new(graph::flattened_features(), self.dense_units)
            .with_pieces(self.dense_pieces)
            .init(device);

        MaxoutNetwork {
            input_dropout: DropoutConfig::new(self.input_dropout).init(),
            block1,
            block2,
            block3,
            dense,
            dense_dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.dense_units, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

/// One maxout-convolution block: zero-padded maxout convolution, max
/// pooling, dropout
#[derive(Module, Debug)]
pub struct MaxoutConvBlock<B: Backend> {
    pub conv: MaxoutConv2d<B>,
    pub pool: MaxPool2d,
    pub dropout: Dropout,
}

impl<B: Backend> MaxoutConvBlock<B> {
    /// Create a block from its fixed spec
    pub fn new(in_channels: usize, spec: &BlockSpec, dropout: f64, device: &B::Device) -> Self {
        let conv = MaxoutConv2dConfig::new([in_channels, spec.channels], spec.kernel)
            .with_pieces(spec.pieces)
            .with_padding(spec.padding)
            .init(device);

        let pool = MaxPool2dConfig::new([spec.pool, spec.pool])
            .with_strides([spec.pool_stride, spec.pool_stride])
            .init();

        Self {
            conv,
            pool,
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.pool.forward(x);
        self.dropout.forward(x)
    }
}

/// The full maxout classification network
#[derive(Module, Debug)]
pub struct MaxoutNetwork<B: Backend> {
    input_dropout: Dropout,
    pub block1: MaxoutConvBlock<B>,
    pub block2: MaxoutConvBlock<B>,
    pub block3: MaxoutConvBlock<B>,
    pub dense: MaxoutLinear<B>,
    dense_dropout: Dropout,
    pub output: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> MaxoutNetwork<B> {
    /// Forward pass producing class logits
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, 3, 32, 32]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.input_dropout.forward(input);
        let x = self.block1.forward(x);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);

        let x = x.flatten::<2>(1, 3);

        let x = self.dense.forward(x);
        let x = self.dense_dropout.forward(x);
        self.output.forward(x)
    }

    /// Forward pass with softmax applied, producing class probabilities
    pub fn forward_softmax(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(input);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
