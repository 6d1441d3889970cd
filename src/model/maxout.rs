//! Maxout layers
//!
//! A maxout unit takes the elementwise maximum over k independently
//! parameterized linear or convolutional transformations of the same input,
//! replacing a fixed nonlinearity. Both layers here build every piece from
//! one shared configuration, so the piece outputs are shape-compatible by
//! construction.

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Configuration for a [maxout convolution](MaxoutConv2d) layer
#[derive(Config, Debug)]
pub struct MaxoutConv2dConfig {
    /// Input and output channel counts
    pub channels: [usize; 2],

    /// Square kernel side length
    pub kernel_size: usize,

    /// Number of competing convolution pieces
    #[config(default = "2")]
    pub pieces: usize,

    /// Symmetric zero padding applied before the convolution
    #[config(default = "0")]
    pub padding: usize,
}

impl MaxoutConv2dConfig {
    /// Initialize a new [maxout convolution](MaxoutConv2d) layer
    pub fn init<B: Backend>(&self, device: &B::Device) -> MaxoutConv2d<B> {
        assert!(self.pieces >= 1, "maxout layer needs at least one piece");

        let convs = (0..self.pieces)
            .map(|_| {
                Conv2dConfig::new(self.channels, [self.kernel_size, self.kernel_size])
                    .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
                    .init(device)
            })
            .collect();

        MaxoutConv2d { convs }
    }
}

/// Maxout convolution: independent convolutions merged by elementwise max
#[derive(Module, Debug)]
pub struct MaxoutConv2d<B: Backend> {
    /// The competing convolution pieces (public for inspection)
    pub convs: Vec<Conv2d<B>>,
}

impl<B: Backend> MaxoutConv2d<B> {
    /// Forward pass: the elementwise maximum over all piece outputs
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, channels_in, height, width]`
    /// - output: `[batch_size, channels_out, height_out, width_out]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.convs
            .iter()
            .map(|conv| conv.forward(input.clone()))
            .reduce(|a, b| a.max_pair(b))
            .expect("maxout layer has at least one piece")
    }
}

/// Configuration for a [maxout dense](MaxoutLinear) layer
#[derive(Config, Debug)]
pub struct MaxoutLinearConfig {
    /// Size of the input features
    pub d_input: usize,

    /// Size of the output features
    pub d_output: usize,

    /// Number of competing linear pieces per output unit
    #[config(default = "5")]
    pub pieces: usize,
}

impl MaxoutLinearConfig {
    /// Initialize a new [maxout dense](MaxoutLinear) layer
    pub fn init<B: Backend>(&self, device: &B::Device) -> MaxoutLinear<B> {
        assert!(self.pieces >= 1, "maxout layer needs at least one piece");

        MaxoutLinear {
            linear: LinearConfig::new(self.d_input, self.d_output * self.pieces).init(device),
            d_output: self.d_output,
            pieces: self.pieces,
        }
    }
}

/// Maxout dense layer: per output unit, the maximum over independent
/// linear projections
///
/// All pieces live in one fused [`Linear`] of `d_output * pieces` columns;
/// the forward pass regroups them and reduces over the piece dimension.
#[derive(Module, Debug)]
pub struct MaxoutLinear<B: Backend> {
    linear: Linear<B>,
    d_output: usize,
    pieces: usize,
}

impl<B: Backend> MaxoutLinear<B> {
    /// Forward pass
    ///
    /// # Shapes
    ///
    /// - input: `[batch_size, d_input]`
    /// - output: `[batch_size, d_output]`
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, _] = input.dims();

        let projected = self.linear.forward(input);
        let grouped = projected.reshape([batch_size, self.pieces, self.d_output]);
        grouped.max_dim(1).squeeze::<2>(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_maxout_conv_output_shape() {
        let device = Default::default();
        let layer = MaxoutConv2dConfig::new([3, 96], 8)
            .with_padding(4)
            .init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        let output = layer.forward(input);

        // 32 + 2*4 - 8 + 1 = 33
        assert_eq!(output.dims(), [2, 96, 33, 33]);
    }

    #[test]
    fn test_maxout_conv_branches_share_shape() {
        let device = Default::default();
        let layer = MaxoutConv2dConfig::new([3, 16], 5)
            .with_padding(3)
            .init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 32, 32],
            burn::tensor::Distribution::Default,
            &device,
        );

        let dims: Vec<_> = layer
            .convs
            .iter()
            .map(|conv| conv.forward(input.clone()).dims())
            .collect();

        assert_eq!(layer.convs.len(), 2);
        assert_eq!(dims[0], dims[1]);
    }

    #[test]
    fn test_maxout_conv_takes_elementwise_maximum() {
        let device = Default::default();
        let layer = MaxoutConv2dConfig::new([3, 4], 3).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 8, 8],
            burn::tensor::Distribution::Default,
            &device,
        );

        let expected = layer.convs[0]
            .forward(input.clone())
            .max_pair(layer.convs[1].forward(input.clone()));
        let output = layer.forward(input);

        let out = output.into_data().to_vec::<f32>().unwrap();
        let exp = expected.into_data().to_vec::<f32>().unwrap();
        assert_eq!(out.len(), exp.len());
        for (a, b) in out.iter().zip(exp.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_maxout_linear_output_shape() {
        let device = Default::default();
        let layer = MaxoutLinearConfig::new(3072, 500).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2>::zeros([4, 3072], &device);
        let output = layer.forward(input);

        assert_eq!(output.dims(), [4, 500]);
    }

    #[test]
    fn test_maxout_linear_dominates_each_piece() {
        // The maxout output can never be smaller than any single piece's
        // projection of the same input.
        let device = Default::default();
        let layer = MaxoutLinearConfig::new(8, 6).with_pieces(3).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2>::random(
            [5, 8],
            burn::tensor::Distribution::Default,
            &device,
        );

        let projected = layer.linear.forward(input.clone());
        let grouped = projected.reshape([5usize, 3, 6]);
        let output = layer.forward(input);

        let out = output.into_data().to_vec::<f32>().unwrap();
        let pieces = grouped.into_data().to_vec::<f32>().unwrap();

        for batch in 0..5 {
            for unit in 0..6 {
                let max = out[batch * 6 + unit];
                for piece in 0..3 {
                    let value = pieces[batch * 18 + piece * 6 + unit];
                    assert!(max >= value - 1e-6);
                }
            }
        }
    }
}
