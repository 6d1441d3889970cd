//! Model architecture
//!
//! - `maxout`: the maxout convolution and maxout dense layers
//! - `network`: the full three-block classification network
//! - `graph`: tensor-free DAG description for summaries and plotting

pub mod graph;
pub mod maxout;
pub mod network;

pub use graph::ModelGraph;
pub use maxout::{MaxoutConv2d, MaxoutConv2dConfig, MaxoutLinear, MaxoutLinearConfig};
pub use network::{BlockSpec, MaxoutConvBlock, MaxoutNetwork, MaxoutNetworkConfig, BLOCKS};
