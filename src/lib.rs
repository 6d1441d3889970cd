//! # CIFAR Maxout
//!
//! Training library for the maxout convolutional network of Goodfellow et al.
//! (2013) on the CIFAR datasets, built with the Burn framework.
//!
//! The network stacks three maxout-convolution blocks (zero padding, two
//! parallel convolutions merged by an elementwise maximum, max pooling,
//! dropout) followed by a 5-piece maxout-dense layer and a softmax
//! classifier. All tensor math, autodiff and optimization is delegated to
//! Burn; this crate only declares the topology and drives the training loop.
//!
//! ## Modules
//!
//! - `dataset`: CIFAR-10/100 binary loading, batching, and on-the-fly
//!   augmentation
//! - `model`: maxout layers, the network itself, and its graph description
//! - `training`: the epoch loop (plain or augmented) with per-epoch
//!   validation
//! - `utils`: logging, errors, and the SVG model plot
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use cifar_maxout::backend::TrainingBackend;
//! use cifar_maxout::dataset::cifar::DataConfig;
//! use cifar_maxout::training::{run_training, TrainingConfig};
//!
//! let device = cifar_maxout::backend::default_device();
//! run_training::<TrainingBackend>(
//!     &DataConfig::new(),
//!     &TrainingConfig::new(),
//!     "data/cifar",
//!     device,
//! )?;
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::augmentation::{AugmentConfig, Augmenter};
pub use dataset::batcher::{CifarBatch, CifarBatcher, CifarDataset, CifarItem};
pub use dataset::cifar::{CifarImage, CifarVariant, DataConfig};
pub use model::graph::ModelGraph;
pub use model::network::{MaxoutNetwork, MaxoutNetworkConfig};
pub use training::TrainingConfig;
pub use utils::error::{CifarMaxoutError, Result};

/// Spatial side length of a CIFAR image
pub const IMAGE_SIZE: usize = 32;

/// Number of color channels
pub const CHANNELS: usize = 3;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
