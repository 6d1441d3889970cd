//! Dataset handling
//!
//! This module covers the full data path from the official CIFAR binary
//! files to device tensors:
//! - `cifar`: download, parse, and subsample the CIFAR-10/100 splits
//! - `batcher`: Burn `Dataset`/`Batcher` integration
//! - `augmentation`: per-batch random transforms for the augmented
//!   training path

pub mod augmentation;
pub mod batcher;
pub mod cifar;

pub use augmentation::{AugmentConfig, Augmenter, ChannelStats};
pub use batcher::{CifarBatch, CifarBatcher, CifarDataset, CifarItem};
pub use cifar::{
    download, load, one_hot_labels, CifarImage, CifarVariant, DataConfig, CLASS_NAMES,
};
