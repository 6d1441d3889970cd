//! Burn dataset integration
//!
//! Implements Burn's `Dataset` trait over prepared CIFAR items and a
//! `Batcher` that assembles `[batch, 3, 32, 32]` image tensors with integer
//! class targets.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use serde::{Deserialize, Serialize};

use crate::dataset::cifar::CifarImage;
use crate::{CHANNELS, IMAGE_SIZE};

/// A single image prepared for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CifarItem {
    /// Pixel data as flattened CHW float array in [0, 1]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
}

impl CifarItem {
    /// Prepare an item from a raw image (scales pixels to [0, 1])
    pub fn from_image(image: &CifarImage) -> Self {
        Self {
            image: image.normalized_data(),
            label: image.label,
        }
    }
}

impl From<&CifarImage> for CifarItem {
    fn from(image: &CifarImage) -> Self {
        Self::from_image(image)
    }
}

/// In-memory dataset of prepared CIFAR items
#[derive(Debug, Clone)]
pub struct CifarDataset {
    items: Vec<CifarItem>,
}

impl CifarDataset {
    /// Build a dataset from raw images
    pub fn from_images(images: &[CifarImage]) -> Self {
        Self {
            items: images.iter().map(CifarItem::from_image).collect(),
        }
    }

    /// Build a dataset from already-prepared items
    pub fn new(items: Vec<CifarItem>) -> Self {
        Self { items }
    }

    /// Number of classes present (highest label + 1)
    pub fn num_classes(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.label)
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }
}

impl Dataset<CifarItem> for CifarDataset {
    fn get(&self, index: usize) -> Option<CifarItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of CIFAR images ready for the network
#[derive(Clone, Debug)]
pub struct CifarBatch<B: Backend> {
    /// Images with shape [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher turning prepared items into tensors
///
/// Pixel scaling already happened at item preparation; the batcher only
/// lays the data out on the device.
#[derive(Clone, Debug, Default)]
pub struct CifarBatcher;

impl CifarBatcher {
    /// Create a new batcher
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, CifarItem, CifarBatch<B>> for CifarBatcher {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> CifarBatch<B> {
        let batch_size = items.len();

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(images_data, [batch_size, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        CifarBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::cifar::IMAGE_BYTES;

    type TestBackend = burn::backend::NdArray;

    fn test_images(labels: &[usize]) -> Vec<CifarImage> {
        labels
            .iter()
            .map(|&label| CifarImage::new(vec![128u8; IMAGE_BYTES], label))
            .collect()
    }

    #[test]
    fn test_item_from_image_normalizes() {
        let images = test_images(&[3]);
        let item = CifarItem::from_image(&images[0]);

        assert_eq!(item.label, 3);
        assert_eq!(item.image.len(), IMAGE_BYTES);
        assert!(item.image.iter().all(|&v| v == 128.0 / 255.0));
    }

    #[test]
    fn test_dataset_access() {
        let dataset = CifarDataset::from_images(&test_images(&[0, 1, 2]));

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.get(2).unwrap().label, 2);
        assert!(dataset.get(3).is_none());
        assert_eq!(dataset.num_classes(), 3);
    }

    #[test]
    fn test_batch_shapes_and_targets() {
        let device = Default::default();
        let dataset = CifarDataset::from_images(&test_images(&[4, 9]));
        let items: Vec<CifarItem> = (0..dataset.len()).filter_map(|i| dataset.get(i)).collect();

        let batcher = CifarBatcher::new();
        let batch: CifarBatch<TestBackend> = batcher.batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets = batch.targets.into_data().to_vec::<i64>().unwrap();
        assert_eq!(targets, vec![4, 9]);
    }

    #[test]
    fn test_batch_pixel_values_in_unit_range() {
        let device = Default::default();
        let images = vec![CifarImage::new(
            (0..IMAGE_BYTES).map(|i| (i % 256) as u8).collect(),
            0,
        )];
        let items = vec![CifarItem::from_image(&images[0])];

        let batcher = CifarBatcher::new();
        let batch: CifarBatch<TestBackend> = batcher.batch(items, &device);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
