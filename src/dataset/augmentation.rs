//! On-the-fly data augmentation
//!
//! Random transforms applied per training batch: horizontal flip and small
//! width/height shifts, plus optional featurewise/samplewise normalization
//! whose statistics are fitted once over the training set. Shifted-in
//! border pixels repeat the nearest edge value.
//!
//! Transforms operate directly on the prepared CHW float buffers, so no
//! image decoding is involved.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::batcher::CifarItem;
use crate::utils::error::{CifarMaxoutError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

/// Augmentation toggles for the training generator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Subtract the per-channel dataset mean
    pub featurewise_center: bool,
    /// Subtract each sample's own mean
    pub samplewise_center: bool,
    /// Divide by the per-channel dataset standard deviation
    pub featurewise_std_normalization: bool,
    /// Divide each sample by its own standard deviation
    pub samplewise_std_normalization: bool,
    /// Rotation range in degrees; only 0 is supported
    pub rotation_range: f32,
    /// Maximum horizontal shift as a fraction of image width
    pub width_shift_range: f32,
    /// Maximum vertical shift as a fraction of image height
    pub height_shift_range: f32,
    /// Randomly mirror images left-right
    pub horizontal_flip: bool,
    /// Randomly mirror images top-bottom
    pub vertical_flip: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            featurewise_center: false,
            samplewise_center: false,
            featurewise_std_normalization: false,
            samplewise_std_normalization: false,
            rotation_range: 0.0,
            width_shift_range: 0.1,
            height_shift_range: 0.1,
            horizontal_flip: true,
            vertical_flip: false,
        }
    }
}

impl AugmentConfig {
    /// The training-generator configuration: flips and 10% shifts
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity transform (no augmentation)
    pub fn none() -> Self {
        Self {
            width_shift_range: 0.0,
            height_shift_range: 0.0,
            horizontal_flip: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rotation_range != 0.0 {
            return Err(CifarMaxoutError::Config(
                "rotation_range is not supported; only 0 is accepted".to_string(),
            ));
        }
        for (name, value) in [
            ("width_shift_range", self.width_shift_range),
            ("height_shift_range", self.height_shift_range),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(CifarMaxoutError::Config(format!(
                    "{} must be in [0, 1), got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Per-channel statistics fitted over the training set
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelStats {
    pub mean: [f32; CHANNELS],
    pub std: [f32; CHANNELS],
}

/// Applies the configured random transforms to training items
pub struct Augmenter {
    config: AugmentConfig,
    stats: Option<ChannelStats>,
}

impl Augmenter {
    /// Create an augmenter; call [`fit`](Self::fit) before use if any
    /// featurewise normalization toggle is enabled
    pub fn new(config: AugmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stats: None,
        })
    }

    /// Fit per-channel mean and standard deviation over the training set
    pub fn fit(&mut self, items: &[CifarItem]) {
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        let mut mean = [0.0f64; CHANNELS];
        let mut var = [0.0f64; CHANNELS];
        let count = (items.len() * plane) as f64;

        if items.is_empty() {
            self.stats = None;
            return;
        }

        for item in items {
            for c in 0..CHANNELS {
                for &v in &item.image[c * plane..(c + 1) * plane] {
                    mean[c] += v as f64;
                }
            }
        }
        for m in &mut mean {
            *m /= count;
        }

        for item in items {
            for c in 0..CHANNELS {
                for &v in &item.image[c * plane..(c + 1) * plane] {
                    let d = v as f64 - mean[c];
                    var[c] += d * d;
                }
            }
        }

        let mut stats = ChannelStats {
            mean: [0.0; CHANNELS],
            std: [0.0; CHANNELS],
        };
        for c in 0..CHANNELS {
            stats.mean[c] = mean[c] as f32;
            stats.std[c] = ((var[c] / count).sqrt() as f32).max(f32::EPSILON);
        }
        self.stats = Some(stats);
    }

    /// Fitted statistics, if any
    pub fn stats(&self) -> Option<&ChannelStats> {
        self.stats.as_ref()
    }

    /// Produce a randomly transformed copy of an item
    pub fn augment<R: Rng>(&self, item: &CifarItem, rng: &mut R) -> CifarItem {
        let mut image = item.image.clone();

        if self.config.horizontal_flip && rng.gen_bool(0.5) {
            flip_horizontal(&mut image);
        }
        if self.config.vertical_flip && rng.gen_bool(0.5) {
            flip_vertical(&mut image);
        }

        let dx = random_shift(self.config.width_shift_range, rng);
        let dy = random_shift(self.config.height_shift_range, rng);
        if dx != 0 || dy != 0 {
            image = shift(&image, dx, dy);
        }

        self.standardize(&mut image);

        CifarItem {
            image,
            label: item.label,
        }
    }

    /// Transform every item of a batch
    pub fn augment_batch<R: Rng>(&self, items: Vec<CifarItem>, rng: &mut R) -> Vec<CifarItem> {
        items
            .iter()
            .map(|item| self.augment(item, rng))
            .collect()
    }

    fn standardize(&self, image: &mut [f32]) {
        let plane = IMAGE_SIZE * IMAGE_SIZE;

        if self.config.samplewise_center || self.config.samplewise_std_normalization {
            let mean: f32 = image.iter().sum::<f32>() / image.len() as f32;
            if self.config.samplewise_center {
                for v in image.iter_mut() {
                    *v -= mean;
                }
            }
            if self.config.samplewise_std_normalization {
                let var: f32 =
                    image.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / image.len() as f32;
                let std = var.sqrt().max(f32::EPSILON);
                for v in image.iter_mut() {
                    *v /= std;
                }
            }
        }

        if let Some(stats) = &self.stats {
            for c in 0..CHANNELS {
                let channel = &mut image[c * plane..(c + 1) * plane];
                if self.config.featurewise_center {
                    for v in channel.iter_mut() {
                        *v -= stats.mean[c];
                    }
                }
                if self.config.featurewise_std_normalization {
                    for v in channel.iter_mut() {
                        *v /= stats.std[c];
                    }
                }
            }
        }
    }
}

/// Draw an integer pixel shift in `[-range * size, range * size]`
fn random_shift<R: Rng>(range: f32, rng: &mut R) -> i32 {
    let max = (range * IMAGE_SIZE as f32).round() as i32;
    if max == 0 {
        0
    } else {
        rng.gen_range(-max..=max)
    }
}

/// Mirror a CHW image left-right in place
pub fn flip_horizontal(image: &mut [f32]) {
    for c in 0..CHANNELS {
        for y in 0..IMAGE_SIZE {
            let row = c * IMAGE_SIZE * IMAGE_SIZE + y * IMAGE_SIZE;
            image[row..row + IMAGE_SIZE].reverse();
        }
    }
}

/// Mirror a CHW image top-bottom in place
pub fn flip_vertical(image: &mut [f32]) {
    let plane = IMAGE_SIZE * IMAGE_SIZE;
    for c in 0..CHANNELS {
        for y in 0..IMAGE_SIZE / 2 {
            let top = c * plane + y * IMAGE_SIZE;
            let bottom = c * plane + (IMAGE_SIZE - 1 - y) * IMAGE_SIZE;
            for x in 0..IMAGE_SIZE {
                image.swap(top + x, bottom + x);
            }
        }
    }
}

/// Translate a CHW image by (dx, dy) pixels, repeating edge values
pub fn shift(image: &[f32], dx: i32, dy: i32) -> Vec<f32> {
    let size = IMAGE_SIZE as i32;
    let plane = IMAGE_SIZE * IMAGE_SIZE;
    let mut out = vec![0.0f32; image.len()];

    for c in 0..CHANNELS {
        for y in 0..size {
            let src_y = (y - dy).clamp(0, size - 1) as usize;
            for x in 0..size {
                let src_x = (x - dx).clamp(0, size - 1) as usize;
                out[c * plane + y as usize * IMAGE_SIZE + x as usize] =
                    image[c * plane + src_y * IMAGE_SIZE + src_x];
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient_item() -> CifarItem {
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        let mut image = vec![0.0f32; CHANNELS * plane];
        for c in 0..CHANNELS {
            for y in 0..IMAGE_SIZE {
                for x in 0..IMAGE_SIZE {
                    image[c * plane + y * IMAGE_SIZE + x] =
                        (c * plane + y * IMAGE_SIZE + x) as f32 / (CHANNELS * plane) as f32;
                }
            }
        }
        CifarItem { image, label: 1 }
    }

    #[test]
    fn test_flip_horizontal_is_involution() {
        let item = gradient_item();
        let mut image = item.image.clone();

        flip_horizontal(&mut image);
        assert_ne!(image, item.image);

        flip_horizontal(&mut image);
        assert_eq!(image, item.image);
    }

    #[test]
    fn test_flip_vertical_is_involution() {
        let item = gradient_item();
        let mut image = item.image.clone();

        flip_vertical(&mut image);
        assert_ne!(image, item.image);

        flip_vertical(&mut image);
        assert_eq!(image, item.image);
    }

    #[test]
    fn test_shift_zero_is_identity() {
        let item = gradient_item();
        assert_eq!(shift(&item.image, 0, 0), item.image);
    }

    #[test]
    fn test_shift_moves_pixels_and_fills_edges() {
        let item = gradient_item();
        let shifted = shift(&item.image, 2, 0);

        // Interior pixels move right by two columns.
        assert_eq!(shifted[IMAGE_SIZE / 2 * IMAGE_SIZE + 10], item.image[IMAGE_SIZE / 2 * IMAGE_SIZE + 8]);
        // The leading columns repeat the original edge column.
        assert_eq!(shifted[0], item.image[0]);
        assert_eq!(shifted[1], item.image[0]);
        assert_eq!(shifted[2], item.image[0]);
    }

    #[test]
    fn test_shift_preserves_value_range() {
        let item = gradient_item();
        let shifted = shift(&item.image, -3, 3);

        let min = item.image.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = item.image.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(shifted.iter().all(|&v| v >= min && v <= max));
    }

    #[test]
    fn test_augment_preserves_shape_and_label() {
        let augmenter = Augmenter::new(AugmentConfig::new()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let item = gradient_item();
        let out = augmenter.augment(&item, &mut rng);

        assert_eq!(out.image.len(), item.image.len());
        assert_eq!(out.label, item.label);
    }

    #[test]
    fn test_augment_is_deterministic_per_seed() {
        let augmenter = Augmenter::new(AugmentConfig::new()).unwrap();
        let item = gradient_item();

        let mut rng_a = ChaCha8Rng::seed_from_u64(99);
        let mut rng_b = ChaCha8Rng::seed_from_u64(99);

        let out_a = augmenter.augment(&item, &mut rng_a);
        let out_b = augmenter.augment(&item, &mut rng_b);
        assert_eq!(out_a.image, out_b.image);
    }

    #[test]
    fn test_fit_computes_channel_stats() {
        let plane = IMAGE_SIZE * IMAGE_SIZE;
        let mut image = vec![0.0f32; CHANNELS * plane];
        image[..plane].fill(0.5); // red channel constant
        let items = vec![CifarItem { image, label: 0 }];

        let mut augmenter = Augmenter::new(AugmentConfig::new()).unwrap();
        augmenter.fit(&items);

        let stats = augmenter.stats().unwrap();
        assert!((stats.mean[0] - 0.5).abs() < 1e-6);
        assert!((stats.mean[1]).abs() < 1e-6);
        assert!(stats.std[0] <= 1e-6 + f32::EPSILON);
    }

    #[test]
    fn test_default_config_does_not_standardize() {
        // All normalization toggles default to off, matching a generator
        // whose statistics are fitted but never applied.
        let mut augmenter = Augmenter::new(AugmentConfig {
            horizontal_flip: false,
            width_shift_range: 0.0,
            height_shift_range: 0.0,
            ..AugmentConfig::default()
        })
        .unwrap();
        let item = gradient_item();
        augmenter.fit(std::slice::from_ref(&item));

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let out = augmenter.augment(&item, &mut rng);
        assert_eq!(out.image, item.image);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AugmentConfig::new();
        assert!(config.validate().is_ok());

        config.rotation_range = 15.0;
        assert!(config.validate().is_err());

        config.rotation_range = 0.0;
        config.width_shift_range = 1.0;
        assert!(config.validate().is_err());
    }
}
