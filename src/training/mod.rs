//! Training driver
//!
//! Binds the network to categorical cross-entropy, Adam, and an accuracy
//! metric, then runs a fixed number of epochs with the held-out test split
//! as validation. A custom epoch loop is used rather than a high-level
//! learner: seeded shuffling, lazy batch assembly, and optional per-batch
//! augmentation (the "generator" path).
//!
//! Failures inside the framework (shape mismatches, resource exhaustion)
//! panic straight through; there is no retry or checkpoint logic.

use burn::config::Config;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::ElementConversion;
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::dataset::augmentation::{AugmentConfig, Augmenter};
use crate::dataset::batcher::{CifarBatch, CifarBatcher, CifarDataset, CifarItem};
use crate::dataset::cifar::{self, CifarImage, DataConfig};
use crate::model::network::{MaxoutNetwork, MaxoutNetworkConfig};
use crate::utils::error::CifarMaxoutError;
use crate::utils::error::Result as CifarResult;
use crate::utils::logging::TrainingLogger;

/// Training hyperparameters
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Number of training epochs
    #[config(default = "474")]
    pub epochs: usize,

    /// Batch size
    #[config(default = "128")]
    pub batch_size: usize,

    /// Fixed Adam learning rate
    #[config(default = "5e-4")]
    pub learning_rate: f64,

    /// Seed for shuffling and augmentation randomness
    #[config(default = "42")]
    pub seed: u64,

    /// Run the augmented-generator path instead of direct fitting
    #[config(default = "true")]
    pub augmentation: bool,
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> CifarResult<()> {
        if self.epochs == 0 {
            return Err(CifarMaxoutError::Config("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(CifarMaxoutError::Config("batch_size must be at least 1".into()));
        }
        if self.learning_rate <= 0.0 {
            return Err(CifarMaxoutError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Final metrics of a completed training run
#[derive(Clone, Debug)]
pub struct TrainingReport {
    pub epochs: usize,
    pub final_train_loss: f64,
    pub final_train_accuracy: f64,
    pub final_val_accuracy: f64,
    pub best_val_accuracy: f64,
}

/// Load the dataset per `data` and train the network on it
pub fn run_training<B: AutodiffBackend>(
    data: &DataConfig,
    config: &TrainingConfig,
    data_dir: &str,
    device: B::Device,
) -> CifarResult<TrainingReport> {
    println!("{}", "Loading dataset...".cyan());
    let (train_images, test_images) = cifar::load(data, data_dir)?;
    println!("{} train samples", train_images.len());
    println!("{} test samples", test_images.len());

    let model_config = MaxoutNetworkConfig::new().with_num_classes(data.variant.num_classes());
    fit::<B>(&model_config, config, &train_images, &test_images, device)
}

/// Train the network on already-loaded splits
pub fn fit<B: AutodiffBackend>(
    model_config: &MaxoutNetworkConfig,
    config: &TrainingConfig,
    train_images: &[CifarImage],
    test_images: &[CifarImage],
    device: B::Device,
) -> CifarResult<TrainingReport> {
    config.validate()?;
    if train_images.is_empty() {
        return Err(CifarMaxoutError::Training("training set is empty".into()));
    }
    if test_images.is_empty() {
        return Err(CifarMaxoutError::Training("validation set is empty".into()));
    }

    B::seed(config.seed);

    println!("{}", "Initializing training...".green().bold());
    println!("  Device:        {:?}", device);
    println!("  Epochs:        {}", config.epochs);
    println!("  Batch size:    {}", config.batch_size);
    println!("  Learning rate: {}", config.learning_rate);

    let train_items: Vec<CifarItem> = train_images.iter().map(CifarItem::from_image).collect();
    let val_dataset = CifarDataset::from_images(test_images);
    let batcher = CifarBatcher::new();

    let mut model = model_config.init::<B>(&device);
    let mut optimizer = AdamConfig::new().init();

    let augmenter = if config.augmentation {
        info!("Using real-time data augmentation.");
        let mut augmenter = Augmenter::new(AugmentConfig::new())?;
        augmenter.fit(&train_items);
        Some(augmenter)
    } else {
        info!("Not using data augmentation.");
        None
    };
    let train_dataset = CifarDataset::new(train_items);

    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut aug_rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));

    let mut logger = TrainingLogger::new(config.epochs);
    let mut best_val_acc = 0.0f64;
    let mut report = TrainingReport {
        epochs: 0,
        final_train_loss: 0.0,
        final_train_accuracy: 0.0,
        final_val_accuracy: 0.0,
        best_val_accuracy: 0.0,
    };

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);

        let mut epoch_loss = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        let mut indices: Vec<usize> = (0..train_dataset.len()).collect();
        indices.shuffle(&mut epoch_rng);
        let num_batches = (indices.len() + config.batch_size - 1) / config.batch_size;

        for batch_idx in 0..num_batches {
            let start = batch_idx * config.batch_size;
            let end = (start + config.batch_size).min(indices.len());

            // Assemble the batch lazily; the augmented path transforms
            // every item before it is turned into tensors.
            let items: Vec<CifarItem> = indices[start..end]
                .iter()
                .filter_map(|&i| train_dataset.get(i))
                .collect();
            let items = match &augmenter {
                Some(augmenter) => augmenter.augment_batch(items, &mut aug_rng),
                None => items,
            };
            if items.is_empty() {
                continue;
            }

            let batch: CifarBatch<B> = batcher.batch(items, &device);

            let output = model.forward(batch.images);
            let loss = CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;

            let predictions = output.argmax(1).squeeze::<1>(1);
            let batch_correct: i64 = predictions
                .equal(batch.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            seen += batch.targets.dims()[0];

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);

            if (batch_idx + 1) % 50 == 0 || batch_idx == num_batches - 1 {
                let running_acc = 100.0 * correct as f64 / seen.max(1) as f64;
                println!(
                    "  Batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                    batch_idx + 1,
                    num_batches,
                    loss_value,
                    running_acc
                );
            }
        }

        let train_loss = epoch_loss / num_batches.max(1) as f64;
        let train_acc = correct as f64 / seen.max(1) as f64;

        let (val_loss, val_acc) = evaluate(&model, &val_dataset, config.batch_size);

        if val_acc > best_val_acc {
            best_val_acc = val_acc;
        }
        logger.end_epoch(train_loss, train_acc, val_loss, val_acc);

        report = TrainingReport {
            epochs: epoch + 1,
            final_train_loss: train_loss,
            final_train_accuracy: train_acc,
            final_val_accuracy: val_acc,
            best_val_accuracy: best_val_acc,
        };
    }

    logger.log_complete(best_val_acc);
    println!(
        "{} Best validation accuracy: {:.2}%",
        "Training complete!".green().bold(),
        best_val_acc * 100.0
    );

    Ok(report)
}

/// Evaluate the model on a dataset, returning (mean loss, accuracy)
///
/// Runs on the inner (non-autodiff) backend so dropout is disabled and no
/// gradient state is accumulated.
fn evaluate<B: AutodiffBackend>(
    model: &MaxoutNetwork<B>,
    dataset: &CifarDataset,
    batch_size: usize,
) -> (f64, f64) {
    let device = <B::InnerBackend as Backend>::Device::default();
    let batcher = CifarBatcher::new();
    let inner_model = model.clone().valid();

    let len = dataset.len();
    let mut total_loss = 0.0f64;
    let mut num_batches = 0usize;
    let mut correct = 0usize;
    let mut total = 0usize;

    for start in (0..len).step_by(batch_size) {
        let end = (start + batch_size).min(len);
        let items: Vec<CifarItem> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        let batch: CifarBatch<B::InnerBackend> = batcher.batch(items, &device);
        let output = inner_model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        total_loss += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        let predictions = output.argmax(1).squeeze::<1>(1);
        let batch_correct: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();
        correct += batch_correct as usize;
        total += end - start;
    }

    if total == 0 {
        (0.0, 0.0)
    } else {
        (total_loss / num_batches as f64, correct as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::cifar::IMAGE_BYTES;

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    fn synthetic_images(count: usize, num_classes: usize) -> Vec<CifarImage> {
        (0..count)
            .map(|i| {
                let value = (i * 37 % 256) as u8;
                CifarImage::new(vec![value; IMAGE_BYTES], i % num_classes)
            })
            .collect()
    }

    #[test]
    fn test_training_config_defaults() {
        let config = TrainingConfig::new();
        assert_eq!(config.epochs, 474);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.learning_rate, 5e-4);
        assert!(config.augmentation);
    }

    #[test]
    fn test_training_config_validation() {
        assert!(TrainingConfig::new().validate().is_ok());
        assert!(TrainingConfig::new().with_epochs(0).validate().is_err());
        assert!(TrainingConfig::new().with_batch_size(0).validate().is_err());
        assert!(TrainingConfig::new()
            .with_learning_rate(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_fit_rejects_empty_splits() {
        let device = Default::default();
        let config = TrainingConfig::new().with_epochs(1);
        let model_config = MaxoutNetworkConfig::new();
        let images = synthetic_images(2, 10);

        let empty_train = fit::<TestBackend>(&model_config, &config, &[], &images, device);
        assert!(empty_train.is_err());
    }

    #[test]
    fn test_fit_single_epoch_smoke() {
        // One epoch over a handful of synthetic images exercises the full
        // augmented path: shuffle, augment, forward, backward, step,
        // validation.
        let device = Default::default();
        let config = TrainingConfig::new()
            .with_epochs(1)
            .with_batch_size(2)
            .with_seed(7);
        let model_config = MaxoutNetworkConfig::new();

        let train = synthetic_images(4, 10);
        let test = synthetic_images(2, 10);

        let report = fit::<TestBackend>(&model_config, &config, &train, &test, device).unwrap();

        assert_eq!(report.epochs, 1);
        assert!(report.final_train_loss.is_finite());
        assert!((0.0..=1.0).contains(&report.final_train_accuracy));
        assert!((0.0..=1.0).contains(&report.final_val_accuracy));
        assert!(report.best_val_accuracy >= report.final_val_accuracy - 1e-9);
    }
}
