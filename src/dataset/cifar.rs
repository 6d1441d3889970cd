//! CIFAR dataset loading
//!
//! Parses the official CIFAR-10 and CIFAR-100 binary distributions and
//! downloads them on demand. CIFAR images are 32x32 RGB stored as planar
//! bytes (red plane, green plane, blue plane), which is already the
//! channels-first layout the network consumes.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{CifarMaxoutError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

/// Bytes of pixel data per image (3 * 32 * 32)
pub const IMAGE_BYTES: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// Images per CIFAR-10 binary batch file
const CIFAR10_BATCH_RECORDS: usize = 10_000;

/// CIFAR-10 class names
pub const CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Which CIFAR dataset to load
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CifarVariant {
    /// CIFAR-10: 10 classes, one label byte per record
    Cifar10,
    /// CIFAR-100: 100 fine classes, coarse + fine label bytes per record
    Cifar100,
}

impl CifarVariant {
    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        match self {
            CifarVariant::Cifar10 => 10,
            CifarVariant::Cifar100 => 100,
        }
    }

    /// Label bytes preceding the pixel data in each binary record
    fn label_bytes(&self) -> usize {
        match self {
            CifarVariant::Cifar10 => 1,
            CifarVariant::Cifar100 => 2,
        }
    }

    /// Download URL of the official binary archive
    pub fn url(&self) -> &'static str {
        match self {
            CifarVariant::Cifar10 => "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz",
            CifarVariant::Cifar100 => "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz",
        }
    }

    /// Directory the archive unpacks into
    pub fn batches_dir(&self) -> &'static str {
        match self {
            CifarVariant::Cifar10 => "cifar-10-batches-bin",
            CifarVariant::Cifar100 => "cifar-100-binary",
        }
    }

    fn archive_name(&self) -> &'static str {
        match self {
            CifarVariant::Cifar10 => "cifar-10-binary.tar.gz",
            CifarVariant::Cifar100 => "cifar-100-binary.tar.gz",
        }
    }
}

/// A single CIFAR image with its label
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CifarImage {
    /// Planar RGB pixel data, 3072 bytes in channels-first order
    pub data: Vec<u8>,
    /// Class label (fine label for CIFAR-100)
    pub label: usize,
}

impl CifarImage {
    /// Create a new image; `data` must hold exactly 3072 bytes
    pub fn new(data: Vec<u8>, label: usize) -> Self {
        debug_assert_eq!(data.len(), IMAGE_BYTES);
        Self { data, label }
    }

    /// Pixel data scaled to [0, 1] (each value v becomes v / 255)
    pub fn normalized_data(&self) -> Vec<f32> {
        self.data.iter().map(|&v| v as f32 / 255.0).collect()
    }

    /// One-hot label vector over `num_classes` entries
    pub fn one_hot(&self, num_classes: usize) -> Vec<f32> {
        let mut row = vec![0.0; num_classes];
        row[self.label] = 1.0;
        row
    }

    /// CIFAR-10 class name for this label
    pub fn class_name(&self) -> Option<&'static str> {
        CLASS_NAMES.get(self.label).copied()
    }
}

/// One-hot encode the labels of a slice of images
pub fn one_hot_labels(images: &[CifarImage], num_classes: usize) -> Vec<Vec<f32>> {
    images.iter().map(|img| img.one_hot(num_classes)).collect()
}

/// Dataset access options, mirroring `(fraction, append_test, variant)`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    /// Fraction of the training split to use, in (0, 1]
    pub fraction: f64,
    /// Append the test images to the training split
    pub append_test: bool,
    /// Which CIFAR dataset to load
    pub variant: CifarVariant,
    /// Seed for the fraction subsample shuffle
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            fraction: 1.0,
            append_test: false,
            variant: CifarVariant::Cifar10,
            seed: 42,
        }
    }
}

impl DataConfig {
    /// Configuration with the default options (full CIFAR-10)
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(CifarMaxoutError::Config(format!(
                "fraction must be in (0, 1], got {}",
                self.fraction
            )));
        }
        Ok(())
    }
}

/// Load the train and test splits according to `config`
///
/// Returns `(train, test)`. The fraction subsample applies to the training
/// split only; the test split stays whole so validation always runs on the
/// full held-out set. With `append_test`, the test images are additionally
/// folded into the training split.
pub fn load(config: &DataConfig, data_dir: impl AsRef<Path>) -> Result<(Vec<CifarImage>, Vec<CifarImage>)> {
    config.validate()?;
    let dir = data_dir.as_ref().join(config.variant.batches_dir());

    let mut train = load_train_split(&dir, config.variant)?;
    let test = load_test_split(&dir, config.variant)?;

    if config.fraction < 1.0 {
        let keep = ((train.len() as f64) * config.fraction).round() as usize;
        let keep = keep.max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        train.shuffle(&mut rng);
        train.truncate(keep);
    }

    if config.append_test {
        train.extend(test.iter().cloned());
    }

    Ok((train, test))
}

fn load_train_split(dir: &Path, variant: CifarVariant) -> Result<Vec<CifarImage>> {
    match variant {
        CifarVariant::Cifar10 => {
            let mut images = Vec::with_capacity(5 * CIFAR10_BATCH_RECORDS);
            for i in 1..=5 {
                let path = dir.join(format!("data_batch_{}.bin", i));
                images.extend(load_batch_file(&path, variant, Some(CIFAR10_BATCH_RECORDS))?);
            }
            Ok(images)
        }
        CifarVariant::Cifar100 => load_batch_file(&dir.join("train.bin"), variant, Some(50_000)),
    }
}

fn load_test_split(dir: &Path, variant: CifarVariant) -> Result<Vec<CifarImage>> {
    let file = match variant {
        CifarVariant::Cifar10 => "test_batch.bin",
        CifarVariant::Cifar100 => "test.bin",
    };
    load_batch_file(&dir.join(file), variant, Some(10_000))
}

/// Load and parse a single CIFAR binary batch file
fn load_batch_file(
    path: &Path,
    variant: CifarVariant,
    expected_records: Option<usize>,
) -> Result<Vec<CifarImage>> {
    if !path.exists() {
        return Err(CifarMaxoutError::DatasetNotFound(path.to_path_buf()));
    }

    let mut buffer = Vec::new();
    File::open(path)?.read_to_end(&mut buffer)?;

    parse_records(&buffer, variant, expected_records).map_err(|reason| {
        CifarMaxoutError::MalformedDataset {
            path: path.to_path_buf(),
            reason,
        }
    })
}

/// Parse raw CIFAR binary records
///
/// CIFAR-10 records are `[label][3072 pixel bytes]`; CIFAR-100 records are
/// `[coarse label][fine label][3072 pixel bytes]`. Pixel bytes are planar
/// RGB and kept as-is (channels-first).
pub fn parse_records(
    buffer: &[u8],
    variant: CifarVariant,
    expected_records: Option<usize>,
) -> std::result::Result<Vec<CifarImage>, String> {
    let record_size = variant.label_bytes() + IMAGE_BYTES;

    if buffer.is_empty() || buffer.len() % record_size != 0 {
        return Err(format!(
            "file size {} is not a multiple of the {}-byte record size",
            buffer.len(),
            record_size
        ));
    }

    let num_records = buffer.len() / record_size;
    if let Some(expected) = expected_records {
        if num_records != expected {
            return Err(format!(
                "expected {} records, found {}",
                expected, num_records
            ));
        }
    }

    let mut images = Vec::with_capacity(num_records);
    for i in 0..num_records {
        let offset = i * record_size;
        // CIFAR-100 carries a coarse label first; the fine label is last.
        let label = buffer[offset + variant.label_bytes() - 1] as usize;
        if label >= variant.num_classes() {
            return Err(format!(
                "record {} has label {} outside 0..{}",
                i,
                label,
                variant.num_classes()
            ));
        }
        let pixels = &buffer[offset + variant.label_bytes()..offset + record_size];
        images.push(CifarImage::new(pixels.to_vec(), label));
    }

    Ok(images)
}

/// Download and unpack the dataset archive if it is not already present
pub fn download(variant: CifarVariant, data_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let data_dir = data_dir.as_ref();
    fs::create_dir_all(data_dir)?;

    let extracted_dir = data_dir.join(variant.batches_dir());
    if extracted_dir.exists() {
        tracing::info!("{} already extracted, skipping download", variant.batches_dir());
        return Ok(extracted_dir);
    }

    let archive_path = data_dir.join(variant.archive_name());
    if !archive_path.exists() {
        tracing::info!("Downloading {} ...", variant.url());

        let response = reqwest::blocking::get(variant.url())
            .map_err(|e| CifarMaxoutError::Download(format!("request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(CifarMaxoutError::Download(format!(
                "server returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| CifarMaxoutError::Download(format!("read failed: {}", e)))?;

        File::create(&archive_path)?.write_all(&bytes)?;
        tracing::info!("Download complete ({} bytes)", bytes.len());
    }

    tracing::info!("Extracting {} ...", archive_path.display());
    let tar_gz = File::open(&archive_path)?;
    let decompressor = flate2::read::GzDecoder::new(tar_gz);
    let mut archive = tar::Archive::new(decompressor);
    archive
        .unpack(data_dir)
        .map_err(|e| CifarMaxoutError::Download(format!("extraction failed: {}", e)))?;

    Ok(extracted_dir)
}
