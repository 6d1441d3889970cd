//! Logging
//!
//! Structured logging via `tracing`, plus a small helper that tracks epoch
//! timing during training.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Verbose configuration for debugging
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_target: true,
            ansi_colors: true,
        }
    }

    /// Errors only
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            include_target: false,
            ansi_colors: true,
        }
    }
}

/// Initialize global logging with the given configuration
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Epoch timing and progress reporting for the training loop
pub struct TrainingLogger {
    epoch: usize,
    total_epochs: usize,
    epoch_start: std::time::Instant,
    training_start: std::time::Instant,
}

impl TrainingLogger {
    /// Create a new training logger
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epoch_start: std::time::Instant::now(),
            training_start: std::time::Instant::now(),
        }
    }

    /// Mark the start of an epoch
    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = std::time::Instant::now();
    }

    /// Log the end of an epoch with its metrics
    pub fn end_epoch(&self, train_loss: f64, train_acc: f64, val_loss: f64, val_acc: f64) {
        let epoch_time = self.epoch_start.elapsed();
        let total_time = self.training_start.elapsed();

        let epochs_remaining = self.total_epochs.saturating_sub(self.epoch + 1);
        let avg_epoch_time = total_time.as_secs_f64() / (self.epoch + 1) as f64;
        let eta_secs = epochs_remaining as f64 * avg_epoch_time;

        tracing::info!(
            "Epoch {}/{} in {:.1}s | loss: {:.4} acc: {:.2}% | val_loss: {:.4} val_acc: {:.2}% | ETA: {:.0}s",
            self.epoch + 1,
            self.total_epochs,
            epoch_time.as_secs_f64(),
            train_loss,
            train_acc * 100.0,
            val_loss,
            val_acc * 100.0,
            eta_secs
        );
    }

    /// Log training completion
    pub fn log_complete(&self, best_accuracy: f64) {
        let total_time = self.training_start.elapsed();

        tracing::info!(
            "Training complete! {} epochs in {:.1}s | Best val accuracy: {:.2}%",
            self.total_epochs,
            total_time.as_secs_f64(),
            best_accuracy * 100.0
        );
    }
}
