//! Shared utilities: errors, logging, and the model plot

pub mod error;
pub mod logging;
pub mod plot;

pub use error::{CifarMaxoutError, Result};
pub use logging::{init_logging, LogConfig, TrainingLogger};
pub use plot::render_svg;
