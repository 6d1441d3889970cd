//! CIFAR maxout training CLI
//!
//! Entry point for downloading the dataset and training the maxout network.
//! Flag defaults reproduce the reference configuration: 474 epochs, batch
//! size 128, Adam at 0.0005, real-time augmentation enabled.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cifar_maxout::backend::{backend_name, default_device, TrainingBackend};
use cifar_maxout::dataset::cifar::{self, CifarVariant, DataConfig};
use cifar_maxout::model::graph::ModelGraph;
use cifar_maxout::model::network::MaxoutNetworkConfig;
use cifar_maxout::training::{run_training, TrainingConfig};
use cifar_maxout::utils::logging::{init_logging, LogConfig};
use cifar_maxout::utils::plot::render_svg;

/// CIFAR maxout network training with the Burn framework
#[derive(Parser, Debug)]
#[command(name = "cifar-maxout")]
#[command(version)]
#[command(about = "Train the CIFAR-10 maxout network", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download and unpack the CIFAR binary dataset
    Download {
        /// Directory to place the dataset in
        #[arg(short, long, default_value = "data/cifar")]
        data_dir: String,

        /// Fetch CIFAR-100 instead of CIFAR-10
        #[arg(long, default_value = "false")]
        cifar100: bool,
    },

    /// Train the maxout network
    Train {
        /// Directory holding the dataset
        #[arg(short, long, default_value = "data/cifar")]
        data_dir: String,

        /// Number of training epochs
        #[arg(short, long, default_value = "474")]
        epochs: usize,

        /// Batch size
        #[arg(short, long, default_value = "128")]
        batch_size: usize,

        /// Adam learning rate (fixed for the whole run)
        #[arg(short, long, default_value = "0.0005")]
        learning_rate: f64,

        /// Fraction of the training split to use, in (0, 1]
        #[arg(long, default_value = "1.0")]
        fraction: f64,

        /// Fold the test images into the training split
        #[arg(long, default_value = "false")]
        append_test: bool,

        /// Train on CIFAR-100 fine labels instead of CIFAR-10
        #[arg(long, default_value = "false")]
        cifar100: bool,

        /// Disable real-time data augmentation (direct fitting)
        #[arg(long, default_value = "false")]
        no_augmentation: bool,

        /// Random seed for shuffling and augmentation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Skip the layer summary printout
        #[arg(long, default_value = "false")]
        no_summary: bool,

        /// Write an SVG rendering of the model graph to this path
        #[arg(long)]
        plot_file: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Download { data_dir, cifar100 } => {
            let variant = variant_for(cifar100);
            let extracted = cifar::download(variant, &data_dir)?;
            println!(
                "{} Dataset ready at {}",
                "Done.".green().bold(),
                extracted.display()
            );
        }

        Commands::Train {
            data_dir,
            epochs,
            batch_size,
            learning_rate,
            fraction,
            append_test,
            cifar100,
            no_augmentation,
            seed,
            no_summary,
            plot_file,
        } => {
            println!("{}", "CIFAR Maxout".green().bold());
            println!("  Backend: {}", backend_name());

            let variant = variant_for(cifar100);
            let data = DataConfig {
                fraction,
                append_test,
                variant,
                seed,
            };
            let training = TrainingConfig::new()
                .with_epochs(epochs)
                .with_batch_size(batch_size)
                .with_learning_rate(learning_rate)
                .with_seed(seed)
                .with_augmentation(!no_augmentation);

            let model_config =
                MaxoutNetworkConfig::new().with_num_classes(variant.num_classes());
            let graph = ModelGraph::from_config(&model_config);

            if !no_summary {
                graph.print_summary();
            }
            if let Some(path) = plot_file {
                render_svg(&graph, &path)?;
                info!("Model graph written to {}", path);
            }

            let report = run_training::<TrainingBackend>(
                &data,
                &training,
                &data_dir,
                default_device(),
            )?;
            println!(
                "Final validation accuracy: {:.2}%",
                report.final_val_accuracy * 100.0
            );
        }
    }

    Ok(())
}

fn variant_for(cifar100: bool) -> CifarVariant {
    if cifar100 {
        CifarVariant::Cifar100
    } else {
        CifarVariant::Cifar10
    }
}
