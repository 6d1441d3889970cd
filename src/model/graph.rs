//! Model graph description
//!
//! A tensor-free description of the network DAG: every layer node with its
//! output shape and parameter count, plus the edges between them. Shape
//! arithmetic lives here so the topology can be checked (and plotted)
//! without touching the framework.

use crate::model::network::{MaxoutNetworkConfig, BLOCKS};
use crate::{CHANNELS, IMAGE_SIZE};

/// Spatial output size of a valid convolution over zero-padded input
pub fn conv_out(input: usize, padding: usize, kernel: usize) -> usize {
    input + 2 * padding - kernel + 1
}

/// Spatial output size of a max pooling window (floor division)
pub fn pool_out(input: usize, kernel: usize, stride: usize) -> usize {
    (input - kernel) / stride + 1
}

/// Length of the flattened feature vector entering the dense layers
pub fn flattened_features() -> usize {
    let mut size = IMAGE_SIZE;
    for spec in &BLOCKS {
        size = pool_out(conv_out(size, spec.padding, spec.kernel), spec.pool, spec.pool_stride);
    }
    BLOCKS[BLOCKS.len() - 1].channels * size * size
}

/// Which visual lane a node occupies in the rendered graph
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lane {
    /// The single main column
    Main,
    /// A parallel convolution branch (0-based index)
    Branch(usize),
}

/// One layer node of the model graph
#[derive(Clone, Debug)]
pub struct GraphNode {
    /// Unique layer name, e.g. `block1_conv_a`
    pub name: String,
    /// Human-readable operation description
    pub detail: String,
    /// Output shape without the batch dimension
    pub output: Vec<usize>,
    /// Trainable parameter count of this node
    pub params: usize,
    /// Vertical position in the rendered graph
    pub row: usize,
    /// Horizontal lane in the rendered graph
    pub lane: Lane,
}

/// The full layer DAG of the maxout network
#[derive(Clone, Debug)]
pub struct ModelGraph {
    pub nodes: Vec<GraphNode>,
    /// Directed edges as (from, to) node indices
    pub edges: Vec<(usize, usize)>,
}

impl ModelGraph {
    /// Build the graph description for a network configuration
    pub fn from_config(config: &MaxoutNetworkConfig) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        };
        let mut row = 0;

        let mut shape = (CHANNELS, IMAGE_SIZE, IMAGE_SIZE);
        let mut prev = graph.push(
            "input",
            format!("Input {}×{}×{}", shape.0, shape.1, shape.2),
            vec![shape.0, shape.1, shape.2],
            0,
            &mut row,
            Lane::Main,
            &[],
        );
        prev = graph.push(
            "input_dropout",
            format!("Dropout p={}", config.input_dropout),
            vec![shape.0, shape.1, shape.2],
            0,
            &mut row,
            Lane::Main,
            &[prev],
        );

        for (i, spec) in BLOCKS.iter().enumerate() {
            let block = i + 1;
            let in_channels = shape.0;
            let padded = shape.1 + 2 * spec.padding;

            let pad = graph.push(
                &format!("block{}_pad", block),
                format!("ZeroPadding {}", spec.padding),
                vec![in_channels, padded, padded],
                0,
                &mut row,
                Lane::Main,
                &[prev],
            );

            let conv_size = conv_out(shape.1, spec.padding, spec.kernel);
            let conv_params = in_channels * spec.channels * spec.kernel * spec.kernel + spec.channels;
            let branch_row = row;
            let mut branches = Vec::new();
            for piece in 0..spec.pieces {
                let letter = (b'a' + piece as u8) as char;
                row = branch_row;
                branches.push(graph.push(
                    &format!("block{}_conv_{}", block, letter),
                    format!("Convolution {} @ {}×{}", spec.channels, spec.kernel, spec.kernel),
                    vec![spec.channels, conv_size, conv_size],
                    conv_params,
                    &mut row,
                    Lane::Branch(piece),
                    &[pad],
                ));
            }

            let merge = graph.push(
                &format!("block{}_max", block),
                format!("Maxout merge ({} pieces)", spec.pieces),
                vec![spec.channels, conv_size, conv_size],
                0,
                &mut row,
                Lane::Main,
                &branches,
            );

            let pooled = pool_out(conv_size, spec.pool, spec.pool_stride);
            let pool = graph.push(
                &format!("block{}_pool", block),
                format!("MaxPooling {}×{} stride {}", spec.pool, spec.pool, spec.pool_stride),
                vec![spec.channels, pooled, pooled],
                0,
                &mut row,
                Lane::Main,
                &[merge],
            );

            prev = graph.push(
                &format!("block{}_dropout", block),
                format!("Dropout p={}", config.dropout),
                vec![spec.channels, pooled, pooled],
                0,
                &mut row,
                Lane::Main,
                &[pool],
            );

            shape = (spec.channels, pooled, pooled);
        }

        let features = shape.0 * shape.1 * shape.2;
        prev = graph.push(
            "flatten",
            "Flatten".to_string(),
            vec![features],
            0,
            &mut row,
            Lane::Main,
            &[prev],
        );

        let dense_params =
            features * config.dense_units * config.dense_pieces + config.dense_units * config.dense_pieces;
        prev = graph.push(
            "maxout_dense",
            format!("MaxoutDense {} ({} pieces)", config.dense_units, config.dense_pieces),
            vec![config.dense_units],
            dense_params,
            &mut row,
            Lane::Main,
            &[prev],
        );
        prev = graph.push(
            "dense_dropout",
            format!("Dropout p={}", config.dropout),
            vec![config.dense_units],
            0,
            &mut row,
            Lane::Main,
            &[prev],
        );
        prev = graph.push(
            "output",
            format!("Dense {}", config.num_classes),
            vec![config.num_classes],
            config.dense_units * config.num_classes + config.num_classes,
            &mut row,
            Lane::Main,
            &[prev],
        );
        graph.push(
            "softmax",
            "Softmax".to_string(),
            vec![config.num_classes],
            0,
            &mut row,
            Lane::Main,
            &[prev],
        );

        graph
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        name: &str,
        detail: String,
        output: Vec<usize>,
        params: usize,
        row: &mut usize,
        lane: Lane,
        inputs: &[usize],
    ) -> usize {
        let index = self.nodes.len();
        self.nodes.push(GraphNode {
            name: name.to_string(),
            detail,
            output,
            params,
            row: *row,
            lane,
        });
        *row += 1;
        for &from in inputs {
            self.edges.push((from, index));
        }
        index
    }

    /// Total trainable parameter count
    pub fn total_params(&self) -> usize {
        self.nodes.iter().map(|node| node.params).sum()
    }

    /// Number of rows in the rendered layout
    pub fn num_rows(&self) -> usize {
        self.nodes.iter().map(|node| node.row + 1).max().unwrap_or(0)
    }

    /// Print a human-readable layer summary to stdout
    pub fn print_summary(&self) {
        println!("{:<18} {:<28} {:<14} {:>12}", "Layer", "Type", "Output", "Params");
        println!("{}", "-".repeat(74));

        for node in &self.nodes {
            let shape = node
                .output
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join("×");
            println!(
                "{:<18} {:<28} {:<14} {:>12}",
                node.name, node.detail, shape, node.params
            );
        }

        println!("{}", "-".repeat(74));
        println!("Total params: {}", self.total_params());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_out_with_padding() {
        // 32 + 2*4 - 8 + 1 = 33
        assert_eq!(conv_out(32, 4, 8), 33);
        assert_eq!(conv_out(15, 3, 8), 14);
        assert_eq!(conv_out(6, 3, 5), 8);
    }

    #[test]
    fn test_pool_out_floors() {
        assert_eq!(pool_out(33, 4, 2), 15);
        assert_eq!(pool_out(14, 4, 2), 6);
        assert_eq!(pool_out(8, 2, 2), 4);
    }

    #[test]
    fn test_flattened_features() {
        // 192 channels × 4 × 4
        assert_eq!(flattened_features(), 3072);
    }

    #[test]
    fn test_graph_is_acyclic_and_connected() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());

        // Edges only point forward, so the graph cannot contain a cycle.
        assert!(graph.edges.iter().all(|&(from, to)| from < to));

        // Single source (input) and single sink (softmax).
        let n = graph.nodes.len();
        for index in 0..n {
            let has_in = graph.edges.iter().any(|&(_, to)| to == index);
            let has_out = graph.edges.iter().any(|&(from, _)| from == index);
            match index {
                0 => assert!(!has_in && has_out),
                i if i == n - 1 => assert!(has_in && !has_out),
                _ => assert!(has_in && has_out, "node {} is disconnected", index),
            }
        }
    }

    #[test]
    fn test_branch_outputs_match_before_merge() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());

        for merge in graph.nodes.iter().filter(|n| n.name.ends_with("_max")) {
            let merge_index = graph
                .nodes
                .iter()
                .position(|n| n.name == merge.name)
                .unwrap();
            let branch_shapes: Vec<_> = graph
                .edges
                .iter()
                .filter(|&&(_, to)| to == merge_index)
                .map(|&(from, _)| graph.nodes[from].output.clone())
                .collect();

            assert_eq!(branch_shapes.len(), 2);
            assert_eq!(branch_shapes[0], branch_shapes[1]);
            assert_eq!(branch_shapes[0], merge.output);
        }
    }

    #[test]
    fn test_output_layer_has_ten_units() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());

        let output = graph.nodes.iter().find(|n| n.name == "output").unwrap();
        assert_eq!(output.output, vec![10]);
        assert_eq!(output.params, 500 * 10 + 10);

        let softmax = graph.nodes.last().unwrap();
        assert_eq!(softmax.name, "softmax");
        assert_eq!(softmax.output, vec![10]);
    }

    #[test]
    fn test_dense_param_count() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());
        let dense = graph.nodes.iter().find(|n| n.name == "maxout_dense").unwrap();

        // 3072 inputs × 500 units × 5 pieces, plus one bias per projection
        assert_eq!(dense.params, 3072 * 500 * 5 + 500 * 5);
    }

    #[test]
    fn test_shape_chain_through_blocks() {
        let graph = ModelGraph::from_config(&MaxoutNetworkConfig::new());
        let shape_of = |name: &str| {
            graph
                .nodes
                .iter()
                .find(|n| n.name == name)
                .unwrap()
                .output
                .clone()
        };

        assert_eq!(shape_of("block1_conv_a"), vec![96, 33, 33]);
        assert_eq!(shape_of("block1_pool"), vec![96, 15, 15]);
        assert_eq!(shape_of("block2_conv_a"), vec![192, 14, 14]);
        assert_eq!(shape_of("block2_pool"), vec![192, 6, 6]);
        assert_eq!(shape_of("block3_conv_a"), vec![192, 8, 8]);
        assert_eq!(shape_of("block3_pool"), vec![192, 4, 4]);
        assert_eq!(shape_of("flatten"), vec![3072]);
    }
}
