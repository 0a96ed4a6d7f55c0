//! Random instance generation.
//!
//! Instances are reproducible: the same parameters and seed always give the
//! same matrix.

use crate::error::{Result, TspError};
use crate::graph::CostGraph;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Parameters for a random asymmetric cost matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceGenerator {
    /// Number of nodes
    pub nodes: usize,
    /// Smallest edge cost (inclusive)
    pub min_cost: i64,
    /// Largest edge cost (inclusive)
    pub max_cost: i64,
    /// Probability that an off-diagonal edge is forbidden
    pub missing_edge_probability: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for InstanceGenerator {
    fn default() -> Self {
        InstanceGenerator {
            nodes: 10,
            min_cost: 1,
            max_cost: 100,
            missing_edge_probability: 0.0,
            seed: 42,
        }
    }
}

impl InstanceGenerator {
    pub fn new(nodes: usize, seed: u64) -> Self {
        InstanceGenerator {
            nodes,
            seed,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.nodes < 2 {
            return Err(TspError::Validation(format!(
                "an instance needs at least 2 nodes, got {}",
                self.nodes
            )));
        }
        if self.min_cost < 0 {
            return Err(TspError::Validation(format!(
                "min_cost = {} must be non-negative",
                self.min_cost
            )));
        }
        if self.min_cost > self.max_cost {
            return Err(TspError::Validation(format!(
                "min_cost = {} is greater than max_cost = {}",
                self.min_cost, self.max_cost
            )));
        }
        if !(0.0..1.0).contains(&self.missing_edge_probability) {
            return Err(TspError::Validation(format!(
                "missing_edge_probability = {} must be in [0, 1)",
                self.missing_edge_probability
            )));
        }
        Ok(())
    }

    /// Generate the cost graph. Labels are the default node indices.
    pub fn generate(&self) -> Result<CostGraph> {
        self.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut matrix = vec![vec![f64::INFINITY; self.nodes]; self.nodes];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if i == j {
                    continue;
                }
                // draw the cost first so the probability does not shift later costs
                let cost = rng.gen_range(self.min_cost..=self.max_cost) as f64;
                let missing = self.missing_edge_probability > 0.0 && rng.gen::<f64>() < self.missing_edge_probability;
                if !missing {
                    *cell = cost;
                }
            }
        }

        log::debug!(
            "generated {} nodes (seed {}, costs {}..={}, missing {})",
            self.nodes,
            self.seed,
            self.min_cost,
            self.max_cost,
            self.missing_edge_probability
        );
        CostGraph::from_matrix(matrix)
    }
}
