//! Solution representation for the ATSP.
//!
//! A `Solution` pairs a tour with its cost and records which algorithm
//! produced it and how long it took.

use crate::graph::CostGraph;
use crate::tour::Tour;
use serde::{Deserialize, Serialize};

/// Represents a solution to the ATSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of node indices
    pub tour: Tour,
    /// Total cyclic tour cost
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of local search passes (if applicable)
    pub passes: Option<usize>,
}

impl Solution {
    /// Create a solution from a tour, computing its cost on `graph`
    pub fn from_tour(graph: &CostGraph, tour: Tour, algorithm: &str) -> Self {
        let cost = tour.cost(graph);
        Solution {
            tour,
            cost,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            passes: None,
        }
    }

    /// Recompute the cost from scratch
    pub fn evaluate(&mut self, graph: &CostGraph) {
        self.cost = self.tour.cost(graph);
    }

    /// Whether the tour avoids every forbidden edge
    pub fn is_finite(&self) -> bool {
        self.cost.is_finite()
    }

    /// The tour expressed with node labels
    pub fn labelled_tour(&self, graph: &CostGraph) -> Vec<String> {
        self.tour
            .nodes()
            .iter()
            .map(|&node| graph.labels()[node].clone())
            .collect()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(passes) = self.passes {
            writeln!(f, "  Passes: {}", passes)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour.nodes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_from_tour() {
        let inf = f64::INFINITY;
        let graph = CostGraph::build(
            vec![vec![inf, 2.0, inf], vec![inf, inf, 3.0], vec![4.0, inf, inf]],
            Some(vec!["X".to_string(), "Y".to_string(), "Z".to_string()]),
        )
        .unwrap();

        let solution = Solution::from_tour(&graph, Tour::new(vec![0, 1, 2]), "manual");
        assert_eq!(solution.cost, 9.0);
        assert!(solution.is_finite());
        assert_eq!(solution.labelled_tour(&graph), vec!["X", "Y", "Z"]);

        let mut reversed = Solution::from_tour(&graph, Tour::new(vec![0, 2, 1]), "manual");
        assert!(!reversed.is_finite());
        reversed.tour = Tour::new(vec![1, 2, 0]);
        reversed.evaluate(&graph);
        assert_eq!(reversed.cost, 9.0);
    }
}
