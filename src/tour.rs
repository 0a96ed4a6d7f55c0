//! Tour representation and the shared cost evaluator.
//!
//! A tour is a permutation of `0..n` read cyclically: the last node connects
//! back to the first. Every algorithm computes costs through [`tour_cost`] so
//! reported costs stay consistent.

use crate::error::{Result, TspError};
use crate::graph::CostGraph;
use serde::{Deserialize, Serialize};

/// Total cyclic cost of visiting `nodes` in order and returning to the first.
///
/// Tours with fewer than two nodes cost `0.0`.
pub fn tour_cost(graph: &CostGraph, nodes: &[usize]) -> f64 {
    if nodes.len() < 2 {
        return 0.0;
    }

    let mut cost = 0.0;
    for pair in nodes.windows(2) {
        cost += graph.edge(pair[0], pair[1]);
    }
    cost += graph.edge(nodes[nodes.len() - 1], nodes[0]);

    cost
}

/// An owned, ordered sequence of node indices forming a closed tour.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tour(Vec<usize>);

impl Tour {
    pub fn new(nodes: Vec<usize>) -> Self {
        Tour(nodes)
    }

    pub fn nodes(&self) -> &[usize] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cyclic cost of this tour on `graph`
    pub fn cost(&self, graph: &CostGraph) -> f64 {
        tour_cost(graph, &self.0)
    }

    /// Position of `node` in the tour
    pub fn position(&self, node: usize) -> Option<usize> {
        self.0.iter().position(|&n| n == node)
    }

    /// Check that the tour visits every node of `0..n` exactly once.
    pub fn validate(&self, n: usize) -> Result<()> {
        if self.0.len() != n {
            return Err(TspError::InvalidTour(format!(
                "expected {} nodes, got {}",
                n,
                self.0.len()
            )));
        }
        let mut seen = vec![false; n];
        for &node in &self.0 {
            if node >= n {
                return Err(TspError::InvalidTour(format!("node {} out of range for {} nodes", node, n)));
            }
            if seen[node] {
                return Err(TspError::InvalidTour(format!("node {} visited more than once", node)));
            }
            seen[node] = true;
        }
        Ok(())
    }

    /// Reverse the inclusive segment `[from, to]` in place.
    pub fn reverse_segment(&mut self, from: usize, to: usize) -> Result<()> {
        if to >= self.0.len() {
            return Err(TspError::Range { index: to, n: self.0.len() });
        }
        if from > to {
            return Err(TspError::InvalidTour(format!(
                "segment start {} is after segment end {}",
                from, to
            )));
        }
        self.0[from..=to].reverse();
        Ok(())
    }

    /// Insert `node` at position `pos`, shifting later nodes right.
    pub fn insert_at(&mut self, pos: usize, node: usize) -> Result<()> {
        if pos > self.0.len() {
            return Err(TspError::Range { index: pos, n: self.0.len() + 1 });
        }
        self.0.insert(pos, node);
        Ok(())
    }

    /// Rotate the tour so that `node` comes first. The cycle is unchanged.
    pub fn rotate_to_front(&mut self, node: usize) -> Result<()> {
        let pos = self
            .position(node)
            .ok_or_else(|| TspError::InvalidTour(format!("node {} is not in the tour", node)))?;
        self.0.rotate_left(pos);
        Ok(())
    }

    /// Overwrite the nodes starting at `from` with `segment`.
    pub(crate) fn splice_segment(&mut self, from: usize, segment: &[usize]) -> Result<()> {
        let to = from + segment.len();
        if to > self.0.len() {
            return Err(TspError::Range { index: to - 1, n: self.0.len() });
        }
        self.0[from..to].copy_from_slice(segment);
        Ok(())
    }
}

impl From<Vec<usize>> for Tour {
    fn from(nodes: Vec<usize>) -> Self {
        Tour(nodes)
    }
}

impl std::ops::Index<usize> for Tour {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.0[index]
    }
}
