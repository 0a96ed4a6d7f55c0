//! Module for representing asymmetric cost graphs.
//!
//! A `CostGraph` is a complete directed graph stored as a dense square cost
//! matrix. Costs may differ per direction and are either finite and
//! non-negative or `+infinity` (forbidden edge). Self-loops are always
//! forbidden.

use crate::error::{Result, TspError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw matrix cell before normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum CostCell {
    /// Absent value, normalised to `+infinity`
    Missing,
    /// Numeric value
    Value(f64),
    /// Textual value as read from a delimited file
    Text(String),
}

impl CostCell {
    /// Normalise the cell into a cost. Empty text and `inf` become `+infinity`.
    fn resolve(self, row: usize, col: usize) -> Result<f64> {
        let value = match self {
            CostCell::Missing => return Ok(f64::INFINITY),
            CostCell::Value(v) => v,
            CostCell::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("inf") {
                    return Ok(f64::INFINITY);
                }
                trimmed.parse::<f64>().map_err(|_| {
                    TspError::Validation(format!(
                        "cost_matrix[{}][{}] = {:?} must be a number",
                        row, col, text
                    ))
                })?
            }
        };

        if value.is_nan() {
            return Err(TspError::Validation(format!(
                "cost_matrix[{}][{}] is NaN",
                row, col
            )));
        }
        if value < 0.0 {
            return Err(TspError::Validation(format!(
                "cost_matrix[{}][{}] = {} must be non-negative",
                row, col, value
            )));
        }
        Ok(value)
    }
}

impl From<f64> for CostCell {
    fn from(value: f64) -> Self {
        CostCell::Value(value)
    }
}

impl From<&str> for CostCell {
    fn from(value: &str) -> Self {
        CostCell::Text(value.to_string())
    }
}

impl From<String> for CostCell {
    fn from(value: String) -> Self {
        CostCell::Text(value)
    }
}

impl<T: Into<CostCell>> From<Option<T>> for CostCell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CostCell::Missing)
    }
}

/// Reference to a node, either by position or by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Index(usize),
    Label(&'a str),
}

impl From<usize> for NodeRef<'_> {
    fn from(index: usize) -> Self {
        NodeRef::Index(index)
    }
}

impl<'a> From<&'a str> for NodeRef<'a> {
    fn from(label: &'a str) -> Self {
        NodeRef::Label(label)
    }
}

impl<'a> From<&'a String> for NodeRef<'a> {
    fn from(label: &'a String) -> Self {
        NodeRef::Label(label.as_str())
    }
}

/// Immutable complete directed graph with per-direction edge costs.
#[derive(Debug, Clone)]
pub struct CostGraph {
    n: usize,
    /// Row-major `n * n` cost matrix
    costs: Vec<f64>,
    labels: Vec<String>,
    label_index: HashMap<String, usize>,
}

impl CostGraph {
    /// Build a graph from a square matrix of cells and optional node labels.
    ///
    /// Diagonal cells are ignored and forced to `+infinity`. Missing, empty
    /// and `inf` cells become `+infinity`. Any other cell must parse as a
    /// non-negative number.
    pub fn build<C: Into<CostCell>>(matrix: Vec<Vec<C>>, labels: Option<Vec<String>>) -> Result<Self> {
        let n = matrix.len();
        if n == 0 {
            return Err(TspError::Validation("cost_matrix cannot be empty".to_string()));
        }
        if let Some(row) = matrix.iter().position(|row| row.len() != n) {
            return Err(TspError::Validation(format!(
                "cost_matrix must be a square matrix: row {} has {} cells, expected {}",
                row,
                matrix[row].len(),
                n
            )));
        }

        let mut costs = Vec::with_capacity(n * n);
        for (i, row) in matrix.into_iter().enumerate() {
            for (j, cell) in row.into_iter().enumerate() {
                if i == j {
                    costs.push(f64::INFINITY);
                } else {
                    costs.push(cell.into().resolve(i, j)?);
                }
            }
        }

        let labels = match labels {
            Some(labels) => {
                if labels.len() != n {
                    return Err(TspError::Validation(format!(
                        "expected {} labels, got {}",
                        n,
                        labels.len()
                    )));
                }
                labels
            }
            None => (0..n).map(|i| i.to_string()).collect(),
        };

        let mut label_index = HashMap::with_capacity(n);
        for (i, label) in labels.iter().enumerate() {
            if label_index.insert(label.clone(), i).is_some() {
                return Err(TspError::Validation(format!(
                    "labels must be unique: {:?} appears more than once",
                    label
                )));
            }
        }

        Ok(CostGraph {
            n,
            costs,
            labels,
            label_index,
        })
    }

    /// Build a graph from a numeric matrix with default labels.
    pub fn from_matrix(matrix: Vec<Vec<f64>>) -> Result<Self> {
        Self::build(matrix, None)
    }

    /// Number of nodes
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Node labels in index order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label of the node at `index`
    pub fn label(&self, index: usize) -> Result<&str> {
        self.check_index(index)?;
        Ok(&self.labels[index])
    }

    /// Index of the node carrying `label`
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.label_index
            .get(label)
            .copied()
            .ok_or_else(|| TspError::UnknownLabel(label.to_string()))
    }

    /// Resolve a node reference to an index in `[0, n)`
    pub fn resolve<'a>(&self, node: impl Into<NodeRef<'a>>) -> Result<usize> {
        match node.into() {
            NodeRef::Index(index) => {
                self.check_index(index)?;
                Ok(index)
            }
            NodeRef::Label(label) => self.index_of(label),
        }
    }

    /// Checked cost lookup by index or label.
    pub fn cost<'a, 'b>(&self, from: impl Into<NodeRef<'a>>, to: impl Into<NodeRef<'b>>) -> Result<f64> {
        let i = self.resolve(from)?;
        let j = self.resolve(to)?;
        Ok(self.edge(i, j))
    }

    /// Unchecked cost lookup used by the heuristics.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn edge(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i < self.n && j < self.n);
        self.costs[i * self.n + j]
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.n {
            Ok(())
        } else {
            Err(TspError::Range { index, n: self.n })
        }
    }

    /// Get statistics about the graph
    pub fn statistics(&self) -> GraphStatistics {
        let mut finite: Vec<f64> = Vec::new();
        let mut missing_edges = 0;
        let mut asymmetry_sum = 0.0;
        let mut asymmetric_pairs = 0usize;

        for i in 0..self.n {
            for j in 0..self.n {
                if i == j {
                    continue;
                }
                let c = self.edge(i, j);
                if c.is_finite() {
                    finite.push(c);
                } else {
                    missing_edges += 1;
                }
                if i < j {
                    let back = self.edge(j, i);
                    if c.is_finite() && back.is_finite() {
                        asymmetry_sum += (c - back).abs();
                        asymmetric_pairs += 1;
                    }
                }
            }
        }

        let (min_cost, avg_cost, max_cost) = if finite.is_empty() {
            (f64::INFINITY, f64::INFINITY, f64::INFINITY)
        } else {
            (
                finite.iter().cloned().fold(f64::INFINITY, f64::min),
                finite.iter().sum::<f64>() / finite.len() as f64,
                finite.iter().cloned().fold(0.0, f64::max),
            )
        };

        GraphStatistics {
            nodes: self.n,
            finite_edges: finite.len(),
            missing_edges,
            min_cost,
            avg_cost,
            max_cost,
            avg_asymmetry: if asymmetric_pairs > 0 {
                asymmetry_sum / asymmetric_pairs as f64
            } else {
                0.0
            },
        }
    }
}

/// Statistics about a cost graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub nodes: usize,
    /// Off-diagonal edges with a finite cost
    pub finite_edges: usize,
    /// Off-diagonal edges with infinite cost
    pub missing_edges: usize,
    pub min_cost: f64,
    pub avg_cost: f64,
    pub max_cost: f64,
    /// Mean of `|c(i,j) - c(j,i)|` over pairs where both directions are finite
    pub avg_asymmetry: f64,
}

impl std::fmt::Display for GraphStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph: {} nodes", self.nodes)?;
        writeln!(f, "  Finite edges: {}", self.finite_edges)?;
        writeln!(f, "  Forbidden edges: {}", self.missing_edges)?;
        writeln!(f, "  Min cost: {:.2}", self.min_cost)?;
        writeln!(f, "  Avg cost: {:.2}", self.avg_cost)?;
        writeln!(f, "  Max cost: {:.2}", self.max_cost)?;
        writeln!(f, "  Avg asymmetry |c(i,j) - c(j,i)|: {:.2}", self.avg_asymmetry)
    }
}
