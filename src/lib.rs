//! ATSP Solver Library
//!
//! Heuristics for the asymmetric Traveling Salesman Problem over arbitrary
//! directed cost matrices, where `cost(i, j)` may differ from `cost(j, i)` and
//! missing edges are `+infinity`.
//!
//! # Features
//!
//! - Construction heuristics (Nearest Neighbor, Cheapest Insertion)
//! - Local search methods (2-opt, 3-opt) with pass and time limits
//! - Cost matrix reading and writing (delimited text with optional labels)
//! - Random instance generation and benchmarking tools
//!
//! # Example
//!
//! ```no_run
//! use atsp_solver::reader::{read_cost_matrix, ReaderOptions};
//! use atsp_solver::heuristics::construction::ConstructionStrategy;
//! use atsp_solver::heuristics::local_search::ImprovementStrategy;
//! use atsp_solver::solver::{solve, SolverConfig};
//!
//! let graph = read_cost_matrix("matrix.csv", &ReaderOptions::default()).unwrap();
//!
//! let config = SolverConfig::new(ConstructionStrategy::CheapestInsertion)
//!     .with_improvement(ImprovementStrategy::TwoOpt);
//! let solution = solve(&graph, &config).unwrap();
//!
//! println!("Solution cost: {:.2}", solution.cost);
//! ```

pub mod benchmark;
pub mod error;
pub mod generator;
pub mod graph;
pub mod heuristics;
pub mod reader;
pub mod solution;
pub mod solver;
pub mod tour;

pub use error::{Result, TspError};
pub use graph::CostGraph;
pub use solution::Solution;
pub use solver::{solve, SolverConfig};
pub use tour::Tour;
