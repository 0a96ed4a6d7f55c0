//! Construction heuristics for the ATSP.
//!
//! Both heuristics are deterministic: every choice is made on a key that
//! ends with node indices, so ties always resolve to the smallest index.

use crate::error::{Result, TspError};
use crate::graph::CostGraph;
use crate::solution::Solution;
use crate::tour::Tour;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub trait ConstructionHeuristic {
    fn construct(&self, graph: &CostGraph, start: usize) -> Result<Solution>;
    fn name(&self) -> &str;
}

fn check_start(graph: &CostGraph, start: usize) -> Result<()> {
    if start < graph.n() {
        Ok(())
    } else {
        Err(TspError::Range { index: start, n: graph.n() })
    }
}

/// Unvisited node closest to `from`, ties broken by smallest index.
fn nearest_unvisited(graph: &CostGraph, from: usize, visited: &[bool]) -> Option<usize> {
    (0..graph.n())
        .filter(|&j| !visited[j])
        .min_by_key(|&j| (OrderedFloat(graph.edge(from, j)), j))
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the cheapest unvisited node
/// reachable from the last node of the partial tour.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborHeuristic;

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, graph: &CostGraph, start: usize) -> Result<Solution> {
        check_start(graph, start)?;
        let timer = Instant::now();
        let n = graph.n();

        let mut visited = vec![false; n];
        let mut tour = Vec::with_capacity(n);
        visited[start] = true;
        tour.push(start);

        let mut current = start;
        while tour.len() < n {
            let Some(next) = nearest_unvisited(graph, current, &visited) else {
                break;
            };
            tour.push(next);
            visited[next] = true;
            current = next;
        }

        let mut solution = Solution::from_tour(graph, Tour::new(tour), self.name());
        solution.computation_time = timer.elapsed().as_secs_f64();
        log::debug!("{} from {}: cost {:.2}", self.name(), start, solution.cost);
        Ok(solution)
    }

    fn name(&self) -> &str {
        "nearest_neighbor"
    }
}

/// Cheapest Insertion Heuristic
///
/// Starts from the 2-cycle `[start, nearest(start)]` and repeatedly inserts
/// the unvisited node whose insertion into some cycle edge increases the
/// cycle cost the least.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheapestInsertionHeuristic;

impl CheapestInsertionHeuristic {
    pub fn new() -> Self {
        CheapestInsertionHeuristic
    }

    /// Cost change of inserting `node` between `prev` and `next`, as
    /// `(change in forbidden edges, change in finite cost)`.
    ///
    /// On graphs without forbidden edges the first component is always 0 and
    /// the order is that of the plain cost delta. Comparing lexicographically
    /// keeps NaN out of `inf - inf` and prefers insertions that drop a
    /// forbidden edge from the cycle.
    fn insertion_delta(&self, graph: &CostGraph, prev: usize, node: usize, next: usize) -> InsertionDelta {
        let mut forbidden = 0i32;
        let mut finite = 0.0;
        for (cost, sign) in [
            (graph.edge(prev, node), 1),
            (graph.edge(node, next), 1),
            (graph.edge(prev, next), -1),
        ] {
            if cost.is_infinite() {
                forbidden += sign;
            } else {
                finite += f64::from(sign) * cost;
            }
        }
        (forbidden, OrderedFloat(finite))
    }
}

type InsertionDelta = (i32, OrderedFloat<f64>);

impl ConstructionHeuristic for CheapestInsertionHeuristic {
    fn construct(&self, graph: &CostGraph, start: usize) -> Result<Solution> {
        check_start(graph, start)?;
        let timer = Instant::now();
        let n = graph.n();

        if n == 1 {
            let mut solution = Solution::from_tour(graph, Tour::new(vec![start]), self.name());
            solution.computation_time = timer.elapsed().as_secs_f64();
            return Ok(solution);
        }

        let mut in_tour = vec![false; n];
        in_tour[start] = true;
        let Some(nearest) = nearest_unvisited(graph, start, &in_tour) else {
            return Err(TspError::Validation("graph has no node besides the start".to_string()));
        };
        in_tour[nearest] = true;
        let mut tour = Tour::new(vec![start, nearest]);

        while tour.len() < n {
            let m = tour.len();
            // (delta, node, edge position): strictly lower key wins
            let mut best: Option<(InsertionDelta, usize, usize)> = None;

            for node in (0..n).filter(|&k| !in_tour[k]) {
                for pos in 0..m {
                    let prev = tour[pos];
                    let next = tour[(pos + 1) % m];
                    let key = (self.insertion_delta(graph, prev, node, next), node, pos);
                    if best.map_or(true, |current| key < current) {
                        best = Some(key);
                    }
                }
            }

            let Some((_, node, pos)) = best else {
                break;
            };
            tour.insert_at(pos + 1, node)?;
            in_tour[node] = true;
        }

        tour.rotate_to_front(start)?;

        let mut solution = Solution::from_tour(graph, tour, self.name());
        solution.computation_time = timer.elapsed().as_secs_f64();
        log::debug!("{} from {}: cost {:.2}", self.name(), start, solution.cost);
        Ok(solution)
    }

    fn name(&self) -> &str {
        "cheapest_insertion"
    }
}

/// Closed set of construction heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructionStrategy {
    NearestNeighbor,
    CheapestInsertion,
}

impl ConstructionStrategy {
    pub const ALL: [ConstructionStrategy; 2] = [
        ConstructionStrategy::NearestNeighbor,
        ConstructionStrategy::CheapestInsertion,
    ];

    pub fn construct(self, graph: &CostGraph, start: usize) -> Result<Solution> {
        match self {
            ConstructionStrategy::NearestNeighbor => NearestNeighborHeuristic::new().construct(graph, start),
            ConstructionStrategy::CheapestInsertion => CheapestInsertionHeuristic::new().construct(graph, start),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConstructionStrategy::NearestNeighbor => "nearest_neighbor",
            ConstructionStrategy::CheapestInsertion => "cheapest_insertion",
        }
    }
}

impl Default for ConstructionStrategy {
    fn default() -> Self {
        ConstructionStrategy::NearestNeighbor
    }
}

impl std::fmt::Display for ConstructionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
