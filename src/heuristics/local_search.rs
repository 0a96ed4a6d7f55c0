//! Local search improvement heuristics for the ATSP.
//!
//! This module implements two edge-exchange neighbourhoods:
//! - 2-opt (segment reversal)
//! - 3-opt (segment reversal and reordering, seven reconnections)
//!
//! Both use first improvement: the first strictly improving move found in
//! scan order is applied and the scan restarts from the beginning of the
//! tour. Each scan is one pass. A search stops when a full pass finds no
//! improving move, when the pass cap is hit (only without a timeout), or when
//! the timeout has elapsed (checked at the start of every pass).
//!
//! Costs are asymmetric, so reversing a segment also changes the cost of the
//! edges inside it. A 2-opt move is priced with the reversed segment's
//! internal edges included, not only the four exchanged edges; pricing only
//! the boundary would accept reversals that raise the tour cost (see
//! `tests::test_two_opt_accounts_for_reversed_segment`). Segment costs in both
//! directions are read from prefix sums built once per pass, which keeps every
//! move evaluation O(1).

use crate::error::Result;
use crate::graph::CostGraph;
use crate::solution::Solution;
use crate::tour::Tour;
use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::time::{Duration, Instant};

/// Minimum finite cost decrease for a move to count as an improvement,
/// relative to the finite cost of the tour and never below this absolute
/// value. Prefix-sum differences carry rounding error proportional to the
/// tour cost.
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `solution` in place. Returns whether the tour changed.
    fn improve(&self, graph: &CostGraph, solution: &mut Solution) -> Result<bool>;
    fn name(&self) -> &str;
}

/// Bounds on a local search run.
///
/// `max_passes` is only enforced when no `timeout` is set. `None` means no
/// bound of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub max_passes: Option<usize>,
    pub timeout: Option<Duration>,
}

impl SearchLimits {
    /// Run until no improving move remains
    pub fn unbounded() -> Self {
        SearchLimits {
            max_passes: None,
            timeout: None,
        }
    }

    pub fn with_max_passes(max_passes: usize) -> Self {
        SearchLimits {
            max_passes: Some(max_passes),
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        SearchLimits {
            max_passes: None,
            timeout: Some(timeout),
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::with_max_passes(100)
    }
}

/// Tracks passes and elapsed time against a `SearchLimits`.
struct PassBudget {
    limits: SearchLimits,
    started: Instant,
    passes: usize,
}

impl PassBudget {
    fn new(limits: SearchLimits) -> Self {
        PassBudget {
            limits,
            started: Instant::now(),
            passes: 0,
        }
    }

    /// Whether another pass may start; counts it if so.
    fn start_pass(&mut self) -> bool {
        match self.limits.timeout {
            Some(timeout) => {
                if self.started.elapsed() >= timeout {
                    log::warn!("local search stopped by timeout after {} passes", self.passes);
                    return false;
                }
            }
            None => {
                if let Some(max_passes) = self.limits.max_passes {
                    if self.passes >= max_passes {
                        log::debug!("local search stopped at the pass cap ({})", max_passes);
                        return false;
                    }
                }
            }
        }
        self.passes += 1;
        true
    }
}

/// Cost of a path, split into forbidden edges and the sum of finite edges.
///
/// Comparing forbidden counts first keeps NaN out of the arithmetic and lets
/// a move that removes a forbidden edge count as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct PathCost {
    forbidden: usize,
    finite: f64,
}

impl PathCost {
    fn edge(graph: &CostGraph, from: usize, to: usize) -> Self {
        let cost = graph.edge(from, to);
        if cost.is_infinite() {
            PathCost { forbidden: 1, finite: 0.0 }
        } else {
            PathCost { forbidden: 0, finite: cost }
        }
    }

    /// Lower forbidden count, or the same count and a finite sum lower by
    /// more than `tolerance`.
    fn improves_on(self, other: PathCost, tolerance: f64) -> bool {
        self.forbidden < other.forbidden
            || (self.forbidden == other.forbidden && self.finite < other.finite - tolerance)
    }
}

impl Add for PathCost {
    type Output = PathCost;

    fn add(self, rhs: PathCost) -> PathCost {
        PathCost {
            forbidden: self.forbidden + rhs.forbidden,
            finite: self.finite + rhs.finite,
        }
    }
}

/// Prefix sums of edge costs along a tour, walked forwards and backwards.
struct SegmentCosts {
    /// `forward[k]`: cost of `tour[0] -> ... -> tour[k]`
    forward: Vec<PathCost>,
    /// `backward[k]`: cost of the reversed edges `tour[t+1] -> tour[t]` for `t < k`
    backward: Vec<PathCost>,
    /// Improvement threshold for moves evaluated from these sums
    tolerance: f64,
}

impl SegmentCosts {
    fn new(graph: &CostGraph, tour: &[usize]) -> Self {
        let mut forward = Vec::with_capacity(tour.len());
        let mut backward = Vec::with_capacity(tour.len());
        let mut fwd = PathCost::default();
        let mut bwd = PathCost::default();
        forward.push(fwd);
        backward.push(bwd);
        for pair in tour.windows(2) {
            fwd = fwd + PathCost::edge(graph, pair[0], pair[1]);
            bwd = bwd + PathCost::edge(graph, pair[1], pair[0]);
            forward.push(fwd);
            backward.push(bwd);
        }
        let scale = fwd.finite.abs().max(bwd.finite.abs()).max(1.0);
        SegmentCosts {
            forward,
            backward,
            tolerance: IMPROVEMENT_EPSILON * scale,
        }
    }

    fn between(prefix: &[PathCost], from: usize, to: usize) -> PathCost {
        PathCost {
            forbidden: prefix[to].forbidden - prefix[from].forbidden,
            finite: prefix[to].finite - prefix[from].finite,
        }
    }

    /// Cost of walking `tour[from] -> ... -> tour[to]` (`from <= to`)
    fn forward(&self, from: usize, to: usize) -> PathCost {
        Self::between(&self.forward, from, to)
    }

    /// Cost of walking `tour[to] -> ... -> tour[from]` (`from <= to`)
    fn backward(&self, from: usize, to: usize) -> PathCost {
        Self::between(&self.backward, from, to)
    }
}

/// Run first-improvement passes until `find_and_apply` reports that no move
/// was applied, or the budget runs out. Returns `(improved, passes)`.
fn run_passes<F>(graph: &CostGraph, tour: &mut Tour, limits: SearchLimits, mut find_and_apply: F) -> Result<(bool, usize)>
where
    F: FnMut(&CostGraph, &mut Tour, &SegmentCosts) -> Result<bool>,
{
    let mut budget = PassBudget::new(limits);
    let mut improved = false;

    while budget.start_pass() {
        let costs = SegmentCosts::new(graph, tour.nodes());
        if !find_and_apply(graph, tour, &costs)? {
            break;
        }
        improved = true;
    }

    Ok((improved, budget.passes))
}

/// 2-Opt Local Search
///
/// Exchanges edges `(tour[i], tour[i+1])` and `(tour[j], tour[j+1])` for
/// `(tour[i], tour[j])` and `(tour[i+1], tour[j+1])` by reversing the
/// segment `[i+1, j]`. The wrap-around edge is never exchanged, so
/// `tour[0]` stays in place.
#[derive(Debug, Clone, Default)]
pub struct TwoOptSearch {
    pub limits: SearchLimits,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch {
            limits: SearchLimits::default(),
        }
    }

    pub fn with_limits(limits: SearchLimits) -> Self {
        TwoOptSearch { limits }
    }

    /// First improving `(i, j)` in scan order, if any.
    fn find_improving_move(&self, graph: &CostGraph, tour: &[usize], costs: &SegmentCosts) -> Option<(usize, usize)> {
        let n = tour.len();
        for i in 0..n - 3 {
            let a = tour[i];
            let b = tour[i + 1];
            for j in i + 2..n - 1 {
                let c = tour[j];
                let d = tour[j + 1];

                let old = PathCost::edge(graph, a, b) + costs.forward(i + 1, j) + PathCost::edge(graph, c, d);
                let new = PathCost::edge(graph, a, c) + costs.backward(i + 1, j) + PathCost::edge(graph, b, d);

                if new.improves_on(old, costs.tolerance) {
                    return Some((i, j));
                }
            }
        }
        None
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, graph: &CostGraph, solution: &mut Solution) -> Result<bool> {
        solution.tour.validate(graph.n())?;
        let timer = Instant::now();

        if solution.tour.len() < 4 {
            solution.evaluate(graph);
            solution.passes = Some(0);
            return Ok(false);
        }

        let (improved, passes) = run_passes(graph, &mut solution.tour, self.limits, |graph, tour, costs| {
            match self.find_improving_move(graph, tour.nodes(), costs) {
                Some((i, j)) => {
                    log::trace!("2-opt: reversing [{}, {}]", i + 1, j);
                    tour.reverse_segment(i + 1, j)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        solution.evaluate(graph);
        solution.passes = Some(passes);
        solution.computation_time += timer.elapsed().as_secs_f64();
        log::debug!("{}: {} passes, cost {:.2}", self.name(), passes, solution.cost);
        Ok(improved)
    }

    fn name(&self) -> &str {
        "2-opt"
    }
}

/// One of the two middle segments in a 3-opt move, possibly reversed.
#[derive(Debug, Clone, Copy)]
struct Piece {
    /// Inclusive position range in the current tour
    from: usize,
    to: usize,
    reversed: bool,
}

impl Piece {
    fn first(&self, tour: &[usize]) -> usize {
        if self.reversed {
            tour[self.to]
        } else {
            tour[self.from]
        }
    }

    fn last(&self, tour: &[usize]) -> usize {
        if self.reversed {
            tour[self.from]
        } else {
            tour[self.to]
        }
    }

    fn internal_cost(&self, costs: &SegmentCosts) -> PathCost {
        if self.reversed {
            costs.backward(self.from, self.to)
        } else {
            costs.forward(self.from, self.to)
        }
    }

    fn push_nodes(&self, tour: &[usize], out: &mut Vec<usize>) {
        let nodes = &tour[self.from..=self.to];
        if self.reversed {
            out.extend(nodes.iter().rev());
        } else {
            out.extend_from_slice(nodes);
        }
    }
}

/// 3-Opt Local Search
///
/// Cuts the tour at positions `i < j < k` into `A = [0, i]`,
/// `B = [i+1, j]`, `C = [j+1, k]` and `D = [k+1, n)` (possibly empty), then
/// tries to rebuild it as `A X Y D`. Candidate reconnections, in order:
/// `B'C`, `BC'`, `B'C'`, `CB`, `CB'`, `C'B`, `C'B'` (`'` marks a reversed
/// segment). `A` keeps `tour[0]` in place.
#[derive(Debug, Clone, Default)]
pub struct ThreeOptSearch {
    pub limits: SearchLimits,
}

impl ThreeOptSearch {
    /// `(swap B and C, reverse B, reverse C)` for each reconnection
    const RECONNECTIONS: [(bool, bool, bool); 7] = [
        (false, true, false),
        (false, false, true),
        (false, true, true),
        (true, false, false),
        (true, true, false),
        (true, false, true),
        (true, true, true),
    ];

    pub fn new() -> Self {
        ThreeOptSearch {
            limits: SearchLimits::default(),
        }
    }

    pub fn with_limits(limits: SearchLimits) -> Self {
        ThreeOptSearch { limits }
    }

    /// First improving `(X, Y)` in scan order, if any.
    fn find_improving_move(&self, graph: &CostGraph, tour: &[usize], costs: &SegmentCosts) -> Option<(Piece, Piece)> {
        let n = tour.len();
        for i in 0..n - 2 {
            let a = tour[i];
            for j in i + 1..n - 1 {
                for k in j + 1..n {
                    let next = tour[(k + 1) % n];
                    let b = Piece { from: i + 1, to: j, reversed: false };
                    let c = Piece { from: j + 1, to: k, reversed: false };

                    let old = Self::joined_cost(graph, tour, costs, a, b, c, next);

                    for (swap, reverse_b, reverse_c) in Self::RECONNECTIONS {
                        let b = Piece { reversed: reverse_b, ..b };
                        let c = Piece { reversed: reverse_c, ..c };
                        let (x, y) = if swap { (c, b) } else { (b, c) };

                        let new = Self::joined_cost(graph, tour, costs, a, x, y, next);
                        if new.improves_on(old, costs.tolerance) {
                            return Some((x, y));
                        }
                    }
                }
            }
        }
        None
    }

    /// Cost of `a -> X -> Y -> next`
    #[allow(clippy::too_many_arguments)]
    fn joined_cost(graph: &CostGraph, tour: &[usize], costs: &SegmentCosts, a: usize, x: Piece, y: Piece, next: usize) -> PathCost {
        PathCost::edge(graph, a, x.first(tour))
            + x.internal_cost(costs)
            + PathCost::edge(graph, x.last(tour), y.first(tour))
            + y.internal_cost(costs)
            + PathCost::edge(graph, y.last(tour), next)
    }

    fn apply(tour: &mut Tour, x: Piece, y: Piece) -> Result<()> {
        let start = x.from.min(y.from);
        let mut segment = Vec::with_capacity(x.to.max(y.to) + 1 - start);
        x.push_nodes(tour.nodes(), &mut segment);
        y.push_nodes(tour.nodes(), &mut segment);
        tour.splice_segment(start, &segment)
    }
}

impl LocalSearch for ThreeOptSearch {
    fn improve(&self, graph: &CostGraph, solution: &mut Solution) -> Result<bool> {
        solution.tour.validate(graph.n())?;
        let timer = Instant::now();

        if solution.tour.len() < 3 {
            solution.evaluate(graph);
            solution.passes = Some(0);
            return Ok(false);
        }

        let (improved, passes) = run_passes(graph, &mut solution.tour, self.limits, |graph, tour, costs| {
            match self.find_improving_move(graph, tour.nodes(), costs) {
                Some((x, y)) => {
                    log::trace!("3-opt: reconnecting {:?} {:?}", x, y);
                    Self::apply(tour, x, y)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        solution.evaluate(graph);
        solution.passes = Some(passes);
        solution.computation_time += timer.elapsed().as_secs_f64();
        log::debug!("{}: {} passes, cost {:.2}", self.name(), passes, solution.cost);
        Ok(improved)
    }

    fn name(&self) -> &str {
        "3-opt"
    }
}

/// Improve `tour` with 2-opt and return it with its cost.
pub fn two_opt(graph: &CostGraph, tour: Tour, limits: SearchLimits) -> Result<(Tour, f64)> {
    tour.validate(graph.n())?;
    let mut solution = Solution::from_tour(graph, tour, "2-opt");
    TwoOptSearch::with_limits(limits).improve(graph, &mut solution)?;
    Ok((solution.tour, solution.cost))
}

/// Improve `tour` with 3-opt and return it with its cost.
pub fn three_opt(graph: &CostGraph, tour: Tour, limits: SearchLimits) -> Result<(Tour, f64)> {
    tour.validate(graph.n())?;
    let mut solution = Solution::from_tour(graph, tour, "3-opt");
    ThreeOptSearch::with_limits(limits).improve(graph, &mut solution)?;
    Ok((solution.tour, solution.cost))
}

/// Closed set of improvement heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImprovementStrategy {
    TwoOpt,
    ThreeOpt,
}

impl ImprovementStrategy {
    pub const ALL: [ImprovementStrategy; 2] = [ImprovementStrategy::TwoOpt, ImprovementStrategy::ThreeOpt];

    pub fn improve(self, graph: &CostGraph, solution: &mut Solution, limits: SearchLimits) -> Result<bool> {
        match self {
            ImprovementStrategy::TwoOpt => TwoOptSearch::with_limits(limits).improve(graph, solution),
            ImprovementStrategy::ThreeOpt => ThreeOptSearch::with_limits(limits).improve(graph, solution),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImprovementStrategy::TwoOpt => "2-opt",
            ImprovementStrategy::ThreeOpt => "3-opt",
        }
    }
}

impl std::fmt::Display for ImprovementStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::InstanceGenerator;
    use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
    use crate::tour::tour_cost;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    const INF: f64 = f64::INFINITY;

    fn four_node_graph() -> CostGraph {
        CostGraph::from_matrix(vec![
            vec![INF, 1.0, 10.0, 5.0],
            vec![5.0, INF, 1.0, 10.0],
            vec![10.0, 5.0, INF, 1.0],
            vec![1.0, 10.0, 5.0, INF],
        ])
        .unwrap()
    }

    fn five_node_graph() -> CostGraph {
        CostGraph::from_matrix(vec![
            vec![INF, 1.0, 10.0, 5.0, 8.0],
            vec![5.0, INF, 1.0, 10.0, 3.0],
            vec![10.0, 5.0, INF, 1.0, 7.0],
            vec![1.0, 10.0, 5.0, INF, 2.0],
            vec![8.0, 3.0, 7.0, 2.0, INF],
        ])
        .unwrap()
    }

    fn random_graph(nodes: usize, seed: u64) -> CostGraph {
        InstanceGenerator {
            nodes,
            seed,
            ..Default::default()
        }
        .generate()
        .unwrap()
    }

    fn assert_permutation(tour: &Tour, n: usize) {
        assert!(tour.validate(n).is_ok(), "not a permutation: {:?}", tour);
    }

    #[test]
    fn test_two_opt_improves_tour() {
        let graph = four_node_graph();
        let initial = Tour::new(vec![0, 2, 1, 3]);
        let initial_cost = tour_cost(&graph, initial.nodes());
        assert_eq!(initial_cost, 26.0);

        let (tour, cost) = two_opt(&graph, initial, SearchLimits::default()).unwrap();
        assert_permutation(&tour, 4);
        assert!(cost < initial_cost);
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(cost, 4.0);
    }

    #[test]
    fn test_two_opt_no_improvement() {
        let graph = four_node_graph();
        let (tour, cost) = two_opt(&graph, Tour::new(vec![0, 1, 2, 3]), SearchLimits::default()).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(cost, 4.0);
    }

    #[test]
    fn test_two_opt_small_tours_unchanged() {
        let graph = CostGraph::from_matrix(vec![
            vec![INF, 1.0, 2.0],
            vec![3.0, INF, 1.0],
            vec![2.0, 4.0, INF],
        ])
        .unwrap();
        let mut solution = Solution::from_tour(&graph, Tour::new(vec![0, 2, 1]), "manual");
        let improved = TwoOptSearch::new().improve(&graph, &mut solution).unwrap();
        assert!(!improved);
        assert_eq!(solution.tour.nodes(), &[0, 2, 1]);
        assert_eq!(solution.cost, tour_cost(&graph, &[0, 2, 1]));
        assert_eq!(solution.passes, Some(0));
    }

    #[test]
    fn test_two_opt_accounts_for_reversed_segment() {
        // Reversing [1, 2] in [0, 1, 2, 3] swaps the four boundary edges for a
        // cheaper set, but flips 1 -> 2 (cost 1) into 2 -> 1 (cost 100).
        let graph = CostGraph::from_matrix(vec![
            vec![INF, 5.0, 1.0, INF],
            vec![INF, INF, 1.0, 1.0],
            vec![INF, 100.0, INF, 5.0],
            vec![1.0, INF, INF, INF],
        ])
        .unwrap();
        let (tour, cost) = two_opt(&graph, Tour::new(vec![0, 1, 2, 3]), SearchLimits::default()).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(cost, 12.0);
    }

    #[test]
    fn test_two_opt_repairs_forbidden_edges() {
        let graph = CostGraph::from_matrix(vec![
            vec![INF, 1.0, INF, INF],
            vec![INF, INF, 1.0, INF],
            vec![INF, INF, INF, 1.0],
            vec![1.0, INF, INF, INF],
        ])
        .unwrap();
        let (tour, cost) = two_opt(&graph, Tour::new(vec![0, 2, 1, 3]), SearchLimits::default()).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(cost, 4.0);
    }

    #[test]
    fn test_two_opt_never_worsens_and_converges() {
        for seed in 0..10 {
            let graph = random_graph(12, seed);
            let initial = NearestNeighborHeuristic::new().construct(&graph, 0).unwrap();

            let (tour, cost) = two_opt(&graph, initial.tour.clone(), SearchLimits::unbounded()).unwrap();
            assert_permutation(&tour, graph.n());
            assert_eq!(tour[0], 0);
            assert!(cost <= initial.cost + 1e-9, "seed {}: {} > {}", seed, cost, initial.cost);
            assert!((cost - tour_cost(&graph, tour.nodes())).abs() < 1e-9);

            let (again, again_cost) = two_opt(&graph, tour.clone(), SearchLimits::unbounded()).unwrap();
            assert_eq!(again, tour);
            assert_eq!(again_cost, cost);
        }
    }

    #[test]
    fn test_two_opt_respects_max_passes() {
        let graph = random_graph(15, 7);
        let reversed: Vec<usize> = std::iter::once(0).chain((1..15).rev()).collect();

        for max_passes in [0, 1, 3] {
            let mut solution = Solution::from_tour(&graph, Tour::new(reversed.clone()), "manual");
            TwoOptSearch::with_limits(SearchLimits::with_max_passes(max_passes))
                .improve(&graph, &mut solution)
                .unwrap();
            assert!(solution.passes.unwrap() <= max_passes);
            assert_permutation(&solution.tour, 15);
        }

        let mut solution = Solution::from_tour(&graph, Tour::new(reversed.clone()), "manual");
        TwoOptSearch::with_limits(SearchLimits::with_max_passes(0))
            .improve(&graph, &mut solution)
            .unwrap();
        assert_eq!(solution.tour.nodes(), reversed.as_slice());
    }

    #[test]
    fn test_timeout_overrides_max_passes() {
        let graph = random_graph(15, 3);
        let reversed: Vec<usize> = std::iter::once(0).chain((1..15).rev()).collect();
        let limits = SearchLimits {
            max_passes: Some(0),
            timeout: Some(Duration::from_secs(60)),
        };

        // with a timeout set the pass cap is ignored, so the search converges
        let mut bounded = Solution::from_tour(&graph, Tour::new(reversed.clone()), "manual");
        TwoOptSearch::with_limits(limits).improve(&graph, &mut bounded).unwrap();
        let mut unbounded = Solution::from_tour(&graph, Tour::new(reversed.clone()), "manual");
        TwoOptSearch::with_limits(SearchLimits::unbounded())
            .improve(&graph, &mut unbounded)
            .unwrap();
        assert_eq!(bounded.tour, unbounded.tour);

        // an elapsed timeout stops the search before the first pass
        let mut expired = Solution::from_tour(&graph, Tour::new(reversed.clone()), "manual");
        let limits = SearchLimits {
            max_passes: Some(1000),
            timeout: Some(Duration::ZERO),
        };
        ThreeOptSearch::with_limits(limits).improve(&graph, &mut expired).unwrap();
        assert_eq!(expired.passes, Some(0));
        assert_eq!(expired.tour.nodes(), reversed.as_slice());
    }

    #[test]
    fn test_rejects_invalid_tour() {
        let graph = four_node_graph();
        assert!(two_opt(&graph, Tour::new(vec![0, 1, 1, 3]), SearchLimits::default()).is_err());
        assert!(three_opt(&graph, Tour::new(vec![0, 1, 2]), SearchLimits::default()).is_err());
    }

    #[test]
    fn test_three_opt_improves_tour() {
        let graph = five_node_graph();
        let initial = NearestNeighborHeuristic::new().construct(&graph, 0).unwrap();
        let (tour, cost) = three_opt(&graph, initial.tour.clone(), SearchLimits::default()).unwrap();
        assert!(cost <= initial.cost);
        assert_permutation(&tour, 5);
        assert_eq!(cost, tour_cost(&graph, tour.nodes()));
    }

    #[test]
    fn test_three_opt_no_improvement() {
        let graph = four_node_graph();
        let (tour, cost) = three_opt(&graph, Tour::new(vec![0, 1, 2, 3]), SearchLimits::default()).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(cost, 4.0);
    }

    #[test]
    fn test_three_opt_small_graph() {
        let graph = CostGraph::from_matrix(vec![
            vec![INF, 1.0, 2.0, 3.0, 4.0],
            vec![4.0, INF, 1.0, 2.0, 3.0],
            vec![3.0, 4.0, INF, 1.0, 2.0],
            vec![2.0, 3.0, 4.0, INF, 1.0],
            vec![1.0, 2.0, 3.0, 4.0, INF],
        ])
        .unwrap();
        let (tour, cost) = three_opt(&graph, Tour::new(vec![0, 1, 2, 3, 4]), SearchLimits::default()).unwrap();
        assert_permutation(&tour, 5);
        assert_eq!(cost, tour_cost(&graph, tour.nodes()));
        assert_eq!(cost, 5.0);
    }

    #[test]
    fn test_three_opt_reverses_three_node_cycle() {
        let graph = CostGraph::from_matrix(vec![
            vec![INF, 1.0, 9.0],
            vec![9.0, INF, 1.0],
            vec![1.0, 9.0, INF],
        ])
        .unwrap();
        let (tour, cost) = three_opt(&graph, Tour::new(vec![0, 2, 1]), SearchLimits::default()).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2]);
        assert_eq!(cost, 3.0);
    }

    #[test]
    fn test_three_opt_segment_exchange() {
        // Optimal cycle 0 -> 1 -> 2 -> 3 -> 4 -> 5; start from the tour with
        // segments [1, 2] and [3, 4] swapped, which only a pure segment
        // exchange (no reversal) repairs in one move.
        let n = 6;
        let mut matrix = vec![vec![50.0; n]; n];
        for i in 0..n {
            matrix[i][(i + 1) % n] = 1.0;
        }
        let graph = CostGraph::from_matrix(matrix).unwrap();
        let mut solution = Solution::from_tour(&graph, Tour::new(vec![0, 3, 4, 1, 2, 5]), "manual");
        let improved = ThreeOptSearch::with_limits(SearchLimits::unbounded())
            .improve(&graph, &mut solution)
            .unwrap();
        assert!(improved);
        assert_eq!(solution.tour.nodes(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(solution.cost, 6.0);
        assert_eq!(solution.passes, Some(2));
    }

    #[test]
    fn test_three_opt_never_worsens_and_converges() {
        for seed in 0..5 {
            let graph = random_graph(10, 100 + seed);
            let initial = NearestNeighborHeuristic::new().construct(&graph, 0).unwrap();

            let (tour, cost) = three_opt(&graph, initial.tour.clone(), SearchLimits::unbounded()).unwrap();
            assert_permutation(&tour, graph.n());
            assert_eq!(tour[0], 0);
            assert!(cost <= initial.cost + 1e-9);

            // a 3-opt local optimum is also 2-opt optimal
            let (after_two_opt, two_opt_cost) = two_opt(&graph, tour.clone(), SearchLimits::unbounded()).unwrap();
            assert_eq!(after_two_opt, tour);
            assert_eq!(two_opt_cost, cost);
        }
    }

    /// `c(i, j) = f(i) + f(j)`: every tour costs `2 * sum(f)`.
    fn equal_cost_graph(nodes: usize, scale: f64, seed: u64) -> CostGraph {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let f: Vec<f64> = (0..nodes).map(|_| scale * (1.0 + rng.gen::<f64>())).collect();
        let matrix: Vec<Vec<f64>> = (0..nodes)
            .map(|i| (0..nodes).map(|j| f[i] + f[j]).collect())
            .collect();
        CostGraph::from_matrix(matrix).unwrap()
    }

    #[test]
    fn test_equal_cost_tours_converge_at_large_costs() {
        let tour: Vec<usize> = (0..30).collect();
        for scale in [1.0, 1e3, 1e6, 1e10] {
            for seed in 0..3 {
                let graph = equal_cost_graph(30, scale, seed);
                for strategy in ImprovementStrategy::ALL {
                    let mut solution = Solution::from_tour(&graph, Tour::new(tour.clone()), "manual");
                    let improved = strategy
                        .improve(&graph, &mut solution, SearchLimits::with_max_passes(1000))
                        .unwrap();
                    assert!(!improved, "{} moved at scale {} (seed {})", strategy, scale, seed);
                    assert_eq!(solution.passes, Some(1), "{} at scale {} (seed {})", strategy, scale, seed);
                    assert_eq!(solution.tour.nodes(), tour.as_slice());
                }
            }
        }
    }

    #[test]
    fn test_large_costs_still_improve() {
        // same structure as four_node_graph, shifted and scaled up
        let big = 1e9;
        let graph = CostGraph::from_matrix(vec![
            vec![INF, big + 1.0, big + 10.0, big + 5.0],
            vec![big + 5.0, INF, big + 1.0, big + 10.0],
            vec![big + 10.0, big + 5.0, INF, big + 1.0],
            vec![big + 1.0, big + 10.0, big + 5.0, INF],
        ])
        .unwrap();
        let (tour, cost) = two_opt(&graph, Tour::new(vec![0, 2, 1, 3]), SearchLimits::unbounded()).unwrap();
        assert_eq!(tour.nodes(), &[0, 1, 2, 3]);
        assert_eq!(cost, 4.0 * big + 4.0);
    }

    #[test]
    fn test_strategy_dispatch() {
        let graph = five_node_graph();
        for strategy in ImprovementStrategy::ALL {
            let mut solution = Solution::from_tour(&graph, Tour::new(vec![0, 4, 3, 2, 1]), "manual");
            let before = solution.cost;
            strategy.improve(&graph, &mut solution, SearchLimits::default()).unwrap();
            assert!(solution.cost <= before);
            assert!(solution.passes.is_some());
        }
    }
}
