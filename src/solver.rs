//! Construction followed by a chain of improvement heuristics.

use crate::error::Result;
use crate::graph::CostGraph;
use crate::heuristics::construction::ConstructionStrategy;
use crate::heuristics::local_search::{ImprovementStrategy, SearchLimits};
use crate::solution::Solution;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// What to run and from where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Node the tour starts from
    pub start: usize,
    pub construction: ConstructionStrategy,
    /// Applied in order to the constructed tour
    pub improvements: Vec<ImprovementStrategy>,
    /// Bounds for each improvement step
    pub limits: SearchLimits,
}

impl SolverConfig {
    pub fn new(construction: ConstructionStrategy) -> Self {
        SolverConfig {
            construction,
            ..Default::default()
        }
    }

    pub fn with_improvement(mut self, improvement: ImprovementStrategy) -> Self {
        self.improvements.push(improvement);
        self
    }

    /// Name of the pipeline, e.g. `cheapest_insertion + 2-opt`
    pub fn algorithm_name(&self) -> String {
        std::iter::once(self.construction.name())
            .chain(self.improvements.iter().map(|improvement| improvement.name()))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            start: 0,
            construction: ConstructionStrategy::default(),
            improvements: Vec::new(),
            limits: SearchLimits::default(),
        }
    }
}

/// Build a tour with the configured construction and improve it.
///
/// `passes` on the result holds the total over all improvement steps.
pub fn solve(graph: &CostGraph, config: &SolverConfig) -> Result<Solution> {
    let timer = Instant::now();
    let mut solution = config.construction.construct(graph, config.start)?;
    log::debug!("constructed tour with {}: cost {:.2}", config.construction, solution.cost);

    let mut total_passes = None;
    for improvement in &config.improvements {
        improvement.improve(graph, &mut solution, config.limits)?;
        if let Some(passes) = solution.passes {
            total_passes = Some(total_passes.unwrap_or(0) + passes);
        }
    }

    solution.evaluate(graph);
    solution.passes = total_passes;
    solution.algorithm = config.algorithm_name();
    solution.computation_time = timer.elapsed().as_secs_f64();
    log::info!("{}: cost {:.2} in {:.4}s", solution.algorithm, solution.cost, solution.computation_time);
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TspError;
    use crate::tour::tour_cost;

    const INF: f64 = f64::INFINITY;

    fn graph() -> CostGraph {
        CostGraph::from_matrix(vec![
            vec![INF, 1.0, 10.0, 5.0, 8.0],
            vec![5.0, INF, 1.0, 10.0, 3.0],
            vec![10.0, 5.0, INF, 1.0, 7.0],
            vec![1.0, 10.0, 5.0, INF, 2.0],
            vec![8.0, 3.0, 7.0, 2.0, INF],
        ])
        .unwrap()
    }

    #[test]
    fn test_algorithm_name() {
        assert_eq!(SolverConfig::default().algorithm_name(), "nearest_neighbor");
        let config = SolverConfig::new(ConstructionStrategy::CheapestInsertion)
            .with_improvement(ImprovementStrategy::TwoOpt)
            .with_improvement(ImprovementStrategy::ThreeOpt);
        assert_eq!(config.algorithm_name(), "cheapest_insertion + 2-opt + 3-opt");
    }

    #[test]
    fn test_construction_only() {
        let graph = graph();
        let solution = solve(&graph, &SolverConfig::default()).unwrap();
        assert_eq!(solution.algorithm, "nearest_neighbor");
        assert_eq!(solution.passes, None);
        assert_eq!(solution.cost, tour_cost(&graph, solution.tour.nodes()));
    }

    #[test]
    fn test_pipeline_never_worsens_construction() {
        let graph = graph();
        for construction in ConstructionStrategy::ALL {
            for start in 0..graph.n() {
                let base = SolverConfig {
                    start,
                    ..SolverConfig::new(construction)
                };
                let constructed = solve(&graph, &base).unwrap();

                let improved_config = base
                    .clone()
                    .with_improvement(ImprovementStrategy::TwoOpt)
                    .with_improvement(ImprovementStrategy::ThreeOpt);
                let improved = solve(&graph, &improved_config).unwrap();

                assert_eq!(improved.tour[0], start);
                assert!(improved.tour.validate(graph.n()).is_ok());
                assert!(improved.cost <= constructed.cost);
                assert!(improved.passes.unwrap() >= 2);
            }
        }
    }

    #[test]
    fn test_invalid_start() {
        let graph = graph();
        let config = SolverConfig {
            start: 9,
            ..Default::default()
        };
        assert!(matches!(solve(&graph, &config), Err(TspError::Range { index: 9, n: 5 })));
    }
}
