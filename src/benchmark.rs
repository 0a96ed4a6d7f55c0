//! Benchmarking and experimentation module for the ATSP.
//!
//! Provides tools for running solver configurations repeatedly, collecting
//! statistics, and comparing algorithm performance.

use crate::error::Result;
use crate::graph::CostGraph;
use crate::heuristics::construction::ConstructionStrategy;
use crate::heuristics::local_search::{ImprovementStrategy, SearchLimits};
use crate::solution::Solution;
use crate::solver::{solve, SolverConfig};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Result of a single solver run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Number of nodes
    pub nodes: usize,
    /// Run number, starting at 0
    pub run: usize,
    /// Tour cost
    pub cost: f64,
    /// Computation time in seconds
    pub time: f64,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    /// Number of runs
    pub runs: usize,
    /// Runs whose tour avoids every forbidden edge
    pub finite_runs: usize,
    pub min_cost: f64,
    pub max_cost: f64,
    pub avg_cost: f64,
    /// Population standard deviation of cost
    pub std_cost: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub avg_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per solver configuration
    pub runs: usize,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            runs: 10,
            show_progress: true,
        }
    }
}

/// Every construction alone and followed by each improvement.
pub fn standard_configurations(start: usize, limits: SearchLimits) -> Vec<SolverConfig> {
    let mut configs = Vec::new();
    for construction in ConstructionStrategy::ALL {
        let base = SolverConfig {
            start,
            construction,
            improvements: Vec::new(),
            limits,
        };
        configs.push(base.clone());
        for improvement in ImprovementStrategy::ALL {
            configs.push(base.clone().with_improvement(improvement));
        }
    }
    configs
}

/// Benchmarking engine
pub struct Benchmark {
    instance: String,
    config: BenchmarkConfig,
    results: Vec<RunResult>,
}

impl Benchmark {
    pub fn new(instance: impl Into<String>, config: BenchmarkConfig) -> Self {
        Benchmark {
            instance: instance.into(),
            config,
            results: Vec::new(),
        }
    }

    fn progress_bar(&self, message: String) -> ProgressBar {
        let progress = if self.config.show_progress {
            ProgressBar::new(self.config.runs as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{msg:<32} [{bar:40}] {pos}/{len}") {
            progress.set_style(style.progress_chars("=> "));
        }
        progress.set_message(message);
        progress
    }

    /// Run one solver configuration `runs` times, recording every run.
    pub fn run(&mut self, graph: &CostGraph, solver: &SolverConfig) -> Result<()> {
        let name = solver.algorithm_name();
        log::info!("Benchmarking {} on {} ({} runs)", name, self.instance, self.config.runs);

        let progress = self.progress_bar(name);
        for run in 0..self.config.runs {
            let solution = solve(graph, solver)?;
            self.record_result(graph, run, &solution);
            progress.inc(1);
        }
        progress.finish_and_clear();
        Ok(())
    }

    /// Run every configuration in turn
    pub fn run_all(&mut self, graph: &CostGraph, solvers: &[SolverConfig]) -> Result<()> {
        for solver in solvers {
            self.run(graph, solver)?;
        }
        Ok(())
    }

    fn record_result(&mut self, graph: &CostGraph, run: usize, solution: &Solution) {
        self.results.push(RunResult {
            algorithm: solution.algorithm.clone(),
            instance: self.instance.clone(),
            nodes: graph.n(),
            run,
            cost: solution.cost,
            time: solution.computation_time,
        });
    }

    /// Compute statistics for each algorithm.
    ///
    /// Costs and times are taken over runs with a finite cost; algorithms
    /// without any such run are left out. Sorted by average cost.
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<&str, Vec<&RunResult>> = HashMap::new();
        for result in &self.results {
            stats_map.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics = Vec::new();
        for (algorithm, results) in stats_map {
            let finite: Vec<&RunResult> = results.iter().copied().filter(|r| r.cost.is_finite()).collect();
            if finite.is_empty() {
                log::warn!("{}: no run produced a finite tour", algorithm);
                continue;
            }

            let costs: Vec<f64> = finite.iter().map(|r| r.cost).collect();
            let times: Vec<f64> = finite.iter().map(|r| r.time).collect();

            statistics.push(AlgorithmStatistics {
                algorithm: algorithm.to_string(),
                runs: results.len(),
                finite_runs: finite.len(),
                min_cost: Statistics::min(&costs),
                max_cost: Statistics::max(&costs),
                avg_cost: Statistics::mean(&costs),
                std_cost: Statistics::population_std_dev(&costs),
                min_time: Statistics::min(&times),
                max_time: Statistics::max(&times),
                avg_time: Statistics::mean(&times),
            });
        }

        statistics.sort_by(|a, b| {
            a.avg_cost
                .total_cmp(&b.avg_cost)
                .then_with(|| a.algorithm.cmp(&b.algorithm))
        });
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("         ATSP Benchmark Report\n");
        report.push_str("========================================\n\n");
        report.push_str(&format!("Instance: {}\n", self.instance));
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        let stats = self.compute_statistics();

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(96).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<36} {:>8} {:>12} {:>12} {:>10} {:>12}\n",
            "Algorithm", "Finite", "Avg Cost", "Best Cost", "Std", "Avg Time"
        ));
        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        for stat in &stats {
            report.push_str(&format!(
                "{:<36} {:>8} {:>12.2} {:>12.2} {:>10.2} {:>11.4}s\n",
                stat.algorithm,
                format!("{}/{}", stat.finite_runs, stat.runs),
                stat.avg_cost,
                stat.min_cost,
                stat.std_cost,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        let best = self
            .results
            .iter()
            .filter(|r| r.cost.is_finite())
            .min_by(|a, b| a.cost.total_cmp(&b.cost));
        match best {
            Some(best) => report.push_str(&format!("\nBest solution: {:.2} ({})\n", best.cost, best.algorithm)),
            None => report.push_str("\nNo finite tour found\n"),
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}
