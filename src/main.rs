//! ATSP Solver - Command Line Interface
//!
//! Construction and local search heuristics for asymmetric cost matrices.

use atsp_solver::benchmark::{standard_configurations, Benchmark, BenchmarkConfig};
use atsp_solver::error::{Result, TspError};
use atsp_solver::generator::InstanceGenerator;
use atsp_solver::graph::CostGraph;
use atsp_solver::heuristics::construction::ConstructionStrategy;
use atsp_solver::heuristics::local_search::{ImprovementStrategy, SearchLimits};
use atsp_solver::reader::{read_cost_matrix, save_cost_matrix, ReaderOptions};
use atsp_solver::solution::Solution;
use atsp_solver::solver::{solve, SolverConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "atsp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Heuristic solver for the asymmetric Traveling Salesman Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a cost matrix with one construction and optional improvements
    Solve {
        /// Path to the cost matrix file
        matrix: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        solver: SolverArgs,

        /// Output solution to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run solver configurations repeatedly and report statistics
    Benchmark {
        /// Path to the cost matrix file
        matrix: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        solver: SolverArgs,

        /// Number of runs per configuration
        #[arg(short, long, default_value = "10")]
        runs: usize,

        /// Run every construction alone, with 2-opt and with 3-opt
        #[arg(long)]
        all: bool,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a cost matrix
    Analyze {
        /// Path to the cost matrix file
        matrix: PathBuf,

        #[command(flatten)]
        input: InputArgs,
    },

    /// Generate a random cost matrix
    Generate {
        /// Number of nodes
        #[arg(short, long)]
        nodes: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        #[arg(long, default_value = "1")]
        min_cost: i64,

        #[arg(long, default_value = "100")]
        max_cost: i64,

        /// Probability that an edge is forbidden
        #[arg(long, default_value = "0.0")]
        missing: f64,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Field delimiter of the matrix file
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// The file has no header row of labels
    #[arg(long)]
    no_header: bool,
}

impl InputArgs {
    fn reader_options(&self) -> Result<ReaderOptions> {
        if !self.delimiter.is_ascii() {
            return Err(TspError::Validation(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )));
        }
        Ok(ReaderOptions {
            has_header: !self.no_header,
            delimiter: self.delimiter as u8,
        })
    }

    fn load(&self, path: &Path) -> Result<CostGraph> {
        println!("Loading cost matrix from {:?}...", path);
        read_cost_matrix(path, &self.reader_options()?)
    }
}

#[derive(Args)]
struct SolverArgs {
    /// Start node, by label or index
    #[arg(long)]
    start: Option<String>,

    /// Construction heuristic
    #[arg(short, long, value_enum, default_value = "nearest-neighbor")]
    algorithm: Construction,

    /// Improvement heuristic, may be repeated
    #[arg(short, long, value_enum)]
    improve: Vec<Improvement>,

    /// Maximum passes per improvement (ignored with --timeout)
    #[arg(long, default_value = "100")]
    max_passes: usize,

    /// Run improvements until no improving move remains
    #[arg(long, conflicts_with = "max_passes")]
    converge: bool,

    /// Time limit per improvement in seconds
    #[arg(short, long)]
    timeout: Option<f64>,
}

impl SolverArgs {
    fn limits(&self) -> Result<SearchLimits> {
        let timeout = match self.timeout {
            Some(secs) => Some(Duration::try_from_secs_f64(secs).map_err(|_| {
                TspError::Validation(format!("timeout {} must be a non-negative number of seconds", secs))
            })?),
            None => None,
        };
        Ok(SearchLimits {
            max_passes: if self.converge { None } else { Some(self.max_passes) },
            timeout,
        })
    }

    fn start(&self, graph: &CostGraph) -> Result<usize> {
        match &self.start {
            None => Ok(0),
            Some(start) => graph.index_of(start).or_else(|_| match start.parse::<usize>() {
                Ok(index) => graph.resolve(index),
                Err(_) => Err(TspError::UnknownLabel(start.clone())),
            }),
        }
    }

    fn config(&self, graph: &CostGraph) -> Result<SolverConfig> {
        Ok(SolverConfig {
            start: self.start(graph)?,
            construction: self.algorithm.into(),
            improvements: self.improve.iter().map(|&improvement| improvement.into()).collect(),
            limits: self.limits()?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Construction {
    /// Nearest Neighbor construction
    NearestNeighbor,
    /// Cheapest Insertion construction
    CheapestInsertion,
}

impl From<Construction> for ConstructionStrategy {
    fn from(construction: Construction) -> Self {
        match construction {
            Construction::NearestNeighbor => ConstructionStrategy::NearestNeighbor,
            Construction::CheapestInsertion => ConstructionStrategy::CheapestInsertion,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Improvement {
    /// 2-Opt local search
    TwoOpt,
    /// 3-Opt local search
    ThreeOpt,
}

impl From<Improvement> for ImprovementStrategy {
    fn from(improvement: Improvement) -> Self {
        match improvement {
            Improvement::TwoOpt => ImprovementStrategy::TwoOpt,
            Improvement::ThreeOpt => ImprovementStrategy::ThreeOpt,
        }
    }
}

/// JSON form of a solution, with the tour also given as labels
#[derive(Serialize)]
struct SolutionOutput<'a> {
    #[serde(flatten)]
    solution: &'a Solution,
    labels: Vec<String>,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve {
            matrix,
            input,
            solver,
            output,
            verbose,
        } => solve_matrix(&matrix, &input, &solver, output, verbose),

        Commands::Benchmark {
            matrix,
            input,
            solver,
            runs,
            all,
            output,
        } => run_benchmark(&matrix, &input, &solver, runs, all, output),

        Commands::Analyze { matrix, input } => analyze_matrix(&matrix, &input),

        Commands::Generate {
            nodes,
            seed,
            min_cost,
            max_cost,
            missing,
            output,
        } => generate_matrix(
            InstanceGenerator {
                nodes,
                min_cost,
                max_cost,
                missing_edge_probability: missing,
                seed,
            },
            &output,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn solve_matrix(path: &Path, input: &InputArgs, args: &SolverArgs, output: Option<PathBuf>, verbose: bool) -> Result<()> {
    let graph = input.load(path)?;

    if verbose {
        println!("{}", graph.statistics());
    }

    let config = args.config(&graph)?;
    println!("Solving with {}...", config.algorithm_name());
    let solution = solve(&graph, &config)?;

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Start: {}", graph.label(config.start)?);
    println!("Cost: {:.2}", solution.cost);
    if !solution.is_finite() {
        println!("Warning: the tour uses at least one forbidden edge");
    }
    println!("Time: {:.4}s", solution.computation_time);
    if let Some(passes) = solution.passes {
        println!("Passes: {}", passes);
    }
    println!("Tour: {}", solution.labelled_tour(&graph).join(" -> "));

    if verbose {
        println!("\nTour (indices): {:?}", solution.tour.nodes());
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&SolutionOutput {
            solution: &solution,
            labels: solution.labelled_tour(&graph),
        })?;
        std::fs::write(&out_path, json)?;
        println!("\nSolution saved to {:?}", out_path);
    }

    Ok(())
}

fn run_benchmark(
    path: &Path,
    input: &InputArgs,
    args: &SolverArgs,
    runs: usize,
    all: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let graph = input.load(path)?;
    let instance = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "instance".to_string());

    let configs = if all {
        standard_configurations(args.start(&graph)?, args.limits()?)
    } else {
        vec![args.config(&graph)?]
    };

    println!("Benchmarking {} configurations on {} (n={})...", configs.len(), instance, graph.n());

    let mut benchmark = Benchmark::new(
        instance,
        BenchmarkConfig {
            runs,
            ..Default::default()
        },
    );
    benchmark.run_all(&graph, &configs)?;

    let report = benchmark.generate_report();
    println!("\n{}", report);

    if let Some(output) = output {
        std::fs::create_dir_all(&output)?;

        let results_path = output.join("results.csv");
        benchmark.export_to_csv(&results_path)?;
        println!("Results exported to {:?}", results_path);

        let stats_path = output.join("statistics.csv");
        benchmark.export_statistics_csv(&stats_path)?;
        println!("Statistics exported to {:?}", stats_path);

        let report_path = output.join("report.txt");
        std::fs::write(&report_path, &report)?;
        println!("Report saved to {:?}", report_path);
    }

    Ok(())
}

fn analyze_matrix(path: &Path, input: &InputArgs) -> Result<()> {
    let graph = input.load(path)?;

    println!("========== Matrix Analysis ==========\n");
    println!("{}", graph.statistics());

    let unreachable: Vec<&str> = (0..graph.n())
        .filter(|&j| (0..graph.n()).all(|i| graph.edge(i, j).is_infinite()))
        .map(|j| graph.labels()[j].as_str())
        .collect();
    let dead_ends: Vec<&str> = (0..graph.n())
        .filter(|&i| (0..graph.n()).all(|j| graph.edge(i, j).is_infinite()))
        .map(|i| graph.labels()[i].as_str())
        .collect();
    if !unreachable.is_empty() {
        println!("Nodes without incoming edges: {}", unreachable.join(", "));
    }
    if !dead_ends.is_empty() {
        println!("Nodes without outgoing edges: {}", dead_ends.join(", "));
    }

    println!("\nQuick Solution Estimates:");
    for config in standard_configurations(0, SearchLimits::default()) {
        let solution = solve(&graph, &config)?;
        println!("  {:<32} {:>12.2} ({:.4}s)", solution.algorithm, solution.cost, solution.computation_time);
    }

    Ok(())
}

fn generate_matrix(generator: InstanceGenerator, output: &Path) -> Result<()> {
    let graph = generator.generate()?;
    save_cost_matrix(&graph, output)?;
    println!("Generated {} nodes (seed {}) into {:?}", graph.n(), generator.seed, output);
    Ok(())
}
