//! Computes a static traffic assignment with the Frank-Wolfe method.
//!
//! Reads a road network and OD-pairs from CSV files, iterates until the iteration limit
//! or the convergence criterion is hit and writes statistics, flows and optionally paths and OD-distances
//! into the output directory. A JSON report of the run is printed to stdout.

use clap::{Parser, ValueEnum};
use log::info;
use rust_traffic_assignment::{
    algo::traffic_assignment::{adapters::cch::CchConfig, *},
    cli::CliErr,
    datastr::{graph::*, node_order::NodeOrder},
    export::{CsvSink, RunDescription},
    import,
    io::Load,
    report,
    report::*,
};
use std::{
    error::Error,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Objective {
    #[value(name = "sys_opt")]
    SystemOptimum,
    #[value(name = "user_eq")]
    UserEquilibrium,
    #[value(name = "combined_eq")]
    CombinedEquilibrium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CostFunction {
    #[value(name = "bpr")]
    Bpr,
    #[value(name = "modified_bpr")]
    ModifiedBpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    #[value(name = "dijkstra")]
    Dijkstra,
    #[value(name = "cch")]
    Cch,
}

#[derive(Parser, Debug)]
#[command(about = "Static traffic assignment with the Frank-Wolfe method")]
struct Args {
    /// Objective to minimize
    #[arg(long, value_enum, default_value = "sys_opt")]
    obj: Objective,
    /// Weight of the system optimum in the combined equilibrium
    #[arg(long, default_value_t = 0.0)]
    ce_param: f64,
    /// Travel cost function
    #[arg(short, long, value_enum, default_value = "bpr")]
    func: CostFunction,
    /// Shortest path algorithm
    #[arg(short, long, value_enum, default_value = "dijkstra")]
    algo: Algorithm,
    /// Number of iterations, 0 iterates until the OD-distances converge
    #[arg(short = 'n', long, default_value_t = 100)]
    iterations: usize,
    /// Road network CSV
    #[arg(short, long)]
    input: PathBuf,
    /// OD-pair CSV
    #[arg(long)]
    od: PathBuf,
    /// Directory for the CSV output
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Binary node order for the CCH, computed if missing
    #[arg(long)]
    order: Option<PathBuf>,
    /// OD-pairs per batched CCH query
    #[arg(short = 'k', long, default_value_t = 16)]
    batch_size: usize,
    /// Sampling interval of the first iterations, comma separated
    #[arg(long, value_delimiter = ',')]
    sampling_intervals: Vec<usize>,
    /// Size of the thread pool, all cores if missing
    #[arg(long)]
    threads: Option<usize>,
    /// Write the path of every OD-pair in every iteration
    #[arg(long)]
    paths: bool,
    /// Write the distance of every OD-pair in every iteration
    #[arg(long)]
    distances: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.verbose { "info" } else { "warn" })).init();

    if let Some(num_threads) = args.threads {
        rayon::ThreadPoolBuilder::new().num_threads(num_threads).build_global()?;
    }
    let _reporter = enable_reporting("assign_traffic");

    if !(0.0..=1.0).contains(&args.ce_param) {
        return Err(CliErr::from("combined equilibrium parameter must be in [0, 1]").into());
    }
    if args.batch_size == 0 {
        return Err(CliErr::from("batch size must be positive").into());
    }

    report!("input_graph", args.input.display().to_string());
    report!("od_pairs", args.od.display().to_string());
    let network = report_time("reading network", || import::read_network(&args.input))?;
    let od_pairs = report_time("reading OD-pairs", || import::read_od_pairs(&args.od, network.num_nodes(), network.num_edges()))?;
    report!("num_nodes", network.num_nodes());
    report!("num_edges", network.num_edges());
    report!("num_od_pairs", od_pairs.len());

    match args.func {
        CostFunction::Bpr => with_objective(&args, &network, &od_pairs, BprFunction::new(&network, BprParams::default())),
        CostFunction::ModifiedBpr => with_objective(&args, &network, &od_pairs, ModifiedBprFunction::new(&network, ModifiedBprParams::default())),
    }
}

fn with_objective<C: TravelCostFunction + Clone>(args: &Args, network: &RoadNetwork, od_pairs: &[OdPair], travel_cost: C) -> Result<(), Box<dyn Error>> {
    match args.obj {
        Objective::SystemOptimum => with_engine(args, network, od_pairs, SystemOptimum::new(travel_cost)),
        Objective::UserEquilibrium => with_engine(args, network, od_pairs, UserEquilibrium::new(travel_cost)),
        Objective::CombinedEquilibrium => with_engine(args, network, od_pairs, CombinedEquilibrium::new(travel_cost, args.ce_param)),
    }
}

fn with_engine<O: ObjectiveFunction>(args: &Args, network: &RoadNetwork, od_pairs: &[OdPair], objective: O) -> Result<(), Box<dyn Error>> {
    match args.algo {
        Algorithm::Dijkstra => assign(args, network, od_pairs, objective, DijkstraAdapter::new(network)),
        Algorithm::Cch => {
            let order = args.order.as_ref().map(|path| load_node_order(path, network.num_nodes())).transpose()?;
            let engine = CchAdapter::new(network, order, CchConfig { batch_size: args.batch_size });
            assign(args, network, od_pairs, objective, engine)
        }
    }
}

fn load_node_order(path: &Path, num_nodes: usize) -> Result<NodeOrder, Box<dyn Error>> {
    let order = Vec::<NodeId>::load_from(path)?;
    if order.len() != num_nodes {
        return Err(CliErr::from(format!("node order has {} entries but the network {} nodes", order.len(), num_nodes)).into());
    }
    let mut seen = vec![false; num_nodes];
    for &node in &order {
        if (node as usize) >= num_nodes || seen[node as usize] {
            return Err(CliErr::from("node order is not a permutation").into());
        }
        seen[node as usize] = true;
    }
    Ok(NodeOrder::from_node_order(order))
}

fn assign<O: ObjectiveFunction, E: ShortestPathEngine>(args: &Args, network: &RoadNetwork, od_pairs: &[OdPair], objective: O, engine: E) -> Result<(), Box<dyn Error>> {
    let config = AssignmentConfig {
        num_iterations: args.iterations,
        sampling_intervals: args.sampling_intervals.clone(),
        ..Default::default()
    };
    let weight_precision = config.weight_precision;
    let timer = Timer::new();
    let mut assignment = FrankWolfeAssignment::new(network, od_pairs, objective, engine, config)?;

    match &args.output {
        Some(output_dir) => {
            let run = RunDescription {
                input_graph: args.input.display().to_string(),
                od_pairs: args.od.display().to_string(),
                objective: format!("{:?}", args.obj),
                function: format!("{:?}", args.func),
                shortest_path_algo: format!("{:?}", args.algo),
                preprocessing_time: assignment.all_or_nothing_stats().preprocessing_time,
                weight_precision,
            };
            let mut sink = CsvSink::create(output_dir, &run, args.paths, args.distances)?;
            assignment.run(&mut sink)?;
        }
        None => assignment.run(&mut ())?,
    }

    info!(
        "assignment done after {} iterations - took: {}ms, objective {}, total travel cost {}",
        assignment.num_iterations(),
        timer.get_passed_ms(),
        assignment.stats.objective_value,
        assignment.stats.total_travel_cost
    );
    Ok(())
}
