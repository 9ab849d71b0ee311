//! The Frank-Wolfe method with conjugate descent directions.

use super::*;
use crate::cli::CliErr;
use crate::report::*;
use log::{info, warn};
use rayon::prelude::*;
use std::{error::Error, time::Duration};

/// Settings of a Frank-Wolfe run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentConfig {
    /// Stop after this many iterations, the initial assignment included.
    /// Zero iterates until the average change of the OD-distances falls below `convergence_threshold`.
    pub num_iterations: usize,
    /// Iteration `i` routes only every `sampling_intervals[i - 1]`-th OD-pair, later iterations all of them.
    pub sampling_intervals: Vec<usize>,
    pub convergence_threshold: f64,
    /// Search weight units per unit of travel cost.
    pub weight_precision: f64,
    pub line_search_tolerance: f64,
    /// Defaults to the size of the rayon thread pool.
    pub num_workers: Option<usize>,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        AssignmentConfig {
            num_iterations: 100,
            sampling_intervals: Vec::new(),
            convergence_threshold: 1e-2,
            weight_precision: DEFAULT_PRECISION,
            line_search_tolerance: 1e-10,
            num_workers: None,
        }
    }
}

impl AssignmentConfig {
    pub fn validate(&self) -> Result<(), CliErr> {
        if self.sampling_intervals.iter().any(|&interval| interval == 0) {
            return Err("sampling intervals must be positive".into());
        }
        if self.sampling_intervals.windows(2).any(|pair| pair[0] % pair[1] != 0) {
            return Err("each sampling interval must divide its predecessor".into());
        }
        if !(self.weight_precision > 0.0) {
            return Err("weight precision must be positive".into());
        }
        if !(self.line_search_tolerance > 0.0) {
            return Err("line search tolerance must be positive".into());
        }
        if !(self.convergence_threshold >= 0.0) {
            return Err("convergence threshold must not be negative".into());
        }
        if self.num_workers == Some(0) {
            return Err("number of workers must be positive".into());
        }
        Ok(())
    }

    pub fn sampling_interval(&self, iteration: usize) -> usize {
        self.sampling_intervals.get(iteration - 1).copied().unwrap_or(1)
    }
}

/// Weight of the previous direction in the conjugate direction.
/// A zero denominator yields the largest factor for a positive numerator and zero otherwise.
fn conjugate_factor(numerator: f64, denominator: f64) -> f64 {
    let alpha = numerator / denominator;
    if alpha.is_nan() {
        0.0
    } else {
        alpha.clamp(0.0, 1.0 - 1e-15)
    }
}

/// Solves the assignment for an objective with the Frank-Wolfe method.
///
/// The first iteration assigns all demand to the shortest paths of the empty network.
/// Every later iteration computes an all-or-nothing assignment under the current marginal costs,
/// combines it with the previous direction into a conjugate direction and moves the flows
/// along it by the step size minimizing the objective.
pub struct FrankWolfeAssignment<'a, O, E> {
    network: &'a RoadNetwork,
    objective: O,
    aon: AllOrNothingAssignment<'a, E>,
    config: AssignmentConfig,
    traffic_flows: Vec<f64>,
    point_of_sight: Vec<f64>,
    edge_costs: Vec<f64>,
    weights: Vec<Weight>,
    iteration_weights: Vec<f64>,
    pub stats: FrankWolfeStats,
}

impl<'a, O: ObjectiveFunction, E: ShortestPathEngine> FrankWolfeAssignment<'a, O, E> {
    /// Checks the configuration, then preprocesses the engine.
    pub fn new(network: &'a RoadNetwork, od_pairs: &'a [OdPair], objective: O, engine: E, config: AssignmentConfig) -> Result<Self, CliErr> {
        config.validate()?;
        let mut aon = AllOrNothingAssignment::new(network, od_pairs, engine);
        if let Some(num_workers) = config.num_workers {
            aon.set_num_workers(num_workers);
        }
        let m = network.num_edges();

        Ok(FrankWolfeAssignment {
            network,
            objective,
            aon,
            config,
            traffic_flows: vec![0.0; m],
            point_of_sight: vec![0.0; m],
            edge_costs: vec![0.0; m],
            weights: vec![0; m],
            iteration_weights: Vec::new(),
            stats: Default::default(),
        })
    }

    /// Iterate until the configured termination criterion holds.
    pub fn run(&mut self, sink: &mut dyn AssignmentSink) -> Result<(), Box<dyn Error>> {
        self.aon.set_record_paths(sink.wants_paths());

        let mut iterations_ctxt = push_collection_context("iterations".to_string());
        loop {
            let _iteration_ctxt = iterations_ctxt.push_collection_item();
            let timer = Timer::new();
            let iteration = self.aon.stats.num_iterations + 1;
            let sampling_interval = self.config.sampling_interval(iteration);

            if iteration == 1 {
                self.determine_initial_solution(sampling_interval);
                self.stats.last_line_search_time = Duration::ZERO;
                self.stats.last_step_size = 1.0;
            } else {
                self.update_travel_costs();
                self.find_descent_direction(sampling_interval);
                let line_search_timer = Timer::new();
                let tau = self.find_move_size();
                if self.line_search_stalled(tau) {
                    warn!(
                        "zero step size in iteration {} although the descent direction is not zero, the next OD-distances will not change",
                        iteration
                    );
                }
                self.stats.last_step_size = tau;
                self.move_along_descent_direction(tau);
                self.update_iteration_weights(tau);
                self.stats.last_line_search_time = line_search_timer.get_passed();
            }

            self.finish_iteration(sampling_interval, timer.get_passed(), sink)?;
            if self.terminated() {
                break;
            }
        }
        drop(iterations_ctxt);

        self.report_totals();
        if sink.wants_flow_pattern() {
            sink.flow_pattern(&self.flow_pattern())?;
        }
        sink.iteration_weights(&self.iteration_weights)?;
        Ok(())
    }

    fn determine_initial_solution(&mut self, sampling_interval: usize) {
        let objective = &self.objective;
        self.edge_costs
            .par_iter_mut()
            .enumerate()
            .for_each(|(edge, cost)| *cost = objective.derivative(edge as EdgeId, 0.0));
        self.assign_all_or_nothing(sampling_interval);
        self.traffic_flows.copy_from_slice(self.aon.traffic_flows());
        self.iteration_weights = vec![1.0];
    }

    fn update_travel_costs(&mut self) {
        let objective = &self.objective;
        self.edge_costs
            .par_iter_mut()
            .zip(self.traffic_flows.par_iter())
            .enumerate()
            .for_each(|(edge, (cost, &flow))| *cost = objective.derivative(edge as EdgeId, flow));
    }

    fn assign_all_or_nothing(&mut self, sampling_interval: usize) {
        let precision = self.config.weight_precision;
        for (weight, &cost) in self.weights.iter_mut().zip(&self.edge_costs) {
            *weight = cost_to_weight(cost, precision);
        }
        self.aon.customize(&self.weights);
        self.aon.run(sampling_interval);
    }

    fn find_descent_direction(&mut self, sampling_interval: usize) {
        self.assign_all_or_nothing(sampling_interval);
        let auxiliary = self.aon.traffic_flows();

        // no previous direction to be conjugate to
        if self.aon.stats.num_iterations == 2 {
            self.point_of_sight.copy_from_slice(auxiliary);
            return;
        }

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (edge, ((&flow, &point_of_sight), &auxiliary_flow)) in self.traffic_flows.iter().zip(&self.point_of_sight).zip(auxiliary).enumerate() {
            let residual = point_of_sight - flow;
            let direction = auxiliary_flow - flow;
            let curvature = self.objective.second_derivative(edge as EdgeId, flow);
            numerator += residual * curvature * direction;
            denominator += residual * curvature * (direction - residual);
        }

        let alpha = conjugate_factor(numerator, denominator);
        for (point_of_sight, &auxiliary_flow) in self.point_of_sight.iter_mut().zip(auxiliary) {
            *point_of_sight = alpha * *point_of_sight + (1.0 - alpha) * auxiliary_flow;
        }
    }

    fn find_move_size(&self) -> f64 {
        let objective = &self.objective;
        let flows = &self.traffic_flows;
        let point_of_sight = &self.point_of_sight;
        line_search::bisection_method(
            |tau| {
                flows
                    .iter()
                    .zip(point_of_sight)
                    .enumerate()
                    .map(|(edge, (&flow, &target))| {
                        let direction = target - flow;
                        direction * objective.derivative(edge as EdgeId, flow + tau * direction)
                    })
                    .sum()
            },
            0.0,
            1.0,
            self.config.line_search_tolerance,
        )
    }

    fn line_search_stalled(&self, tau: f64) -> bool {
        tau == 0.0 && self.traffic_flows != self.point_of_sight
    }

    fn move_along_descent_direction(&mut self, tau: f64) {
        for (flow, &target) in self.traffic_flows.iter_mut().zip(&self.point_of_sight) {
            *flow += tau * (target - *flow);
        }
    }

    fn update_iteration_weights(&mut self, tau: f64) {
        self.iteration_weights.iter_mut().for_each(|weight| *weight *= 1.0 - tau);
        self.iteration_weights.push(tau);
    }

    fn terminated(&self) -> bool {
        let iteration = self.aon.stats.num_iterations;
        if self.config.num_iterations > 0 {
            return iteration >= self.config.num_iterations;
        }
        match self.aon.stats.avg_change_in_distances {
            Some(avg_change) => avg_change <= self.config.convergence_threshold,
            None if iteration > 1 => {
                warn!("no OD-distances to compare, stopping after iteration {}", iteration);
                true
            }
            None => false,
        }
    }

    fn finish_iteration(&mut self, sampling_interval: usize, running_time: Duration, sink: &mut dyn AssignmentSink) -> Result<(), Box<dyn Error>> {
        self.stats.last_running_time = running_time;
        self.stats.total_running_time += running_time;
        self.stats.total_line_search_time += self.stats.last_line_search_time;
        self.stats.objective_value = self.objective.value(&self.traffic_flows);
        self.stats.total_travel_cost = total_travel_cost(self.objective.travel_cost_function(), &self.traffic_flows);

        let aon = &self.aon.stats;
        let record = IterationStats {
            iteration: aon.num_iterations,
            sampling_interval,
            customization_time_ms: aon.last_customization_time.as_secs_f64() * 1000.0,
            query_time_ms: aon.last_query_time.as_secs_f64() * 1000.0,
            line_search_time_ms: self.stats.last_line_search_time.as_secs_f64() * 1000.0,
            total_time_ms: running_time.as_secs_f64() * 1000.0,
            avg_change_in_distances: aon.avg_change_in_distances,
            max_change_in_distances: aon.max_change_in_distances,
            objective_value: self.stats.objective_value,
            total_travel_cost: self.stats.total_travel_cost,
            checksum: aon.last_checksum,
        };

        report!("iteration", record.iteration);
        report!("sampling_interval", record.sampling_interval);
        report!("customization_time_ms", record.customization_time_ms);
        report!("query_time_ms", record.query_time_ms);
        report!("line_search_time_ms", record.line_search_time_ms);
        report!("running_time_ms", record.total_time_ms);
        report!("avg_change_in_distances", record.avg_change_in_distances);
        report!("max_change_in_distances", record.max_change_in_distances);
        report!("objective_value", record.objective_value);
        report!("total_travel_cost", record.total_travel_cost);
        report!("checksum", record.checksum);

        info!(
            "iteration {} (interval {}): {}ms, routing {}ms, objective {}, total travel cost {}, avg change {:?}, max change {:?}",
            record.iteration,
            sampling_interval,
            record.total_time_ms,
            aon.last_routing_time().as_secs_f64() * 1000.0,
            record.objective_value,
            record.total_travel_cost,
            record.avg_change_in_distances,
            record.max_change_in_distances
        );

        sink.iteration(&record)?;
        if sink.wants_distances() {
            sink.distances(record.iteration, &self.aon.distances())?;
        }
        if sink.wants_paths() {
            sink.paths(record.iteration, self.aon.paths())?;
        }
        Ok(())
    }

    fn report_totals(&self) {
        let aon = &self.aon.stats;
        let ms = |time: Duration| time.as_secs_f64() * 1000.0;
        report!("num_iterations", aon.num_iterations);
        report!("total_checksum", aon.total_checksum);
        report!("total_customization_time_ms", ms(aon.total_customization_time));
        report!("total_query_time_ms", ms(aon.total_query_time));
        report!("total_routing_time_ms", ms(aon.total_routing_time()));
        report!("total_line_search_time_ms", ms(self.stats.total_line_search_time));
        report!("total_running_time_ms", ms(self.stats.total_running_time));

        info!(
            "total: checksum {} prepro {}ms custom {}ms queries {}ms routing {}ms line search {}ms total {}ms",
            aon.total_checksum,
            ms(aon.preprocessing_time),
            ms(aon.total_customization_time),
            ms(aon.total_query_time),
            ms(aon.total_routing_time()),
            ms(self.stats.total_line_search_time),
            ms(self.stats.total_running_time)
        );
    }

    /// Every edge with its current flow and cost.
    pub fn flow_pattern(&self) -> Vec<FlowPatternRecord> {
        let travel_cost = self.objective.travel_cost_function();
        (0..self.network.num_edges() as EdgeId)
            .map(|edge| {
                let flow = self.traffic_flows[edge as usize];
                FlowPatternRecord {
                    num_iteration: self.aon.stats.num_iterations,
                    tail: self.network.tail(edge),
                    head: self.network.head(edge),
                    free_flow_cost: self.network.free_flow_time(edge),
                    actual_cost: travel_cost.eval(edge, flow),
                    capacity: self.network.capacity(edge),
                    flow,
                }
            })
            .collect()
    }

    pub fn traffic_flow_on(&self, edge: EdgeId) -> f64 {
        self.traffic_flows[edge as usize]
    }

    pub fn traffic_flows(&self) -> &[f64] {
        &self.traffic_flows
    }

    pub fn iteration_weights(&self) -> &[f64] {
        &self.iteration_weights
    }

    pub fn num_iterations(&self) -> usize {
        self.aon.stats.num_iterations
    }

    pub fn all_or_nothing_stats(&self) -> &AllOrNothingStats {
        &self.aon.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn edge(tail: NodeId, head: NodeId, length: f64, capacity: f64, speed: f64) -> EdgeAttributes {
        EdgeAttributes {
            tail,
            head,
            length,
            capacity,
            speed,
        }
    }

    fn config(num_iterations: usize) -> AssignmentConfig {
        AssignmentConfig {
            num_iterations,
            num_workers: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn initial_solution_on_a_path() {
        let network = RoadNetwork::new(3, &[edge(0, 1, 100.0, 10.0, 50.0), edge(1, 2, 100.0, 10.0, 50.0)]);
        let od_pairs = [OdPair::new(0, 2, 5.0)];
        let bpr = BprFunction::new(&network, BprParams::default());
        let mut assignment = FrankWolfeAssignment::new(&network, &od_pairs, UserEquilibrium::new(bpr), DijkstraAdapter::new(&network), config(1)).unwrap();
        let mut sink = CollectingSink::default();
        assignment.run(&mut sink).unwrap();

        assert_eq!(assignment.num_iterations(), 1);
        assert_eq!(assignment.traffic_flows(), &[5.0, 5.0]);
        assert_relative_eq!(assignment.stats.total_travel_cost, 5.0 * (bpr.eval(0, 5.0) + bpr.eval(1, 5.0)));
        assert_relative_eq!(assignment.stats.objective_value, bpr.integral(0, 5.0) + bpr.integral(1, 5.0));
        assert_eq!(sink.iterations.len(), 1);
        assert_eq!(sink.iteration_weights, vec![1.0]);
        assert_eq!(sink.paths, vec![vec![vec![0, 1]]]);
        assert_eq!(sink.flow_pattern.len(), 2);
        assert_eq!(sink.flow_pattern[1].tail, 1);
        assert_relative_eq!(sink.flow_pattern[1].actual_cost, bpr.eval(1, 5.0));
    }

    #[test]
    fn single_edge_converges_immediately() {
        let network = RoadNetwork::new(2, &[edge(0, 1, 1000.0, 20.0, 36.0)]);
        let od_pairs = [OdPair::new(0, 1, 30.0)];
        let bpr = BprFunction::new(&network, BprParams::default());
        let mut assignment = FrankWolfeAssignment::new(&network, &od_pairs, SystemOptimum::new(bpr), DijkstraAdapter::new(&network), config(0)).unwrap();
        assignment.run(&mut ()).unwrap();

        // marginal costs rise in the second iteration, the third one repeats them
        assert_eq!(assignment.num_iterations(), 3);
        assert_relative_eq!(assignment.traffic_flow_on(0), 30.0);
        assert_relative_eq!(assignment.stats.objective_value, 30.0 * bpr.eval(0, 30.0));
        assert_eq!(assignment.all_or_nothing_stats().avg_change_in_distances, Some(0.0));

        // nothing left to move, which is not a stalled line search
        assert_eq!(assignment.stats.last_step_size, 0.0);
        assert!(!assignment.line_search_stalled(0.0));
        assignment.point_of_sight[0] = 10.0;
        assert!(assignment.line_search_stalled(0.0));
        assert!(!assignment.line_search_stalled(0.5));
    }

    #[test]
    fn no_comparable_distances_stops_convergence_run() {
        // a free demand edge: the first distance is zero, the second one is not
        let network = RoadNetwork::new(2, &[edge(0, 1, 100.0, 0.0, 0.0)]);
        let od_pairs = [OdPair::new(0, 1, 30.0)];
        let bpr = BprFunction::new(&network, BprParams::default());
        let mut assignment = FrankWolfeAssignment::new(&network, &od_pairs, UserEquilibrium::new(bpr), DijkstraAdapter::new(&network), config(0)).unwrap();
        let mut sink = CollectingSink::default();
        assignment.run(&mut sink).unwrap();

        assert_eq!(assignment.num_iterations(), 2);
        assert_eq!(sink.distances, vec![vec![Some(0)], vec![Some(1_500_000)]]);
        let changes: Vec<Option<f64>> = sink.iterations.iter().map(|stats| stats.avg_change_in_distances).collect();
        assert_eq!(changes, vec![None, None]);
        assert_relative_eq!(assignment.traffic_flow_on(0), 30.0);
    }

    #[test]
    fn conjugate_factor_is_clamped() {
        assert_relative_eq!(conjugate_factor(1.0, 4.0), 0.25);
        assert_eq!(conjugate_factor(-1.0, 4.0), 0.0);
        assert_eq!(conjugate_factor(5.0, 4.0), 1.0 - 1e-15);
        // a vanishing denominator keeps as much of the previous direction as allowed
        assert_eq!(conjugate_factor(1.0, 0.0), 1.0 - 1e-15);
        assert_eq!(conjugate_factor(-1.0, 0.0), 0.0);
        assert_eq!(conjugate_factor(0.0, 0.0), 0.0);
    }

    //
    //        +--- 1 ---+
    //        |         |
    //   0 ---+         +---> 3
    //        |         |
    //        +--- 2 ---+
    //
    fn two_routes() -> RoadNetwork {
        RoadNetwork::new(
            4,
            &[
                edge(0, 1, 1000.0, 100.0, 50.0),
                edge(1, 3, 1000.0, 100.0, 50.0),
                edge(0, 2, 1200.0, 300.0, 50.0),
                edge(2, 3, 1200.0, 300.0, 50.0),
            ],
        )
    }

    fn assign<O: ObjectiveFunction>(network: &RoadNetwork, objective: O, iterations: usize) -> (Vec<f64>, Vec<IterationStats>, Vec<f64>) {
        let od_pairs = [OdPair::new(0, 3, 400.0)];
        let mut assignment = FrankWolfeAssignment::new(network, &od_pairs, objective, DijkstraAdapter::new(network), config(iterations)).unwrap();
        let mut sink = CollectingSink::default();
        assignment.run(&mut sink).unwrap();
        (assignment.traffic_flows().to_vec(), sink.iterations, sink.iteration_weights)
    }

    #[test]
    fn user_equilibrium_splits_and_objective_decreases() {
        let network = two_routes();
        let bpr = BprFunction::new(&network, BprParams::default());
        let (flows, iterations, weights) = assign(&network, UserEquilibrium::new(bpr), 40);

        assert_eq!(iterations.len(), 40);
        for pair in iterations.windows(2) {
            assert!(pair[1].objective_value <= pair[0].objective_value * (1.0 + 1e-12));
        }
        // demand is conserved on both cuts
        assert_relative_eq!(flows[0] + flows[2], 400.0, max_relative = 1e-9);
        assert_relative_eq!(flows[1] + flows[3], 400.0, max_relative = 1e-9);
        assert!(flows[0] > 0.0 && flows[2] > 0.0);
        // both used routes have about the same cost
        let upper = bpr.eval(0, flows[0]) + bpr.eval(1, flows[1]);
        let lower = bpr.eval(2, flows[2]) + bpr.eval(3, flows[3]);
        assert_relative_eq!(upper, lower, max_relative = 1e-2);

        assert_eq!(weights.len(), 40);
        assert_relative_eq!(weights.iter().sum::<f64>(), 1.0, max_relative = 1e-9);
    }

    #[test]
    fn system_optimum_objective_decreases() {
        let network = two_routes();
        let bpr = BprFunction::new(&network, BprParams::default());
        let (flows, iterations, _) = assign(&network, SystemOptimum::new(bpr), 25);

        for pair in iterations.windows(2) {
            assert!(pair[1].objective_value <= pair[0].objective_value * (1.0 + 1e-12));
        }
        let last = iterations.last().unwrap();
        assert_relative_eq!(last.objective_value, last.total_travel_cost);
        // the marginal costs equalize instead of the travel costs
        let so = SystemOptimum::new(bpr);
        let upper = so.derivative(0, flows[0]) + so.derivative(1, flows[1]);
        let lower = so.derivative(2, flows[2]) + so.derivative(3, flows[3]);
        assert_relative_eq!(upper, lower, max_relative = 1e-2);
    }

    #[test]
    fn sampling_schedule_is_applied() {
        let network = two_routes();
        let bpr = BprFunction::new(&network, BprParams::default());
        let od_pairs: Vec<OdPair> = (0..8).map(|_| OdPair::new(0, 3, 50.0)).collect();
        let config = AssignmentConfig {
            sampling_intervals: vec![4, 2],
            ..config(3)
        };
        let mut assignment = FrankWolfeAssignment::new(&network, &od_pairs, UserEquilibrium::new(bpr), DijkstraAdapter::new(&network), config).unwrap();
        let mut sink = CollectingSink::default();
        assignment.run(&mut sink).unwrap();

        let intervals: Vec<usize> = sink.iterations.iter().map(|stats| stats.sampling_interval).collect();
        assert_eq!(intervals, vec![4, 2, 1]);
        // two of eight pairs scaled by four carry the whole demand
        assert_relative_eq!(sink.iterations[0].total_travel_cost, 400.0 * (bpr.eval(0, 400.0) + bpr.eval(1, 400.0)));
    }

    #[test]
    fn invalid_sampling_schedule_is_rejected() {
        let network = two_routes();
        let bpr = BprFunction::new(&network, BprParams::default());
        let config = AssignmentConfig {
            sampling_intervals: vec![4, 3],
            ..Default::default()
        };
        let result = FrankWolfeAssignment::new(&network, &[], UserEquilibrium::new(bpr), DijkstraAdapter::new(&network), config);
        assert!(result.is_err());
    }
}
