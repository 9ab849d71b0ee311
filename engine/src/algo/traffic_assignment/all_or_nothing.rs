//! All-or-nothing assignment: each OD-pair is routed entirely on one shortest path under fixed costs.

use super::*;
use crate::report::*;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

const MAX_BATCHES_PER_CHUNK: usize = 64;

/// Routes OD-pairs in parallel with a `ShortestPathEngine`.
///
/// Workers grab chunks of batches from a shared counter and accumulate flows and distances locally.
/// After all batches are done, the local results are merged once.
pub struct AllOrNothingAssignment<'a, E> {
    engine: E,
    od_pairs: &'a [OdPair],
    num_workers: usize,
    record_paths: bool,
    search_flows: Vec<f64>,
    traffic_flows: Vec<f64>,
    distances: Vec<InRangeOption<Weight>>,
    paths: Vec<Vec<EdgeId>>,
    pub stats: AllOrNothingStats,
}

impl<'a, E: ShortestPathEngine> AllOrNothingAssignment<'a, E> {
    /// Runs the engine preprocessing.
    pub fn new(network: &RoadNetwork, od_pairs: &'a [OdPair], mut engine: E) -> Self {
        for od_pair in od_pairs {
            assert!(
                (od_pair.origin as usize) < network.num_nodes() && (od_pair.destination as usize) < network.num_nodes(),
                "OD-pair {:?} outside of the network",
                od_pair
            );
        }

        let ((), preprocessing_time) = measure(|| engine.preprocess());
        let preprocessing_time_ms = preprocessing_time.as_secs_f64() * 1000.0;
        info!("preprocessing done - took: {}ms", preprocessing_time_ms);
        report!("preprocessing_time_ms", preprocessing_time_ms);

        AllOrNothingAssignment {
            num_workers: rayon::current_num_threads(),
            record_paths: false,
            search_flows: vec![0.0; engine.num_search_arcs()],
            traffic_flows: vec![0.0; network.num_edges()],
            distances: vec![InRangeOption::NONE; od_pairs.len()],
            paths: Vec::new(),
            stats: AllOrNothingStats {
                preprocessing_time,
                ..Default::default()
            },
            engine,
            od_pairs,
        }
    }

    pub fn set_num_workers(&mut self, num_workers: usize) {
        assert!(num_workers > 0);
        self.num_workers = num_workers;
    }

    /// Keep the paths of all routed OD-pairs, see `paths`.
    pub fn set_record_paths(&mut self, record_paths: bool) {
        self.record_paths = record_paths;
        self.paths = if record_paths { vec![Vec::new(); self.od_pairs.len()] } else { Vec::new() };
    }

    /// Hand new search weights to the engine and clear the flows.
    pub fn customize(&mut self, weights: &[Weight]) {
        let engine = &mut self.engine;
        let ((), time) = measure(|| engine.customize(weights));
        self.stats.last_customization_time = time;
        self.stats.total_customization_time += time;
        self.traffic_flows.iter_mut().for_each(|flow| *flow = 0.0);
    }

    /// Route every `sampling_interval`-th OD-pair and scale the flows by the interval.
    pub fn run(&mut self, sampling_interval: usize) {
        assert!(sampling_interval > 0, "sampling interval must be positive");
        self.stats.num_iterations += 1;

        let ((), time) = measure(|| {
            let workers = self.route(sampling_interval);
            self.merge(workers, sampling_interval);
        });
        self.stats.last_query_time = time;
        self.stats.total_query_time += time;

        debug!(
            "all-or-nothing iteration {} - customization: {}ms queries: {}ms",
            self.stats.num_iterations,
            self.stats.last_customization_time.as_secs_f64() * 1000.0,
            time.as_secs_f64() * 1000.0
        );
    }

    fn route(&self, sampling_interval: usize) -> Vec<AssignmentWorker> {
        let engine = &self.engine;
        let od_pairs = self.od_pairs;
        let previous_distances = &self.distances;
        let record_paths = self.record_paths;

        let batch_size = engine.batch_size();
        let stride = batch_size * sampling_interval;
        let num_batches = (od_pairs.len() + stride - 1) / stride;
        let chunk_size = (num_batches / (self.num_workers * 8)).clamp(1, MAX_BATCHES_PER_CHUNK);
        let next_batch = AtomicUsize::new(0);

        (0..self.num_workers)
            .into_par_iter()
            .map(|_| {
                let mut worker = AssignmentWorker::new(engine.num_search_arcs());
                let mut query = engine.query_algo();
                let mut queries = Vec::with_capacity(batch_size);
                let mut od_indices = Vec::with_capacity(batch_size);

                loop {
                    let first_batch = next_batch.fetch_add(chunk_size, Ordering::Relaxed);
                    if first_batch >= num_batches {
                        break;
                    }

                    for batch in first_batch..usize::min(first_batch + chunk_size, num_batches) {
                        od_indices.clear();
                        od_indices.extend((batch * stride..od_pairs.len()).step_by(sampling_interval).take(batch_size));
                        queries.clear();
                        queries.extend(od_indices.iter().map(|&od_index| od_pairs[od_index].query()));
                        // the last batch may be incomplete, fill the remaining lanes with a copy of the first query
                        queries.resize(batch_size, queries[0]);

                        query.run(&queries);
                        for (lane, &od_index) in od_indices.iter().enumerate() {
                            worker.record(&query, lane, od_index, &od_pairs[od_index], previous_distances[od_index].value(), record_paths);
                        }
                    }
                }

                worker
            })
            .collect()
    }

    fn merge(&mut self, workers: Vec<AssignmentWorker>, sampling_interval: usize) {
        self.search_flows
            .par_iter_mut()
            .enumerate()
            .for_each(|(arc, flow)| *flow = workers.iter().map(|worker| worker.search_flows[arc]).sum());

        let mut checksum = 0;
        let mut sum_of_changes = 0.0;
        let mut num_changes = 0;
        let mut max_change: Option<f64> = None;
        let mut num_unreachable = 0;

        for worker in workers {
            for (od_index, distance) in worker.distances {
                self.distances[od_index] = InRangeOption::new(distance);
            }
            for (od_index, path) in worker.paths {
                self.paths[od_index] = path;
            }
            checksum += worker.checksum;
            sum_of_changes += worker.sum_of_changes;
            num_changes += worker.num_changes;
            max_change = match (max_change, worker.max_change) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            num_unreachable += worker.num_unreachable;
        }

        self.engine.propagate_flows_to_input_edges(&mut self.search_flows, &mut self.traffic_flows);
        if sampling_interval > 1 {
            let scale = sampling_interval as f64;
            self.traffic_flows.iter_mut().for_each(|flow| *flow *= scale);
        }

        if num_unreachable > 0 {
            warn!("{} OD-pairs have no path and were not assigned", num_unreachable);
        }

        self.stats.last_checksum = checksum;
        self.stats.total_checksum += checksum;
        self.stats.avg_change_in_distances = if num_changes > 0 { Some(sum_of_changes / num_changes as f64) } else { None };
        self.stats.max_change_in_distances = max_change;
        self.stats.last_num_unreachable = num_unreachable;
    }

    /// Flow on the given input edge after the last `run`.
    pub fn traffic_flow_on(&self, edge: EdgeId) -> f64 {
        self.traffic_flows[edge as usize]
    }

    pub fn traffic_flows(&self) -> &[f64] {
        &self.traffic_flows
    }

    /// Latest distance of each OD-pair, `None` while it was never routed or is unreachable.
    pub fn distances(&self) -> Vec<Option<Weight>> {
        self.distances.iter().map(|distance| distance.value()).collect()
    }

    /// Latest path of each OD-pair. Empty unless path recording is enabled.
    pub fn paths(&self) -> &[Vec<EdgeId>] {
        &self.paths
    }

    pub fn num_od_pairs(&self) -> usize {
        self.od_pairs.len()
    }
}

/// Results of one worker over all the batches it processed.
struct AssignmentWorker {
    search_flows: Vec<f64>,
    distances: Vec<(usize, Option<Weight>)>,
    paths: Vec<(usize, Vec<EdgeId>)>,
    checksum: u64,
    sum_of_changes: f64,
    num_changes: usize,
    max_change: Option<f64>,
    num_unreachable: usize,
}

impl AssignmentWorker {
    fn new(num_search_arcs: usize) -> Self {
        AssignmentWorker {
            search_flows: vec![0.0; num_search_arcs],
            distances: Vec::new(),
            paths: Vec::new(),
            checksum: 0,
            sum_of_changes: 0.0,
            num_changes: 0,
            max_change: None,
            num_unreachable: 0,
        }
    }

    fn record<Q: QueryAlgo>(&mut self, query: &Q, lane: usize, od_index: usize, od_pair: &OdPair, previous: Option<Weight>, record_path: bool) {
        let distance = query.distance(lane);
        match distance {
            Some(distance) => {
                query.add_flow(lane, od_pair.volume, &mut self.search_flows);
                self.checksum += distance;
                if let Some(change) = previous.and_then(|previous| relative_change(previous, distance)) {
                    self.sum_of_changes += change;
                    self.num_changes += 1;
                    self.max_change = Some(self.max_change.map_or(change, |max| max.max(change)));
                }
            }
            None => self.num_unreachable += 1,
        }
        self.distances.push((od_index, distance));

        if record_path {
            let mut path = Vec::new();
            query.path(lane, &mut path);
            self.paths.push((od_index, path));
        }
    }
}

/// `None` when the previous distance was zero and the current one is not.
fn relative_change(previous: Weight, current: Weight) -> Option<f64> {
    if previous == 0 {
        return if current == 0 { Some(0.0) } else { None };
    }
    Some((current as f64 - previous as f64).abs() / previous as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::customizable_contraction_hierarchy::min_degree_order;

    //
    //   0 ---> 1 ---> 2
    //   |             ^
    //   +----> 3 -----+
    //
    fn network() -> RoadNetwork {
        let edges: Vec<EdgeAttributes> = [(0, 1), (1, 2), (0, 3), (3, 2)]
            .iter()
            .map(|&(tail, head)| EdgeAttributes {
                tail,
                head,
                length: 1.0,
                capacity: 1.0,
                speed: 1.0,
            })
            .collect();
        RoadNetwork::new(4, &edges)
    }

    fn od_pairs() -> Vec<OdPair> {
        vec![
            OdPair::new(0, 2, 2.0),
            OdPair::new(1, 2, 1.0),
            OdPair::new(3, 2, 0.5),
            OdPair::new(2, 0, 4.0),
            OdPair::new(0, 0, 3.0),
        ]
    }

    fn check_flows<E: ShortestPathEngine>(engine: E) {
        let network = network();
        let od_pairs = od_pairs();
        let mut aon = AllOrNothingAssignment::new(&network, &od_pairs, engine);
        aon.set_num_workers(2);
        aon.set_record_paths(true);
        aon.customize(&[1, 1, 5, 5]);
        aon.run(1);

        assert_eq!(aon.traffic_flows(), &[2.0, 3.0, 0.0, 0.5]);
        assert_eq!(aon.distances(), vec![Some(2), Some(1), Some(5), None, Some(0)]);
        assert_eq!(aon.paths()[0], vec![0, 1]);
        assert!(aon.paths()[3].is_empty());
        assert_eq!(aon.stats.last_checksum, 8);
        assert_eq!(aon.stats.last_num_unreachable, 1);
        assert_eq!(aon.stats.avg_change_in_distances, None);

        // now the lower route is cheaper
        aon.customize(&[1, 9, 1, 1]);
        aon.run(1);
        assert_eq!(aon.traffic_flows(), &[0.0, 1.0, 2.0, 2.5]);
        assert_eq!(aon.distances()[0], Some(2));
        assert_eq!(aon.distances()[2], Some(1));
        // 0 -> 2 unchanged, 1 -> 2 from 1 to 9, 3 -> 2 from 5 to 1, 0 -> 0 unchanged
        let avg = aon.stats.avg_change_in_distances.unwrap();
        assert!((avg - (0.0 + 8.0 + 0.8 + 0.0) / 4.0).abs() < 1e-12);
        assert_eq!(aon.stats.max_change_in_distances, Some(8.0));
    }

    #[test]
    fn dijkstra_assignment() {
        check_flows(DijkstraAdapter::new(&network()));
    }

    #[test]
    fn batched_dijkstra_assignment() {
        check_flows(DijkstraAdapter::with_batch_size(&network(), 3));
    }

    #[test]
    fn cch_assignment() {
        let network = network();
        check_flows(CchAdapter::new(&network, Some(min_degree_order(&network)), adapters::cch::CchConfig { batch_size: 4 }));
    }

    #[test]
    fn repeated_customization_is_idempotent() {
        let network = network();
        let od_pairs = od_pairs();
        let mut aon = AllOrNothingAssignment::new(&network, &od_pairs, CchAdapter::new(&network, None, Default::default()));
        aon.customize(&[3, 2, 2, 4]);
        aon.run(1);
        let flows = aon.traffic_flows().to_vec();
        let distances = aon.distances();
        aon.customize(&[3, 2, 2, 4]);
        aon.customize(&[3, 2, 2, 4]);
        aon.run(1);
        assert_eq!(aon.traffic_flows(), &flows[..]);
        assert_eq!(aon.distances(), distances);
        assert_eq!(aon.stats.avg_change_in_distances, Some(0.0));
    }

    #[test]
    fn sampling_scales_flows() {
        let network = network();
        let od_pairs = vec![OdPair::new(0, 2, 1.0); 6];
        let mut aon = AllOrNothingAssignment::new(&network, &od_pairs, DijkstraAdapter::with_batch_size(&network, 2));
        aon.customize(&[1, 1, 5, 5]);
        aon.run(3);
        assert_eq!(aon.traffic_flows(), &[6.0, 6.0, 0.0, 0.0]);
        let routed: Vec<bool> = aon.distances().iter().map(Option::is_some).collect();
        assert_eq!(routed, vec![true, false, false, true, false, false]);
    }
}
