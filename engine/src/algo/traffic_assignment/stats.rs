//! Per iteration statistics and the outputs the solver can be observed through.

use super::*;
use serde::Serialize;
use std::{error::Error, time::Duration};

/// Statistics of the all-or-nothing assignment, updated once per iteration.
#[derive(Debug, Clone, Default)]
pub struct AllOrNothingStats {
    pub num_iterations: usize,
    pub preprocessing_time: Duration,
    pub last_customization_time: Duration,
    pub last_query_time: Duration,
    pub total_customization_time: Duration,
    pub total_query_time: Duration,
    /// Sum of the distances of all routed OD-pairs in search weight units, see `cost_to_weight`.
    pub last_checksum: u64,
    pub total_checksum: u64,
    /// Mean relative change of the OD-distances against the previous iteration.
    /// `None` if no routed OD-pair had a previous distance.
    pub avg_change_in_distances: Option<f64>,
    pub max_change_in_distances: Option<f64>,
    pub last_num_unreachable: usize,
}

impl AllOrNothingStats {
    pub fn last_routing_time(&self) -> Duration {
        self.last_customization_time + self.last_query_time
    }

    pub fn total_routing_time(&self) -> Duration {
        self.total_customization_time + self.total_query_time
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrankWolfeStats {
    /// Step size of the latest line search, one for the initial assignment.
    pub last_step_size: f64,
    pub last_line_search_time: Duration,
    pub total_line_search_time: Duration,
    pub last_running_time: Duration,
    pub total_running_time: Duration,
    pub objective_value: f64,
    pub total_travel_cost: f64,
}

/// One row of the iteration statistics output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationStats {
    pub iteration: usize,
    pub sampling_interval: usize,
    #[serde(rename = "customization_time")]
    pub customization_time_ms: f64,
    #[serde(rename = "query_time")]
    pub query_time_ms: f64,
    #[serde(rename = "line_search_time")]
    pub line_search_time_ms: f64,
    #[serde(rename = "total_time")]
    pub total_time_ms: f64,
    #[serde(rename = "avg_change")]
    pub avg_change_in_distances: Option<f64>,
    #[serde(rename = "max_change")]
    pub max_change_in_distances: Option<f64>,
    #[serde(rename = "obj_function_value")]
    pub objective_value: f64,
    pub total_travel_cost: f64,
    /// In search weight units.
    pub checksum: u64,
}

/// One row of the flow pattern output, an edge with its final flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPatternRecord {
    pub num_iteration: usize,
    pub tail: NodeId,
    pub head: NodeId,
    pub free_flow_cost: f64,
    pub actual_cost: f64,
    pub capacity: f64,
    pub flow: f64,
}

/// Receives the results of the solver. All methods default to discarding their input.
/// The expensive outputs are only computed when the sink asks for them.
pub trait AssignmentSink {
    fn iteration(&mut self, _stats: &IterationStats) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn wants_distances(&self) -> bool {
        false
    }

    /// OD-distances after `iteration` in search weight units, indexed like the OD-pairs.
    fn distances(&mut self, _iteration: usize, _distances: &[Option<Weight>]) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn wants_paths(&self) -> bool {
        false
    }

    /// Paths of the last all-or-nothing assignment as input edge ids, indexed like the OD-pairs.
    fn paths(&mut self, _iteration: usize, _paths: &[Vec<EdgeId>]) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn wants_flow_pattern(&self) -> bool {
        false
    }

    fn flow_pattern(&mut self, _records: &[FlowPatternRecord]) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    /// Weight of each iteration's all-or-nothing flows in the final flows.
    fn iteration_weights(&mut self, _weights: &[f64]) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// Discards everything.
impl AssignmentSink for () {}

/// Keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub iterations: Vec<IterationStats>,
    pub distances: Vec<Vec<Option<Weight>>>,
    pub paths: Vec<Vec<Vec<EdgeId>>>,
    pub flow_pattern: Vec<FlowPatternRecord>,
    pub iteration_weights: Vec<f64>,
}

impl AssignmentSink for CollectingSink {
    fn iteration(&mut self, stats: &IterationStats) -> Result<(), Box<dyn Error>> {
        self.iterations.push(stats.clone());
        Ok(())
    }

    fn wants_distances(&self) -> bool {
        true
    }

    fn distances(&mut self, _iteration: usize, distances: &[Option<Weight>]) -> Result<(), Box<dyn Error>> {
        self.distances.push(distances.to_vec());
        Ok(())
    }

    fn wants_paths(&self) -> bool {
        true
    }

    fn paths(&mut self, _iteration: usize, paths: &[Vec<EdgeId>]) -> Result<(), Box<dyn Error>> {
        self.paths.push(paths.to_vec());
        Ok(())
    }

    fn wants_flow_pattern(&self) -> bool {
        true
    }

    fn flow_pattern(&mut self, records: &[FlowPatternRecord]) -> Result<(), Box<dyn Error>> {
        self.flow_pattern = records.to_vec();
        Ok(())
    }

    fn iteration_weights(&mut self, weights: &[f64]) -> Result<(), Box<dyn Error>> {
        self.iteration_weights = weights.to_vec();
        Ok(())
    }
}
