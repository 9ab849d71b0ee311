//! Static traffic assignment with the Frank-Wolfe method.
//!
//! The travel cost of each edge grows with its flow. Frank-Wolfe alternates between
//! an all-or-nothing assignment under the marginal costs of the objective and a line search
//! which moves the flows towards that assignment as far as it decreases the objective.

use super::*;
use crate::util::InRangeOption;

pub mod adapters;
pub mod all_or_nothing;
pub mod frank_wolfe;
pub mod line_search;
pub mod objective;
pub mod stats;
pub mod travel_cost;

pub use adapters::{cch::CchAdapter, dijkstra::DijkstraAdapter};
pub use all_or_nothing::AllOrNothingAssignment;
pub use frank_wolfe::{AssignmentConfig, FrankWolfeAssignment};
pub use objective::*;
pub use stats::*;
pub use travel_cost::*;

/// A travel demand of `volume` vehicles from `origin` to `destination`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdPair {
    pub origin: NodeId,
    pub destination: NodeId,
    pub volume: f64,
    /// Optional rebalancing vehicle position and the two edges of its trip, carried along for the output.
    pub rebalancer: InRangeOption<NodeId>,
    pub edge1: InRangeOption<EdgeId>,
    pub edge2: InRangeOption<EdgeId>,
}

impl OdPair {
    pub fn new(origin: NodeId, destination: NodeId, volume: f64) -> Self {
        OdPair {
            origin,
            destination,
            volume,
            rebalancer: InRangeOption::NONE,
            edge1: InRangeOption::NONE,
            edge2: InRangeOption::NONE,
        }
    }

    pub fn query(&self) -> Query {
        Query {
            from: self.origin,
            to: self.destination,
        }
    }
}

/// Travel costs become integer search weights with this many steps per cost unit.
pub const DEFAULT_PRECISION: f64 = 1000.0;
/// Upper bound for a single search weight so that path lengths stay far below `INFINITY`.
pub const MAX_EDGE_WEIGHT: Weight = 1 << 40;

/// Fixed point search weight for a (non negative) travel cost.
/// Both shortest path engines get weights from here, so their distances agree exactly.
pub fn cost_to_weight(cost: f64, precision: f64) -> Weight {
    assert!(!cost.is_nan(), "travel cost is NaN");
    let scaled = (cost.max(0.0) * precision).round();
    if scaled >= MAX_EDGE_WEIGHT as f64 {
        MAX_EDGE_WEIGHT
    } else {
        scaled as Weight
    }
}

/// A shortest path algorithm the all-or-nothing assignment can route with.
///
/// Flows are accumulated on the arcs of the engine's search graph and mapped to
/// input edges once per assignment with `propagate_flows_to_input_edges`.
pub trait ShortestPathEngine: Sync {
    type QueryAlgo<'s>: QueryAlgo
    where
        Self: 's;

    /// Number of queries answered per `QueryAlgo::run`.
    fn batch_size(&self) -> usize;
    fn num_search_arcs(&self) -> usize;
    /// Metric independent setup, called once.
    fn preprocess(&mut self);
    /// Adopt new search weights, indexed by input edge id.
    fn customize(&mut self, weights: &[Weight]);
    /// A fresh query instance. Every worker thread owns one.
    fn query_algo(&self) -> Self::QueryAlgo<'_>;
    /// Map the flows on search arcs to input edges. `search_flows` may be consumed, `input_flows` is overwritten.
    fn propagate_flows_to_input_edges(&self, search_flows: &mut [f64], input_flows: &mut [f64]);
}

/// Per thread query state of a `ShortestPathEngine`.
pub trait QueryAlgo {
    /// Answer up to `batch_size` queries, one per lane.
    fn run(&mut self, queries: &[Query]);
    fn distance(&self, lane: usize) -> Option<Weight>;
    /// Add `volume` to the search arcs on the path of `lane`.
    fn add_flow(&self, lane: usize, volume: f64, search_flows: &mut [f64]);
    /// Input edges of the path of `lane`.
    fn path(&self, lane: usize, path: &mut Vec<EdgeId>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_rounded_and_capped() {
        assert_eq!(cost_to_weight(1.2344, DEFAULT_PRECISION), 1234);
        assert_eq!(cost_to_weight(1.2345, 10.0), 12);
        assert_eq!(cost_to_weight(-3.0, DEFAULT_PRECISION), 0);
        assert_eq!(cost_to_weight(f64::INFINITY, DEFAULT_PRECISION), MAX_EDGE_WEIGHT);
    }

    #[test]
    #[should_panic]
    fn nan_costs_are_rejected() {
        cost_to_weight(f64::NAN, DEFAULT_PRECISION);
    }
}
