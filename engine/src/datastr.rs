//! Data structures shared by the search algorithms.

pub mod graph;
pub mod index_heap;
pub mod node_order;
pub mod timestamped_vector;
