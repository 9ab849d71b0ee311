//! The shortest path engines the all-or-nothing assignment can use.

use super::*;

pub mod cch;
pub mod dijkstra;
