//! Static traffic assignment on road networks.
//!
//! The solver iterates the Frank-Wolfe method on top of an all-or-nothing assignment,
//! which routes every OD-pair along a shortest path under the current edge costs.
//! Shortest paths come either from a plain Dijkstra or from a batched CCH query,
//! which answers several OD-pairs at once.

#![allow(clippy::redundant_closure)]

#[macro_use]
pub mod report;
pub mod algo;
pub mod cli;
pub mod datastr;
pub mod export;
pub mod import;
pub mod io;
pub mod util;
