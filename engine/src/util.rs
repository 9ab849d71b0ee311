//! Odds and ends.

pub mod in_range_option;
pub use in_range_option::*;
