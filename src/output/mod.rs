//! Output module for reports over stored snapshots
//!
//! This module handles:
//! - Degree statistics of a snapshot
//! - Printing them for the `stats` command

pub mod stats;

pub use stats::{degree_statistics, print_statistics, DegreeStatistics};
