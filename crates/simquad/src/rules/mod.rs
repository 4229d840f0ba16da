//! Fully symmetric simplex cubature rules.
//!
//! Built once per (dimension, order) pair and shared by every region; see
//! [`table`] for the construction and `symsum` for orbit enumeration.

pub mod table;

mod symsum;

pub use table::RuleTable;

pub(crate) use symsum::next_permutation;
