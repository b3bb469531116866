//! Services that compose several repository reads into one result.

pub mod aggregation;

pub use aggregation::AggregationEngine;
