//! Domain rules for the fleet ledger backend.
//!
//! This crate has zero internal dependencies. It holds the alert lifecycle
//! rules, date-window normalization, and the pure reductions behind the
//! metadata aggregation endpoints, so the repository and HTTP layers only
//! move data in and out.

pub mod alert;
pub mod error;
pub mod metadata;
pub mod pagination;
pub mod types;
pub mod window;
