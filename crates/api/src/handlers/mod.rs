//! Request handlers, one module per resource.

pub mod alerts;
pub mod metadata;
