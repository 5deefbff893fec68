//! Usage and cost tracking
//!
//! Best-effort token accounting for proxied requests: usage extraction from
//! response bodies, a static pricing table, and an in-memory accumulator.
//! Nothing in this module may fail a request; pricing gaps and unparseable
//! bodies degrade to zero cost.

pub mod accumulator;
pub mod pricing;
pub mod usage;

pub use accumulator::{CostAccumulator, CostEntry};
pub use pricing::{PricingTable, Rate};
pub use usage::{extract_usage, extract_usage_from_sse, Usage};
