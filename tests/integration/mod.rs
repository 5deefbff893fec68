//! Integration test modules
//!
//! - `proxy.rs` - the agent-facing proxy pipeline
//! - `admin.rs` - the operator admin API
//! - `health.rs` - health endpoint

mod health;
mod proxy;
