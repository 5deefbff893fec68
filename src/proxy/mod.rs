//! Proxy pipeline
//!
//! The per-request lifecycle: authenticate, resolve the agent, validate the
//! secret, route by model prefix, swap in the real provider credential,
//! forward, stream the response back while capturing it, then extract usage
//! and record cost.

pub mod handler;
pub mod headers;
pub mod url;

pub use handler::chat_completions;
