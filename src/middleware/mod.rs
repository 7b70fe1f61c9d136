//! Middleware layer.
//!
//! Cross-cutting concerns applied by [`Router::handle`](crate::Router::handle)
//! around every request:
//!
//! - [`cors`]: origin allow-list and preflight answers
//! - [`trace`]: one log line per request with method, path, status, latency

pub mod cors;
pub mod trace;
