//! Per-request access logging.

use std::time::Duration;

use tracing::{info, warn};

use crate::method::Method;
use crate::response::Response;

/// Logs one finished request. Server errors are logged at `warn`.
pub fn record(method: Method, path: &str, res: &Response, elapsed: Duration) {
    let status = u16::from(res.status_code());
    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    match res.header("location") {
        Some(location) => info!(%method, path, status, location, latency_ms, "request"),
        None if status >= 500 => warn!(%method, path, status, latency_ms, "request"),
        None => info!(%method, path, status, latency_ms, "request"),
    }
}
