//! Origin allow-list for the product domain and local development.
//!
//! Allowed origins are echoed back with credentials enabled. Every other
//! origin gets no CORS headers at all, and the browser does the blocking.

use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

const ALLOW_METHODS: &str = "GET,PUT,POST,DELETE,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, Content-Length, X-Requested-With";

/// CORS policy: the site domain, its subdomains, and a fixed set of
/// `host:port` development origins.
#[derive(Clone, Debug)]
pub struct Cors {
    domain: String,
    dev_origins: Vec<String>,
}

impl Cors {
    pub fn new(domain: impl Into<String>, dev_origins: Vec<String>) -> Self {
        Self { domain: domain.into(), dev_origins }
    }

    /// Suffix matching, not URL parsing: `https://volt.link`,
    /// `https://edit.volt.link` and `http://localhost:3000` all pass,
    /// `https://evilvolt.link` does not.
    pub fn is_allowed(&self, origin: &str) -> bool {
        origin == self.domain
            || origin.ends_with(&format!("://{}", self.domain))
            || origin.ends_with(&format!(".{}", self.domain))
            || self.dev_origins.iter().any(|o| !o.is_empty() && origin.ends_with(o.as_str()))
    }

    /// Adds the allow-origin pair when `origin` passes.
    pub fn apply(&self, origin: Option<&str>, res: &mut Response) {
        let Some(origin) = origin.filter(|o| self.is_allowed(o)) else {
            return;
        };
        if res.header("access-control-allow-origin").is_some() {
            return;
        }
        res.set_header("access-control-allow-origin", origin);
        res.set_header("access-control-allow-credentials", "true");
    }

    /// Answers an `OPTIONS` request: 200 with the allowed methods and
    /// headers for a known origin, 403 for everyone else.
    pub fn preflight(&self, req: &Request) -> Response {
        match req.header("origin").filter(|o| self.is_allowed(o)) {
            Some(origin) => Response::builder()
                .header("access-control-allow-origin", origin)
                .header("access-control-allow-credentials", "true")
                .header("access-control-allow-methods", ALLOW_METHODS)
                .header("access-control-allow-headers", ALLOW_HEADERS)
                .text("OK"),
            None => Response::builder().status(Status::Forbidden).text("Forbidden"),
        }
    }
}
