//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware runs around
//! every matched or unmatched request in [`Router::handle`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{cors::Cors, trace};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    cors: Option<Cors>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), cors: None }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Paths use matchit syntax; `{*name}` matches the rest of the path.
    /// Static routes win over a catch-all registered on the same tree.
    /// Handlers read the full path from the request, not the captures.
    ///
    /// # Panics
    ///
    /// Panics if the path conflicts with an existing route. Routes are
    /// registered at startup, so this is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// `GET` (and therefore `HEAD`).
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Options, path, handler)
    }

    /// Attach CORS headers to every response whose origin `cors` allows.
    pub fn with_cors(mut self, cors: Cors) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Routes one request and produces one response.
    ///
    /// Never fails: an unmatched path is a 404, and everything else is the
    /// handler's business.
    pub async fn handle(&self, req: Request) -> Response {
        let started = Instant::now();
        let method = req.method();
        let path = req.path().to_owned();
        let origin = req.header("origin").map(str::to_owned);

        let mut res = match self.lookup(method.route_as(), &path) {
            Some(handler) => handler.call(req).await,
            None => Response::status(Status::NotFound),
        };

        if method == Method::Head {
            res.strip_body();
        }
        if let Some(cors) = &self.cors {
            cors.apply(origin.as_deref(), &mut res);
        }
        trace::record(method, &path, &res, started.elapsed());
        res
    }

    fn lookup(&self, method: Method, path: &str) -> Option<BoxedHandler> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        Some(Arc::clone(matched.value))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
