//! Wiring: the front door, the shell renderer and the static fallback,
//! mounted on a [`Router`].

use std::sync::Arc;

use tracing::error;

use crate::assets::{self, AssetIndex};
use crate::config::Args;
use crate::error::Error;
use crate::front::{FrontDoor, Route};
use crate::graph::{BlockSource, GraphClient, Passthrough};
use crate::health;
use crate::middleware::cors::Cors;
use crate::path::Segments;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::shell::{Page, ShellRenderer};
use crate::status::Status;

/// Everything a request needs, shared across connections.
pub struct App {
    front: FrontDoor,
    shell: ShellRenderer,
    cors: Cors,
}

impl App {
    pub fn new(front: FrontDoor, shell: ShellRenderer, cors: Cors) -> Self {
        Self { front, shell, cors }
    }

    /// Builds the production app: GraphQL source, asset directory and
    /// template from `args`. Nothing is read from disk yet.
    pub fn from_args(args: &Args) -> Result<Self, Error> {
        let source: Arc<dyn BlockSource> = Arc::new(GraphClient::new(args.graphql_url())?);
        let assets = Arc::new(AssetIndex::new(args.static_dir()));
        Ok(Self::new(
            FrontDoor::new(assets, source),
            ShellRenderer::new(
                args.template_path(),
                args.default_title.clone(),
                args.default_description.clone(),
                args.image_proxy_url.clone(),
            ),
            Cors::new(args.site_domain.clone(), args.dev_origins.clone()),
        ))
    }

    pub fn assets(&self) -> &AssetIndex {
        self.front.assets()
    }

    /// Mounts every route:
    ///
    /// - `GET /healthz`, `GET /readyz`
    /// - `GET /login`: to `/auth/google`, query preserved
    /// - `GET /`, `GET /{*path}`: the front door
    /// - `OPTIONS /`, `OPTIONS /{*path}`: CORS preflight
    pub fn router(self: Arc<Self>) -> Router {
        let ready = Arc::clone(&self);
        let front = Arc::clone(&self);
        let front_root = Arc::clone(&self);
        let preflight = Arc::clone(&self);
        let preflight_root = Arc::clone(&self);
        let cors = self.cors.clone();

        Router::new()
            .get("/healthz", health::liveness)
            .get("/readyz", move |_req: Request| {
                let app = Arc::clone(&ready);
                async move { health::readiness(app.assets().is_warm()) }
            })
            .get("/login", login)
            .get("/", move |req: Request| {
                let app = Arc::clone(&front_root);
                async move { app.front_door(req).await }
            })
            .get("/{*path}", move |req: Request| {
                let app = Arc::clone(&front);
                async move { app.front_door(req).await }
            })
            .options("/", move |req: Request| {
                let app = Arc::clone(&preflight_root);
                async move { app.cors.preflight(&req) }
            })
            .options("/{*path}", move |req: Request| {
                let app = Arc::clone(&preflight);
                async move { app.cors.preflight(&req) }
            })
            .with_cors(cors)
    }

    /// The catch-all handler.
    pub async fn front_door(&self, req: Request) -> Response {
        let segments = Segments::parse(req.path(), req.query());
        let headers = Passthrough::from_request(&req);

        let route = match self.front.route(&segments, &headers).await {
            Ok(route) => route,
            Err(e) => {
                error!(error = %e, "asset directory unavailable");
                return Response::status(Status::InternalServerError);
            }
        };

        match route {
            Route::ServeFile(path) => match assets::serve_file(&path).await {
                Some(res) => res,
                None => self.static_fallback(req.path()).await,
            },
            Route::Redirect(location) => Response::redirect(&location),
            Route::Render(page) => self.shell.render(&page).await,
            Route::Decline => self.static_fallback(req.path()).await,
        }
    }

    /// Serves whatever the asset directory has at `path`, or the default
    /// shell so the client can show its not-found state.
    async fn static_fallback(&self, path: &str) -> Response {
        if let Some(file) = self.assets().resolve(path) {
            if let Some(res) = assets::serve_file(&file).await {
                return res;
            }
        }
        self.shell.render(&Page::empty()).await
    }
}

/// `/login?…` → `/auth/google?…`
async fn login(req: Request) -> Response {
    match req.query().filter(|q| !q.is_empty()) {
        Some(query) => Response::redirect(&format!("/auth/google?{query}")),
        None => Response::redirect("/auth/google"),
    }
}
