//! # voltdoor
//!
//! The front door of VoltLink. Every `GET` lands here and ends as one of:
//!
//! - the raw bytes of a deployed asset (`/favicon.ico`),
//! - a `302` to a block's canonical URL `/<slug>=<id><suffix>`, to another
//!   block, or to an external URL,
//! - the client's `index.html` with the block's title, description, cover
//!   image and a preload payload substituted in.
//!
//! ## The contract
//!
//! The content graph owns the records. voltdoor only reads them, once per
//! request, with the visitor's cookie forwarded. A graph that is down looks
//! like a graph with nothing in it: the visitor gets the default shell and
//! the client shows its not-found state.
//!
//! TLS, rate limiting and body-size limits belong to the reverse proxy in
//! front of voltdoor.
//!
//! ## Layout
//!
//! - [`slug`]: normalisation shared by every comparison
//! - [`assets`]: top-level asset snapshot and file serving
//! - [`graph`]: lookups by slug and identifier
//! - [`policy`]: where a slug leads
//! - [`front`]: the per-request decision procedure
//! - [`shell`]: template substitution
//! - [`App`]: all of the above mounted on a [`Router`]
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clap::Parser;
//! use voltdoor::{App, Args, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = Args::parse();
//!     let app = Arc::new(App::from_args(&args)?);
//!     app.assets().warm().await?;
//!     Server::bind(args.listen).serve(app.router()).await?;
//!     Ok(())
//! }
//! ```

mod app;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod assets;
pub mod block;
pub mod config;
pub mod front;
pub mod graph;
pub mod health;
pub mod middleware;
pub mod mime;
pub mod path;
pub mod policy;
pub mod shell;
pub mod slug;

pub use app::App;
pub use config::Args;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;
