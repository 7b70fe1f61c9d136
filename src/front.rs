//! The front door's decision procedure for one request path.
//!
//! Precedence, first match wins:
//!
//! 1. empty token: default shell
//! 2. token names a top-level asset: serve the file, or decline for a
//!    directory
//! 3. bare token: slug (then policy redirect) or identifier (then render)
//! 4. `token=id`: the identifier alone decides, the token is cosmetic
//! 5. decline
//!
//! A deployed asset can never be shadowed by a graph record, and a
//! canonical URL always resolves by identifier, so it never redirects again.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::assets::AssetIndex;
use crate::error::Error;
use crate::graph::{self, BlockSource, LookupOrder, MatchedBy, Passthrough};
use crate::path::Segments;
use crate::policy::{self, Destination};
use crate::shell::Page;

/// What to do with a request.
#[derive(Debug)]
pub enum Route {
    /// Send this file from the asset directory.
    ServeFile(PathBuf),
    /// `302` to this location.
    Redirect(String),
    /// Render the shell for this page.
    Render(Page),
    /// Not ours: hand over to the static-file fallback.
    Decline,
}

/// Classifies request paths against the asset directory and the content
/// graph.
pub struct FrontDoor {
    assets: Arc<AssetIndex>,
    source: Arc<dyn BlockSource>,
    order: LookupOrder,
}

impl FrontDoor {
    pub fn new(assets: Arc<AssetIndex>, source: Arc<dyn BlockSource>) -> Self {
        Self { assets, source, order: LookupOrder::default() }
    }

    pub fn with_order(mut self, order: LookupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn assets(&self) -> &AssetIndex {
        &self.assets
    }

    /// Decides the route for `segments`.
    ///
    /// Fails only if the asset snapshot cannot be taken.
    pub async fn route(&self, segments: &Segments, headers: &Passthrough) -> Result<Route, Error> {
        let Segments { token, id, .. } = segments;

        if token.is_empty() {
            return Ok(Route::Render(Page::empty()));
        }

        let class = self.assets.classify(token).await?;
        if class.is_static_entry {
            return Ok(if class.is_regular_file {
                Route::ServeFile(self.assets.entry_path(&crate::slug::normalize_str(token)))
            } else {
                Route::Decline
            });
        }

        if id.is_empty() {
            let found = graph::resolve_slug_or_id(self.source.as_ref(), token, headers, self.order).await;
            match (found.matched_by, found.block) {
                (MatchedBy::Slug, Some(block)) => {
                    let destination = policy::resolve(&block, segments);
                    debug!(token, block = block.id(), ?destination, "slug resolved");
                    return Ok(match destination {
                        Destination::Render(error) => Route::Render(Page::failed(block, error)),
                        Destination::SelfRedirect(location)
                        | Destination::CrossRedirect(location)
                        | Destination::External(location) => Route::Redirect(location),
                    });
                }
                (MatchedBy::Identifier, Some(block)) => return Ok(Route::Render(Page::of(block))),
                _ => {}
            }
        } else if let Some(block) = self.source.by_id(id, headers).await {
            return Ok(Route::Render(Page::of(block)));
        }

        Ok(Route::Decline)
    }
}
