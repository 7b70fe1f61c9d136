//! Action policy: where visiting a block's slug leads.
//!
//! A block's own `type` is checked before its `properties.action`. A
//! `redirect` block with a URL (top-level, or `action.url` as fallback)
//! always sends the visitor there, whatever the action says.

use crate::block::{Action, Block};
use crate::path::Segments;
use crate::shell::PageError;

/// Outcome for a block reached by slug.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Destination {
    /// Canonical URL of the block itself: `/<slug>=<own id><suffix>`.
    SelfRedirect(String),
    /// Canonical URL pointing at another block: `/<slug>=<target id><suffix>`.
    CrossRedirect(String),
    /// An external URL, verbatim.
    External(String),
    /// Render the shell with the block and an error for the client.
    Render(PageError),
}

pub fn resolve(block: &Block, segments: &Segments) -> Destination {
    // A redirect block never follows its action; `action.url` only stands in
    // for a missing `properties.url`.
    if block.is_redirect() {
        return match block.redirect_url() {
            Some(url) => Destination::External(url.to_owned()),
            None => Destination::SelfRedirect(segments.canonical_location(block.id())),
        };
    }

    match block.action() {
        Action::NoAction | Action::RenderBlock { target_id: None } => {
            Destination::SelfRedirect(segments.canonical_location(block.id()))
        }
        Action::RenderBlock { target_id: Some(target) } => {
            Destination::CrossRedirect(segments.canonical_location(target))
        }
        Action::OpenUrl { url } if !url.is_empty() => Destination::External(url.clone()),
        Action::OpenUrl { .. } => Destination::Render(PageError::UnresolvedAction),
        Action::Malformed => Destination::Render(PageError::MalformedAction),
    }
}
