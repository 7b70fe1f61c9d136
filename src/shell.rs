//! Server-rendered shell: the client's `index.html` with record metadata
//! substituted in, for social previews and hydration.
//!
//! Placeholders:
//!
//! | Placeholder            | Value                                               |
//! |------------------------|-----------------------------------------------------|
//! | `__META_TITLE__`       | `properties.text`, else the default title           |
//! | `__META_DESCRIPTION__` | empty with a custom title, else the default         |
//! | `__META_COVERPHOTO__`  | cover or icon image through the image proxy         |
//! | `__SERVER_DATA__`      | `JSON.parse("<preload payload as a JS string>")`    |

use std::path::PathBuf;
use std::sync::LazyLock;

use percent_encoding::utf8_percent_encode;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::block::Block;
use crate::path::URI_COMPONENT;
use crate::response::Response;
use crate::status::Status;

static PLACEHOLDERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("__META_TITLE__|__META_DESCRIPTION__|__META_COVERPHOTO__|__SERVER_DATA__")
        .expect("placeholder pattern is valid")
});

/// Fixed bounding box requested from the image proxy.
const PROXY_PARAMS: &str = "f=jpg&w=1000&h=1000";

/// Why a slug ended in a render instead of a redirect. Sent to the client
/// in the preload payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageError {
    /// `properties.action` exists but has no known shape.
    MalformedAction,
    /// The action is well-formed but leads nowhere (e.g. `open_url` without
    /// a URL).
    UnresolvedAction,
}

impl PageError {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedAction => "malformed_action",
            Self::UnresolvedAction => "unresolved_action",
        }
    }
}

/// What a shell is rendered for.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub block: Option<Block>,
    pub error: Option<PageError>,
}

impl Page {
    /// The default page: no record.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(block: Block) -> Self {
        Self { block: Some(block), error: None }
    }

    pub fn failed(block: Block, error: PageError) -> Self {
        Self { block: Some(block), error: Some(error) }
    }
}

/// Values substituted into the template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Meta {
    pub title: String,
    pub description: String,
    pub coverphoto: String,
    pub server_data: String,
}

#[derive(Serialize)]
struct Preload<'a> {
    preloaded_block: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

/// Renders shells from the template on disk.
#[derive(Clone, Debug)]
pub struct ShellRenderer {
    template: PathBuf,
    default_title: String,
    default_description: String,
    image_proxy: String,
}

impl ShellRenderer {
    pub fn new(
        template: impl Into<PathBuf>,
        default_title: impl Into<String>,
        default_description: impl Into<String>,
        image_proxy: impl Into<String>,
    ) -> Self {
        Self {
            template: template.into(),
            default_title: default_title.into(),
            default_description: default_description.into(),
            image_proxy: image_proxy.into(),
        }
    }

    /// Reads the template (every call, so a redeployed client is picked up
    /// without a restart) and fills it. An unreadable template is a 500.
    pub async fn render(&self, page: &Page) -> Response {
        let template = match tokio::fs::read_to_string(&self.template).await {
            Ok(t) => t,
            Err(e) => {
                error!(template = %self.template.display(), error = %e, "cannot read shell template");
                return Response::status(Status::InternalServerError);
            }
        };
        match self.meta(page) {
            Ok(meta) => Response::html(fill(&template, &meta)),
            Err(e) => {
                error!(error = %e, "cannot encode preload payload");
                Response::status(Status::InternalServerError)
            }
        }
    }

    pub fn meta(&self, page: &Page) -> Result<Meta, serde_json::Error> {
        let block = page.block.as_ref();
        let (title, description) = match block.and_then(Block::title) {
            Some(title) => (title.to_owned(), String::new()),
            None => (self.default_title.clone(), self.default_description.clone()),
        };
        let coverphoto = block
            .and_then(Block::cover_image)
            .map(|url| self.proxied_image(url))
            .unwrap_or_default();

        Ok(Meta {
            title,
            description,
            coverphoto,
            server_data: server_data(page)?,
        })
    }

    fn proxied_image(&self, url: &str) -> String {
        format!(
            "{}?{PROXY_PARAMS}&url={}",
            self.image_proxy,
            utf8_percent_encode(url, URI_COMPONENT),
        )
    }
}

/// The preload payload, serialised twice: once to JSON, then as a JS string
/// literal the client hands to `JSON.parse`. `<` is escaped so the payload
/// cannot close the surrounding `<script>`.
fn server_data(page: &Page) -> Result<String, serde_json::Error> {
    let preload = Preload {
        preloaded_block: page.block.as_ref().map(Block::raw),
        error: page.error.map(PageError::as_str),
    };
    let json = serde_json::to_string(&preload)?;
    let literal = serde_json::to_string(&json)?.replace('<', "\\u003c");
    Ok(format!("JSON.parse({literal})"))
}

/// Single pass over the template: substituted text is never re-scanned.
pub fn fill(template: &str, meta: &Meta) -> String {
    PLACEHOLDERS
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "__META_TITLE__" => html_escape::encode_quoted_attribute(&meta.title).into_owned(),
            "__META_DESCRIPTION__" => html_escape::encode_quoted_attribute(&meta.description).into_owned(),
            "__META_COVERPHOTO__" => html_escape::encode_quoted_attribute(&meta.coverphoto).into_owned(),
            _ => meta.server_data.clone(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<title>__META_TITLE__</title>\
        <meta name=\"description\" content=\"__META_DESCRIPTION__\">\
        <meta property=\"og:image\" content=\"__META_COVERPHOTO__\">\
        <script>window.__SERVER_DATA__ = __SERVER_DATA__</script>";

    fn renderer(template: impl Into<PathBuf>) -> ShellRenderer {
        ShellRenderer::new(
            template,
            "VoltLink",
            "VoltLink is an information-hub about Volt Europa.",
            "https://api.volt.link/download_url",
        )
    }

    fn block(value: Value) -> Block {
        Block::from_value(value).unwrap()
    }

    #[test]
    fn test_default_meta() {
        let meta = renderer("unused").meta(&Page::empty()).unwrap();
        assert_eq!(meta.title, "VoltLink");
        assert_eq!(meta.description, "VoltLink is an information-hub about Volt Europa.");
        assert_eq!(meta.coverphoto, "");
        assert_eq!(meta.server_data, r#"JSON.parse("{\"preloaded_block\":null}")"#);
    }

    #[test]
    fn test_custom_title_clears_description() {
        let page = Page::of(block(json!({ "_id": "a", "properties": { "text": "Hello" } })));
        let meta = renderer("unused").meta(&page).unwrap();
        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.description, "");
    }

    #[test]
    fn test_coverphoto_goes_through_proxy() {
        let page = Page::of(block(json!({
            "_id": "a",
            "properties": { "coverphoto": { "type": "url", "url": "http://x/y.png" } },
        })));
        let meta = renderer("unused").meta(&page).unwrap();
        assert_eq!(
            meta.coverphoto,
            "https://api.volt.link/download_url?f=jpg&w=1000&h=1000&url=http%3A%2F%2Fx%2Fy.png",
        );
    }

    #[test]
    fn test_server_data_round_trips_and_carries_error() {
        let raw = json!({ "_id": "a", "properties": { "text": "</script><b>" }, "content": [] });
        let page = Page::failed(block(raw.clone()), PageError::MalformedAction);
        let data = server_data(&page).unwrap();
        assert!(!data.contains('<'));

        let literal = data.strip_prefix("JSON.parse(").unwrap().strip_suffix(')').unwrap();
        let json: String = serde_json::from_str(literal).unwrap();
        let payload: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["preloaded_block"], raw);
        assert_eq!(payload["error"], "malformed_action");
    }

    #[test]
    fn test_fill_is_single_pass_and_escapes() {
        let meta = Meta {
            title: "A & B \"__SERVER_DATA__\"".to_owned(),
            description: String::new(),
            coverphoto: String::new(),
            server_data: "DATA".to_owned(),
        };
        let html = fill(TEMPLATE, &meta);
        assert!(html.contains("<title>A &amp; B &quot;__SERVER_DATA__&quot;</title>"));
        assert!(html.contains("window.DATA = DATA"));
    }

    #[tokio::test]
    async fn test_render_reads_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, TEMPLATE).unwrap();

        let res = renderer(&path).render(&Page::empty()).await;
        assert_eq!(res.status_code(), Status::Ok);
        let body = String::from_utf8(res.body().to_vec()).unwrap();
        assert!(body.contains("<title>VoltLink</title>"));
        assert!(body.contains("content=\"\""));
    }

    #[tokio::test]
    async fn test_missing_template_is_500() {
        let res = renderer("/definitely/not/here/index.html").render(&Page::empty()).await;
        assert_eq!(res.status_code(), Status::InternalServerError);
    }
}
