//! Content-graph records ("blocks").
//!
//! The graph answers with loosely shaped JSON. [`Block::from_value`] decodes
//! the fields the front door acts on exactly once, at the resolver boundary,
//! and keeps the untouched JSON around for the preload payload.

use serde::Deserialize;
use serde_json::{Map, Value};

/// The `type` of a block that redirects by its own nature.
pub const REDIRECT_TYPE: &str = "redirect";
/// Assumed when a block carries no `type`.
pub const DEFAULT_TYPE: &str = "page";

/// A record resolved from the content graph.
#[derive(Clone, Debug)]
pub struct Block {
    id: String,
    kind: String,
    text: Option<String>,
    url: Option<String>,
    action: Action,
    action_url: Option<String>,
    coverphoto: Option<String>,
    icon: Option<String>,
    raw: Value,
}

/// What visiting a block's slug should do, decoded from `properties.action`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// No `action` property.
    NoAction,
    /// `{ type: "render_block", blockId? }`
    RenderBlock { target_id: Option<String> },
    /// `{ type: "open_url", url }`. The URL may be empty; the policy decides.
    OpenUrl { url: String },
    /// Present but not one of the shapes above.
    Malformed,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawAction {
    RenderBlock {
        #[serde(default, rename = "blockId")]
        block_id: Option<Value>,
    },
    OpenUrl {
        #[serde(default)]
        url: Option<String>,
    },
}

#[derive(Deserialize)]
struct ImageRef {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: Option<String>,
}

impl Block {
    /// Decodes a block. Returns `None` when the JSON has no usable `_id`,
    /// which the graph uses to signal "nothing here".
    pub fn from_value(raw: Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let id = match obj.get("_id")? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let kind = obj.get("type")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TYPE)
            .to_owned();

        let empty = Map::new();
        let props = obj.get("properties").and_then(Value::as_object).unwrap_or(&empty);

        let action_value = props.get("action");
        let action = Action::decode(action_value);
        let action_url = action_value
            .and_then(|a| a.get("url"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Some(Self {
            id,
            kind,
            text: string_prop(props, "text"),
            url: string_prop(props, "url"),
            action,
            action_url,
            coverphoto: image_url(props.get("coverphoto")),
            icon: image_url(props.get("icon")),
            raw,
        })
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn kind(&self) -> &str { &self.kind }
    pub fn action(&self) -> &Action { &self.action }

    pub fn is_redirect(&self) -> bool {
        self.kind == REDIRECT_TYPE
    }

    /// `properties.text`, when it is a non-empty string.
    pub fn title(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Target of a `redirect` block: `properties.url`, falling back to
    /// `properties.action.url`. Empty strings count as absent.
    pub fn redirect_url(&self) -> Option<&str> {
        self.url.as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.action_url.as_deref().filter(|u| !u.is_empty()))
    }

    /// Social-preview image: `coverphoto` first, then `icon`.
    pub fn cover_image(&self) -> Option<&str> {
        self.coverphoto.as_deref().or(self.icon.as_deref())
    }

    /// The block exactly as the graph returned it.
    pub fn raw(&self) -> &Value { &self.raw }
}

impl Action {
    fn decode(value: Option<&Value>) -> Self {
        let value = match value {
            None | Some(Value::Null) => return Self::NoAction,
            Some(v) => v,
        };
        match RawAction::deserialize(value) {
            Ok(RawAction::RenderBlock { block_id }) => Self::RenderBlock {
                target_id: match block_id {
                    Some(Value::String(s)) if !s.is_empty() => Some(s),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                },
            },
            Ok(RawAction::OpenUrl { url }) => Self::OpenUrl { url: url.unwrap_or_default() },
            Err(_) => Self::Malformed,
        }
    }
}

fn string_prop(props: &Map<String, Value>, key: &str) -> Option<String> {
    props.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// `{ type: "url", url }` → the URL. Anything else, or an empty URL, is `None`.
fn image_url(value: Option<&Value>) -> Option<String> {
    let image = ImageRef::deserialize(value?).ok()?;
    match (image.kind.as_str(), image.url) {
        ("url", Some(url)) if !url.is_empty() => Some(url),
        _ => None,
    }
}
