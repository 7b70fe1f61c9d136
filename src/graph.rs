//! Content resolution against the content-graph service.
//!
//! Two primitive lookups (by slug, by identifier) sit behind the
//! [`BlockSource`] trait so the router can be driven by an in-memory source
//! in tests. [`GraphClient`] is the production source: one GraphQL POST per
//! lookup, forwarding the caller's cookie, user agent and referer.
//!
//! Lookups are best effort. Any transport or decoding failure is logged and
//! reported as "no block", so routing always has a defined fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::block::Block;
use crate::error::Error;
use crate::request::Request;
use crate::slug;

/// Field selection shared by both lookups. Nested content, permissions and
/// computed roles are not read here; they ride along in the preload payload.
const BLOCK_FIELDS: &str = r#"
  _id
  type
  properties
  content {
    blockId
    block {
      _id
      type
      properties
      content {
        blockId
      }
      parent
      metadata {
        modified
        modified_by
      }
      permissions
      computed {
        roles
        inherited_block_permissions
      }
    }
  }
  parent
  metadata {
    modified
    modified_by
  }
  permissions
  computed {
    roles
    inherited_block_permissions
  }
"#;

/// Headers forwarded untouched so the graph can apply its own auth and
/// analytics.
pub const PASSTHROUGH_HEADERS: [&str; 3] = ["cookie", "user-agent", "referer"];

/// The subset of request headers forwarded to the content graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Passthrough(Vec<(&'static str, String)>);

impl Passthrough {
    pub fn from_request(req: &Request) -> Self {
        Self(
            PASSTHROUGH_HEADERS
                .iter()
                .filter_map(|&name| Some((name, req.header(name)?.to_owned())))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Where a block was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchedBy {
    Slug,
    Identifier,
    None,
}

/// Result of [`resolve_slug_or_id`].
#[derive(Clone, Debug)]
pub struct Resolution {
    pub block: Option<Block>,
    pub matched_by: MatchedBy,
}

/// Order in which a bare token is tried.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LookupOrder {
    /// Slug first, identifier as fallback. A slug whose text collides with
    /// an identifier resolves as the slug.
    #[default]
    SlugFirst,
    IdentifierFirst,
}

/// A place blocks can be looked up.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn by_slug(&self, slug: &str, headers: &Passthrough) -> Option<Block>;
    async fn by_id(&self, id: &str, headers: &Passthrough) -> Option<Block>;
}

/// Resolves a bare path token as slug or identifier, in `order`.
///
/// The slug attempt uses the normalised token; identifiers are opaque and
/// looked up as sent.
pub async fn resolve_slug_or_id(
    source: &dyn BlockSource,
    token: &str,
    headers: &Passthrough,
    order: LookupOrder,
) -> Resolution {
    let attempts = match order {
        LookupOrder::SlugFirst => [MatchedBy::Slug, MatchedBy::Identifier],
        LookupOrder::IdentifierFirst => [MatchedBy::Identifier, MatchedBy::Slug],
    };
    let normalized = slug::normalize_str(token);
    for matched_by in attempts {
        let block = match matched_by {
            MatchedBy::Slug => source.by_slug(&normalized, headers).await,
            _ => source.by_id(token, headers).await,
        };
        if block.is_some() {
            return Resolution { block, matched_by };
        }
    }
    Resolution { block: None, matched_by: MatchedBy::None }
}

// ── GraphQL client ────────────────────────────────────────────────────────────

/// Failures talking to the content graph. Never leaves this module.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("graph answered {0}")]
    Status(reqwest::StatusCode),

    #[error("graph errors: {0}")]
    Query(String),
}

#[derive(Serialize)]
struct GraphRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

#[derive(Serialize)]
struct SlugVars<'a> {
    slug: &'a str,
}

#[derive(Serialize)]
struct IdVars<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
}

#[derive(Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Option<GraphData>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Deserialize)]
struct GraphData {
    #[serde(default)]
    block: Option<Value>,
}

/// Production [`BlockSource`] speaking GraphQL over HTTP.
pub struct GraphClient {
    endpoint: String,
    http_client: reqwest::Client,
    slug_query: String,
    id_query: String,
}

impl GraphClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(endpoint, None)
    }

    /// `timeout` bounds each lookup; `None` leaves it to the transport.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder().user_agent("voltdoor/0.1");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            endpoint: endpoint.into(),
            http_client: builder.build()?,
            slug_query: format!(
                "query ($slug: String!) {{ block: blockBySlug (slug: $slug) {{ {BLOCK_FIELDS} }} }}"
            ),
            id_query: format!(
                "query ($_id: ObjectID!) {{ block (_id: $_id) {{ {BLOCK_FIELDS} }} }}"
            ),
        })
    }

    async fn query<V: Serialize>(
        &self,
        query: &str,
        variables: V,
        headers: &Passthrough,
    ) -> Result<Option<Value>, GraphError> {
        let mut req = self.http_client
            .post(&self.endpoint)
            .json(&GraphRequest { query, variables });
        // The user agent is forwarded as-is, replacing the client default.
        for (name, value) in headers.iter() {
            req = req.header(name, value);
        }

        let res = req.send().await?;
        if !res.status().is_success() {
            return Err(GraphError::Status(res.status()));
        }
        let body: GraphResponse = res.json().await?;
        match (body.data.and_then(|d| d.block), body.errors) {
            (Some(block), _) => Ok(Some(block)),
            (None, Some(errors)) if !errors.is_null() => Err(GraphError::Query(errors.to_string())),
            (None, _) => Ok(None),
        }
    }

    fn settle(&self, op: &str, token: &str, result: Result<Option<Value>, GraphError>) -> Option<Block> {
        match result {
            Ok(Some(raw)) => {
                let block = Block::from_value(raw);
                debug!(op, token, found = block.is_some(), "graph lookup");
                block
            }
            Ok(None) => {
                debug!(op, token, found = false, "graph lookup");
                None
            }
            // The graph rejects tokens that are not valid identifiers; that
            // is the normal outcome of the identifier fallback for a slug.
            Err(e @ GraphError::Query(_)) => {
                debug!(op, token, error = %e, "graph refused lookup");
                None
            }
            Err(e) => {
                warn!(op, token, error = %e, "graph lookup failed, treating as not found");
                None
            }
        }
    }
}

#[async_trait]
impl BlockSource for GraphClient {
    async fn by_slug(&self, slug: &str, headers: &Passthrough) -> Option<Block> {
        let result = self.query(&self.slug_query, SlugVars { slug }, headers).await;
        self.settle("by_slug", slug, result)
    }

    async fn by_id(&self, id: &str, headers: &Passthrough) -> Option<Block> {
        let result = self.query(&self.id_query, IdVars { id }, headers).await;
        self.settle("by_id", id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one HTTP/1.1 exchange on loopback: answers with `status` and
    /// `body`, and hands back the raw request it received.
    async fn one_shot(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/graphql/v1/", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len(),
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8(raw).unwrap()
        });
        (endpoint, server)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        body.len() >= length
    }

    /// Splits a raw request into its lower-cased head and its JSON body.
    fn split_request(raw: &str) -> (String, Value) {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        (head.to_ascii_lowercase(), serde_json::from_str(body).unwrap())
    }

    fn browser_headers() -> Passthrough {
        Passthrough::from_request(&Request::new(
            Method::Get,
            "/about",
            vec![
                ("Cookie".to_owned(), "sid=1".to_owned()),
                ("User-Agent".to_owned(), "ua/1".to_owned()),
                ("Referer".to_owned(), "https://volt.link/".to_owned()),
            ],
        ))
    }

    /// Records every lookup; `slugs`/`ids` hold the tokens that resolve.
    #[derive(Default)]
    struct Fake {
        slugs: Vec<&'static str>,
        ids: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlockSource for Fake {
        async fn by_slug(&self, slug: &str, _: &Passthrough) -> Option<Block> {
            self.calls.lock().unwrap().push(format!("slug:{slug}"));
            self.slugs.iter().any(|s| *s == slug)
                .then(|| Block::from_value(json!({ "_id": "from-slug" })))
                .flatten()
        }

        async fn by_id(&self, id: &str, _: &Passthrough) -> Option<Block> {
            self.calls.lock().unwrap().push(format!("id:{id}"));
            self.ids.iter().any(|s| *s == id)
                .then(|| Block::from_value(json!({ "_id": id })))
                .flatten()
        }
    }

    #[tokio::test]
    async fn test_slug_wins_over_colliding_identifier() {
        let fake = Fake { slugs: vec!["abc"], ids: vec!["abc"], ..Default::default() };
        let res = resolve_slug_or_id(&fake, "abc", &Passthrough::default(), LookupOrder::SlugFirst).await;
        assert_eq!(res.matched_by, MatchedBy::Slug);
        assert_eq!(res.block.unwrap().id(), "from-slug");
        assert_eq!(*fake.calls.lock().unwrap(), vec!["slug:abc"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_identifier() {
        let fake = Fake { ids: vec!["5f1c"], ..Default::default() };
        let res = resolve_slug_or_id(&fake, "5f1c", &Passthrough::default(), LookupOrder::SlugFirst).await;
        assert_eq!(res.matched_by, MatchedBy::Identifier);
        assert_eq!(*fake.calls.lock().unwrap(), vec!["slug:5f1c", "id:5f1c"]);
    }

    #[tokio::test]
    async fn test_identifier_first_order() {
        let fake = Fake { slugs: vec!["abc"], ids: vec!["abc"], ..Default::default() };
        let res = resolve_slug_or_id(&fake, "abc", &Passthrough::default(), LookupOrder::IdentifierFirst).await;
        assert_eq!(res.matched_by, MatchedBy::Identifier);
    }

    #[tokio::test]
    async fn test_slug_lookup_is_normalised_identifier_is_not() {
        let fake = Fake::default();
        resolve_slug_or_id(&fake, " AbC ", &Passthrough::default(), LookupOrder::SlugFirst).await;
        assert_eq!(*fake.calls.lock().unwrap(), vec!["slug:abc", "id: AbC "]);
    }

    #[tokio::test]
    async fn test_no_match() {
        let fake = Fake::default();
        let res = resolve_slug_or_id(&fake, "nope", &Passthrough::default(), LookupOrder::SlugFirst).await;
        assert_eq!(res.matched_by, MatchedBy::None);
        assert!(res.block.is_none());
    }

    #[test]
    fn test_passthrough_picks_known_headers() {
        let req = Request::new(
            Method::Get,
            "/x",
            vec![
                ("Cookie".to_owned(), "sid=1".to_owned()),
                ("Referer".to_owned(), "https://volt.link/".to_owned()),
                ("Authorization".to_owned(), "secret".to_owned()),
            ],
        );
        let passthrough = Passthrough::from_request(&req);
        let headers: Vec<_> = passthrough.iter().collect();
        assert_eq!(headers, vec![("cookie", "sid=1"), ("referer", "https://volt.link/")]);
    }

    #[tokio::test]
    async fn test_unreachable_graph_is_not_found() {
        // Nothing listens on port 9 (discard) on loopback in test environments.
        let client = GraphClient::with_timeout("http://127.0.0.1:9/graphql", Some(Duration::from_secs(2))).unwrap();
        assert!(client.by_slug("about", &Passthrough::default()).await.is_none());
        assert!(client.by_id("5f1c", &Passthrough::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_slug_lookup_posts_query_and_forwards_headers() {
        let (endpoint, server) = one_shot(
            "200 OK",
            r#"{"data":{"block":{"_id":"5f1c","type":"page","properties":{"text":"About"}}}}"#,
        )
        .await;
        let client = GraphClient::new(endpoint).unwrap();

        let block = client.by_slug("about", &browser_headers()).await.unwrap();
        assert_eq!(block.id(), "5f1c");
        assert_eq!(block.title(), Some("About"));

        let (head, body) = split_request(&server.await.unwrap());
        assert!(head.starts_with("post /graphql/v1/ http/1.1"));
        assert!(head.contains("content-type: application/json"));
        assert!(head.contains("cookie: sid=1"));
        assert!(head.contains("user-agent: ua/1"));
        assert!(head.contains("referer: https://volt.link/"));
        assert!(body["query"].as_str().unwrap().contains("block: blockBySlug (slug: $slug)"));
        assert_eq!(body["variables"], json!({ "slug": "about" }));
    }

    #[tokio::test]
    async fn test_identifier_lookup_sends_object_id_variable() {
        let (endpoint, server) = one_shot("200 OK", r#"{"data":{"block":{"_id":"5f1c"}}}"#).await;
        let client = GraphClient::new(endpoint).unwrap();

        assert!(client.by_id("5f1c", &Passthrough::default()).await.is_some());

        let (head, body) = split_request(&server.await.unwrap());
        assert!(!head.contains("cookie:"));
        assert!(body["query"].as_str().unwrap().contains("block (_id: $_id)"));
        assert_eq!(body["variables"], json!({ "_id": "5f1c" }));
    }

    #[tokio::test]
    async fn test_replies_without_a_block_are_not_found() {
        let replies = [
            ("200 OK", r#"{"data":{"block":null}}"#),
            ("200 OK", r#"{"data":{"block":{"type":"page"}}}"#),
            ("200 OK", r#"{"errors":[{"message":"invalid ObjectID"}],"data":null}"#),
            ("200 OK", "<html>not json</html>"),
            ("502 Bad Gateway", r#"{"data":{"block":{"_id":"5f1c"}}}"#),
        ];
        for (status, body) in replies {
            let (endpoint, server) = one_shot(status, body).await;
            let client = GraphClient::new(endpoint).unwrap();
            assert!(client.by_slug("about", &Passthrough::default()).await.is_none(), "reply {body}");
            server.await.unwrap();
        }
    }

    #[test]
    fn test_queries_alias_block() {
        let client = GraphClient::new("http://localhost:4004/graphql/v1/").unwrap();
        assert!(client.slug_query.contains("block: blockBySlug (slug: $slug)"));
        assert!(client.id_query.contains("block (_id: $_id)"));
        assert!(client.id_query.contains("inherited_block_permissions"));
    }
}
