//! Reddit connector.
//!
//! Reads subreddit listings and comment trees through the Reddit OAuth API
//! using application-only (client credentials) authentication. One token is
//! acquired per run and reused for every request.
//!
//! # Environment Variables
//!
//! - `CLIENT_ID`: required
//! - `API_KEY`: required (the application secret)
//!
//! A `.env` file in the working directory is loaded first if present.
//!
//! # Pagination
//!
//! Listings are read in pages of at most `source.page_size` items,
//! following the `after` cursor until the requested limit is served or the
//! listing runs out. Pages are fetched lazily as the caller iterates.
//!
//! # Comments
//!
//! Comments are read with `depth=1`: only top-level comments are
//! returned and `more` placeholders come back as
//! [`CommentNode::More`] without being expanded.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::connector::{ContentSource, ItemStream};
use crate::error::{IngestError, Result};
use crate::models::{Comment, CommentNode, RawItem};
use crate::sort::ListingQuery;

// ============ Credentials ============

/// Application credentials loaded from the environment.
#[derive(Clone)]
pub struct RedditCredentials {
    client_id: String,
    api_key: String,
}

impl RedditCredentials {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Load `CLIENT_ID` and `API_KEY`, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let client_id = non_empty_var("CLIENT_ID")?;
        let api_key = non_empty_var("API_KEY")?;
        Ok(Self { client_id, api_key })
    }
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn non_empty_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(IngestError::Authentication(format!(
            "{} environment variable not set",
            name
        ))),
    }
}

// ============ Wire types ============

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct ListingEnvelope {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    stickied: bool,
}

#[derive(Deserialize)]
struct CommentData {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    stickied: bool,
}

#[derive(Deserialize)]
struct MoreData {
    #[serde(default)]
    count: u64,
}

// ============ Connector ============

/// An authenticated session against the Reddit API.
pub struct RedditConnector {
    client: Client,
    base_url: String,
    token: String,
    page_size: usize,
}

impl RedditConnector {
    /// Authenticate and open a session.
    ///
    /// # Errors
    ///
    /// [`IngestError::Authentication`] if the token endpoint rejects the
    /// credentials; other variants for network or protocol failures.
    pub fn connect(config: &SourceConfig, creds: &RedditCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let token = request_token(&client, &config.token_url, creds)?;
        tracing::debug!(base_url = %config.base_url, "reddit session opened");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            page_size: config.page_size.clamp(1, 100),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let resp = self.client.get(url).bearer_auth(&self.token).send()?;
        let resp = check_status(resp)?;
        let bytes = resp.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn listing_page(
        &self,
        source: &str,
        query: &ListingQuery,
        after: Option<&str>,
        limit: usize,
    ) -> Result<(Vec<RawItem>, Option<String>)> {
        let url = listing_url(&self.base_url, source, query, after, limit)?;
        tracing::debug!(%url, "fetching listing page");
        let envelope: ListingEnvelope = self.get_json(url)?;
        Ok(parse_listing(envelope))
    }
}

impl ContentSource for RedditConnector {
    fn name(&self) -> &str {
        "reddit"
    }

    fn listing(&self, source: &str, query: &ListingQuery) -> Result<ItemStream<'_>> {
        Ok(Box::new(ListingPages {
            connector: self,
            source: source.to_string(),
            query: query.clone(),
            remaining: query.limit,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
            seen: HashSet::new(),
        }))
    }

    fn comments(&self, item: &RawItem, limit: usize) -> Result<Vec<CommentNode>> {
        let url = comments_url(&self.base_url, &item.id, limit)?;
        let listings: Vec<ListingEnvelope> = self.get_json(url)?;
        // [0] is the post itself, [1] its comment tree.
        Ok(listings
            .into_iter()
            .nth(1)
            .map(parse_comments)
            .unwrap_or_default())
    }
}

fn request_token(client: &Client, token_url: &str, creds: &RedditCredentials) -> Result<String> {
    let resp = client
        .post(token_url)
        .basic_auth(&creds.client_id, Some(&creds.api_key))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("grant_type=client_credentials")
        .send()?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(IngestError::Authentication(format!(
            "token endpoint returned {}",
            status
        )));
    }
    let resp = check_status(resp)?;
    let token: TokenResponse = serde_json::from_slice(&resp.bytes()?)?;

    match (token.access_token, token.error) {
        (Some(t), _) if !t.is_empty() => Ok(t),
        (_, Some(err)) => Err(IngestError::Authentication(err)),
        _ => Err(IngestError::Authentication(
            "token endpoint returned no access token".to_string(),
        )),
    }
}

fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(IngestError::Authentication(message));
    }
    Err(IngestError::Api {
        status: status.as_u16(),
        message,
    })
}

fn listing_url(
    base_url: &str,
    source: &str,
    query: &ListingQuery,
    after: Option<&str>,
    limit: usize,
) -> Result<Url> {
    let mut params = vec![
        ("limit", limit.to_string()),
        ("raw_json", "1".to_string()),
    ];
    if let Some(t) = query.time_filter {
        params.push(("t", t.to_string()));
    }
    if let Some(after) = after {
        params.push(("after", after.to_string()));
    }
    let base = format!("{}/r/{}/{}", base_url, source, query.listing.path());
    Url::parse_with_params(&base, &params)
        .map_err(|e| IngestError::Validation(format!("invalid listing url {}: {}", base, e)))
}

fn comments_url(base_url: &str, id: &str, limit: usize) -> Result<Url> {
    let base = format!("{}/comments/{}", base_url, id);
    let params = [
        ("limit", limit.to_string()),
        ("depth", "1".to_string()),
        ("raw_json", "1".to_string()),
    ];
    Url::parse_with_params(&base, &params)
        .map_err(|e| IngestError::Validation(format!("invalid comments url {}: {}", base, e)))
}

fn parse_listing(envelope: ListingEnvelope) -> (Vec<RawItem>, Option<String>) {
    let items = envelope
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t3")
        .filter_map(|thing| match serde_json::from_value::<PostData>(thing.data) {
            Ok(post) => Some(RawItem {
                id: post.id,
                title: post.title,
                body: post.selftext,
                pinned: post.stickied,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed listing entry");
                None
            }
        })
        .collect();
    let after = envelope.data.after.filter(|a| !a.is_empty());
    (items, after)
}

fn parse_comments(envelope: ListingEnvelope) -> Vec<CommentNode> {
    envelope
        .data
        .children
        .into_iter()
        .filter_map(|thing| match thing.kind.as_str() {
            "t1" => serde_json::from_value::<CommentData>(thing.data)
                .ok()
                .map(|c| {
                    CommentNode::Comment(Comment {
                        body: c.body.unwrap_or_default(),
                        pinned: c.stickied,
                    })
                }),
            "more" => serde_json::from_value::<MoreData>(thing.data)
                .ok()
                .map(|m| CommentNode::More { count: m.count }),
            _ => None,
        })
        .collect()
}

// ============ Lazy listing iterator ============

struct ListingPages<'a> {
    connector: &'a RedditConnector,
    source: String,
    query: ListingQuery,
    remaining: usize,
    after: Option<String>,
    buffer: VecDeque<RawItem>,
    exhausted: bool,
    seen: HashSet<String>,
}

impl Iterator for ListingPages<'_> {
    type Item = Result<RawItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == 0 {
                return None;
            }
            if let Some(item) = self.buffer.pop_front() {
                if !self.seen.insert(item.id.clone()) {
                    tracing::debug!(id = %item.id, "duplicate item across pages");
                    continue;
                }
                self.remaining -= 1;
                return Some(Ok(item));
            }
            if self.exhausted {
                return None;
            }

            let page_limit = self.remaining.min(self.connector.page_size);
            match self.connector.listing_page(
                &self.source,
                &self.query,
                self.after.as_deref(),
                page_limit,
            ) {
                Ok((items, after)) => {
                    // A page with nothing new, or a cursor that did not
                    // move, would be requested again forever.
                    let fresh = items.iter().any(|item| !self.seen.contains(&item.id));
                    let stalled = after.is_some() && after == self.after;
                    if !fresh || stalled || after.is_none() {
                        if stalled {
                            tracing::warn!(after = ?after, "listing cursor did not advance, stopping");
                        }
                        self.exhausted = true;
                    }
                    self.after = after;
                    self.buffer.extend(items);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortMode;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ListingEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_listing_page() {
        let (items, after) = parse_listing(envelope(json!({
            "kind": "Listing",
            "data": {
                "after": "t3_b",
                "children": [
                    {"kind": "t3", "data": {"id": "a", "title": "Rules", "selftext": "", "stickied": true}},
                    {"kind": "t3", "data": {"id": "b", "title": "Link post", "stickied": false}}
                ]
            }
        })));
        assert_eq!(items.len(), 2);
        assert!(items[0].pinned);
        assert_eq!(items[0].body.as_deref(), Some(""));
        assert_eq!(items[1].body, None);
        assert_eq!(after.as_deref(), Some("t3_b"));
    }

    #[test]
    fn empty_after_cursor_means_exhausted() {
        let (_, after) = parse_listing(envelope(json!({
            "data": {"after": "", "children": []}
        })));
        assert!(after.is_none());
    }

    #[test]
    fn parses_comments_and_continuation_markers() {
        let nodes = parse_comments(envelope(json!({
            "kind": "Listing",
            "data": {
                "after": null,
                "children": [
                    {"kind": "t1", "data": {"body": "first", "stickied": false}},
                    {"kind": "t1", "data": {"body": "mod note", "stickied": true}},
                    {"kind": "more", "data": {"count": 42, "children": ["x", "y"]}}
                ]
            }
        })));
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            nodes[0],
            CommentNode::Comment(Comment {
                body: "first".into(),
                pinned: false
            })
        );
        assert_eq!(nodes[2], CommentNode::More { count: 42 });
    }

    #[test]
    fn listing_url_carries_time_filter_and_cursor() {
        let query = SortMode::TopWeek.resolve(10, 2);
        let url = listing_url("https://oauth.reddit.com", "rust", &query, Some("t3_x"), 20).unwrap();
        assert_eq!(url.path(), "/r/rust/top");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("t".into(), "week".into())));
        assert!(pairs.contains(&("after".into(), "t3_x".into())));
        assert!(pairs.contains(&("limit".into(), "20".into())));
    }

    #[test]
    fn comments_url_disables_deep_expansion() {
        let url = comments_url("https://oauth.reddit.com", "abc", 15).unwrap();
        assert_eq!(url.path(), "/comments/abc");
        assert!(url.query().unwrap().contains("depth=1"));
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = RedditCredentials::new("id", "secret");
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("secret"));
    }

    // ============ Loopback server ============

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};

    type Route = dyn Fn(&Url) -> (u16, String) + Send + Sync;

    /// Minimal HTTP/1.1 responder on 127.0.0.1. Every request target is
    /// recorded; the token endpoint always succeeds.
    struct Loopback {
        base_url: String,
        targets: Arc<Mutex<Vec<String>>>,
    }

    impl Loopback {
        fn start(route: Box<Route>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let targets = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&targets);
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    respond(stream, &route, &recorded);
                }
            });
            Self { base_url, targets }
        }

        fn config(&self, page_size: usize) -> SourceConfig {
            SourceConfig {
                base_url: self.base_url.clone(),
                token_url: format!("{}/api/v1/access_token", self.base_url),
                user_agent: "subtopic-test".to_string(),
                timeout_secs: 5,
                page_size,
            }
        }

        /// Parsed listing requests, in order.
        fn listing_requests(&self) -> Vec<Url> {
            self.targets
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.starts_with("/r/"))
                .map(|t| Url::parse(&format!("http://loopback{}", t)).unwrap())
                .collect()
        }
    }

    fn respond(stream: TcpStream, route: &Route, targets: &Mutex<Vec<String>>) {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }
        let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line.trim().is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0u8; content_length];
        let _ = reader.read_exact(&mut body);

        let (status, payload) = if target.starts_with("/api/v1/access_token") {
            (200, json!({"access_token": "tok", "token_type": "bearer"}).to_string())
        } else {
            targets.lock().unwrap().push(target.clone());
            let url = Url::parse(&format!("http://loopback{}", target)).unwrap();
            route(&url)
        };

        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            payload.len(),
            payload
        );
        let mut stream = reader.into_inner();
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    }

    fn param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn page(ids: &[&str], after: Option<&str>) -> (u16, String) {
        let children: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| json!({"kind": "t3", "data": {"id": id, "title": format!("post {}", id)}}))
            .collect();
        (
            200,
            json!({"kind": "Listing", "data": {"after": after, "children": children}}).to_string(),
        )
    }

    fn open(server: &Loopback, page_size: usize) -> RedditConnector {
        RedditConnector::connect(&server.config(page_size), &RedditCredentials::new("id", "secret"))
            .unwrap()
    }

    fn ids(connector: &RedditConnector, limit: usize) -> Vec<String> {
        connector
            .listing("rust", &SortMode::Hot.resolve(limit, 1))
            .unwrap()
            .map(|item| item.unwrap().id)
            .collect()
    }

    #[test]
    fn listing_follows_cursor_and_drops_duplicates() {
        let server = Loopback::start(Box::new(|url: &Url| {
            match param(url, "after").as_deref() {
                None => page(&["a", "b"], Some("t3_b")),
                Some("t3_b") => page(&["b", "c"], Some("t3_c")),
                _ => page(&["d"], None),
            }
        }));
        let connector = open(&server, 2);

        assert_eq!(ids(&connector, 10), vec!["a", "b", "c", "d"]);

        let requests = server.listing_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].path(), "/r/rust/hot");
        assert_eq!(param(&requests[0], "limit").as_deref(), Some("2"));
        assert_eq!(param(&requests[1], "after").as_deref(), Some("t3_b"));
        assert_eq!(param(&requests[2], "after").as_deref(), Some("t3_c"));
    }

    #[test]
    fn listing_stops_at_query_limit() {
        let server = Loopback::start(Box::new(|url: &Url| {
            match param(url, "after").as_deref() {
                None => page(&["a", "b"], Some("t3_b")),
                _ => page(&["c"], Some("t3_c")),
            }
        }));
        let connector = open(&server, 2);

        assert_eq!(ids(&connector, 3), vec!["a", "b", "c"]);

        let requests = server.listing_requests();
        assert_eq!(requests.len(), 2);
        // Second page only asks for what is still missing.
        assert_eq!(param(&requests[1], "limit").as_deref(), Some("1"));
    }

    #[test]
    fn listing_terminates_when_cursor_repeats_the_same_page() {
        let server = Loopback::start(Box::new(|_: &Url| page(&["a", "b"], Some("t3_b"))));
        let connector = open(&server, 2);

        assert_eq!(ids(&connector, 10), vec!["a", "b"]);
        assert_eq!(server.listing_requests().len(), 2);
    }

    #[test]
    fn listing_terminates_when_cursor_does_not_advance() {
        let server = Loopback::start(Box::new(|url: &Url| {
            match param(url, "after").as_deref() {
                None => page(&["a"], Some("t3_x")),
                _ => page(&["b"], Some("t3_x")),
            }
        }));
        let connector = open(&server, 1);

        assert_eq!(ids(&connector, 10), vec!["a", "b"]);
        assert_eq!(server.listing_requests().len(), 2);
    }

    #[test]
    fn listing_error_mid_stream_ends_iteration() {
        let server = Loopback::start(Box::new(|url: &Url| {
            match param(url, "after").as_deref() {
                None => page(&["a"], Some("t3_a")),
                _ => (503, "{\"message\": \"busy\"}".to_string()),
            }
        }));
        let connector = open(&server, 1);

        let mut stream = connector
            .listing("rust", &SortMode::TopWeek.resolve(5, 1))
            .unwrap();
        assert_eq!(stream.next().unwrap().unwrap().id, "a");
        match stream.next() {
            Some(Err(IngestError::Api { status, .. })) => assert_eq!(status, 503),
            other => panic!("expected API error, got {:?}", other.map(|r| r.map(|i| i.id))),
        }
        assert!(stream.next().is_none());
        assert_eq!(server.listing_requests().len(), 2);
    }
}
