//! Danmu (overlay comment) retrieval.
//!
//! A comment server answers an index request either with the full comment
//! list inline, or with a `barrage_list` of time segments, each pointing at
//! the comments for `[segment_start, segment_end)`. Segment lists are
//! memoized in the host store under the title's TMDB id so later seeks only
//! need the segment request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::http::{HttpClient, RequestOptions};
use crate::normalize::is_truthy;
use crate::storage::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSegment {
    pub segment_start: f64,
    pub segment_end: f64,
    pub segment_url: String,
}

impl TimeSegment {
    pub fn contains(&self, time: f64) -> bool {
        self.segment_start <= time && time < self.segment_end
    }
}

/// Store value kept under a TMDB id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentBundle {
    #[serde(default)]
    pub barrage_list: Option<Vec<TimeSegment>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentIndex {
    Segmented(Vec<TimeSegment>),
    Inline(Value),
    Missing,
}

impl CommentIndex {
    pub fn parse(payload: Option<&Value>) -> Self {
        let Some(payload) = payload else {
            return CommentIndex::Missing;
        };

        if let Some(list) = payload.get("barrage_list").filter(|v| is_truthy(v)) {
            return match serde_json::from_value::<Vec<TimeSegment>>(list.clone()) {
                Ok(segments) => CommentIndex::Segmented(segments),
                Err(e) => {
                    warn!("Malformed barrage_list: {}", e);
                    CommentIndex::Missing
                }
            };
        }

        match payload.get("comments").filter(|v| is_truthy(v)) {
            Some(comments) => CommentIndex::Inline(comments.clone()),
            None => CommentIndex::Missing,
        }
    }
}

/// First segment containing `time`. Linear, no ordering assumed.
pub fn find_segment(segments: &[TimeSegment], time: f64) -> Option<&TimeSegment> {
    segments.iter().find(|s| s.contains(time))
}

pub fn comment_index_url(server: &str, comment_id: &str) -> String {
    format!(
        "{}/api/v2/comment/{}?withRelated=true&chConvert=1",
        server.trim_end_matches('/'),
        urlencoding::encode(comment_id)
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeMatch {
    pub bangumi_id: String,
    pub anime_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub animes: Vec<AnimeMatch>,
}

/// Single placeholder match carrying the title; the server resolves it later
pub fn search(title: &str) -> SearchResult {
    SearchResult {
        animes: vec![AnimeMatch {
            bangumi_id: "-1".to_string(),
            anime_title: title.to_string(),
        }],
    }
}

pub struct SegmentResolver {
    http: Arc<dyn HttpClient>,
    store: Arc<dyn KeyValueStore>,
    user_agent: String,
    zlib_segments: bool,
}

impl SegmentResolver {
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: Arc<dyn KeyValueStore>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            http,
            store,
            user_agent: user_agent.into(),
            zlib_segments: false,
        }
    }

    pub fn with_zlib_segments(mut self, zlib_segments: bool) -> Self {
        self.zlib_segments = zlib_segments;
        self
    }

    /// Comments around `time`: memo first, then the server's comment index.
    /// Every failure degrades to `None`.
    pub async fn resolve(
        &self,
        tmdb_id: Option<&str>,
        time: f64,
        server: &str,
        comment_id: &str,
    ) -> Option<Value> {
        match self.try_resolve(tmdb_id, time, server, comment_id).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(comment_id, "Comment lookup failed: {}", e);
                None
            }
        }
    }

    /// Memo-only lookup; never touches the comment index
    pub async fn resolve_memoized(&self, tmdb_id: Option<&str>, time: f64) -> Option<Value> {
        let segments = self.memoized(tmdb_id?)?;
        match self.fetch_at(&segments, time).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Segment fetch failed: {}", e);
                None
            }
        }
    }

    async fn try_resolve(
        &self,
        tmdb_id: Option<&str>,
        time: f64,
        server: &str,
        comment_id: &str,
    ) -> Result<Option<Value>> {
        if let Some(segments) = tmdb_id.and_then(|id| self.memoized(id)) {
            debug!(tmdb_id, segments = segments.len(), "Using memoized segments");
            return self.fetch_at(&segments, time).await;
        }

        let url = comment_index_url(server, comment_id);
        let payload = self
            .http
            .get(&url, &RequestOptions::json(&self.user_agent))
            .await?;

        match CommentIndex::parse(payload.as_ref()) {
            CommentIndex::Segmented(segments) => {
                info!(comment_id, segments = segments.len(), "Fetched segment index");
                if let (Some(id), Some(payload)) = (tmdb_id, payload) {
                    if let Err(e) = self.store.set(id, payload) {
                        warn!(tmdb_id = id, "Failed to memoize segments: {}", e);
                    }
                }
                self.fetch_at(&segments, time).await
            }
            CommentIndex::Inline(comments) => Ok(Some(comments)),
            CommentIndex::Missing => {
                debug!(comment_id, "Comment index carried no comments");
                Ok(None)
            }
        }
    }

    fn memoized(&self, tmdb_id: &str) -> Option<Vec<TimeSegment>> {
        let value = self.store.get(tmdb_id)?;
        match serde_json::from_value::<SegmentBundle>(value) {
            Ok(bundle) => bundle.barrage_list,
            Err(e) => {
                warn!(tmdb_id, "Ignoring unreadable memo: {}", e);
                None
            }
        }
    }

    async fn fetch_at(&self, segments: &[TimeSegment], time: f64) -> Result<Option<Value>> {
        let Some(segment) = find_segment(segments, time) else {
            debug!(time, "No segment covers time");
            return Ok(None);
        };

        debug!(
            time,
            start = segment.segment_start,
            end = segment.segment_end,
            "Fetching segment"
        );
        let options = RequestOptions::json(&self.user_agent).with_zlib(self.zlib_segments);
        self.http.get(&segment.segment_url, &options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::FakeHttp;
    use serde_json::json;

    const SERVER: &str = "https://danmu.example.com";
    const UA: &str = "ForwardWidgets/1.0.0";

    fn index_url() -> String {
        format!("{}/api/v2/comment/10086?withRelated=true&chConvert=1", SERVER)
    }

    fn segmented_index() -> Value {
        json!({
            "barrage_list": [
                { "segment_start": 0, "segment_end": 100, "segment_url": "https://seg/a" },
                { "segment_start": 100, "segment_end": 200, "segment_url": "https://seg/b" }
            ]
        })
    }

    fn resolver(http: &FakeHttp, store: &MemoryStore) -> SegmentResolver {
        SegmentResolver::new(Arc::new(http.clone()), Arc::new(store.clone()), UA)
    }

    #[test]
    fn test_half_open_containment() {
        let segments: Vec<TimeSegment> =
            serde_json::from_value(segmented_index()["barrage_list"].clone()).unwrap();

        assert_eq!(find_segment(&segments, 0.0).unwrap().segment_url, "https://seg/a");
        assert_eq!(find_segment(&segments, 99.9).unwrap().segment_url, "https://seg/a");
        assert_eq!(find_segment(&segments, 100.0).unwrap().segment_url, "https://seg/b");
        assert_eq!(find_segment(&segments, 150.0).unwrap().segment_url, "https://seg/b");
        assert!(find_segment(&segments, 200.0).is_none());
        assert!(find_segment(&segments, -1.0).is_none());
    }

    #[test]
    fn test_unsorted_segments() {
        let segments = vec![
            TimeSegment {
                segment_start: 300.0,
                segment_end: 400.0,
                segment_url: "late".to_string(),
            },
            TimeSegment {
                segment_start: 0.0,
                segment_end: 300.0,
                segment_url: "early".to_string(),
            },
        ];
        assert_eq!(find_segment(&segments, 10.0).unwrap().segment_url, "early");
    }

    #[test]
    fn test_index_url() {
        assert_eq!(comment_index_url(&format!("{}/", SERVER), "10086"), index_url());
    }

    #[test]
    fn test_parse_index_shapes() {
        assert!(matches!(
            CommentIndex::parse(Some(&segmented_index())),
            CommentIndex::Segmented(s) if s.len() == 2
        ));
        assert_eq!(
            CommentIndex::parse(Some(&json!({ "comments": [{ "m": "hi" }] }))),
            CommentIndex::Inline(json!([{ "m": "hi" }]))
        );
        assert_eq!(CommentIndex::parse(Some(&json!({ "count": 0 }))), CommentIndex::Missing);
        assert_eq!(CommentIndex::parse(None), CommentIndex::Missing);
        assert_eq!(
            CommentIndex::parse(Some(&json!({ "barrage_list": "nope" }))),
            CommentIndex::Missing
        );
    }

    #[tokio::test]
    async fn test_resolve_fetches_containing_segment() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        http.respond(&index_url(), segmented_index());
        http.respond("https://seg/b", json!([{ "m": "b" }]));

        let r = resolver(&http, &store);
        let payload = r.resolve(Some("1396"), 150.0, SERVER, "10086").await;
        assert_eq!(payload, Some(json!([{ "m": "b" }])));

        let payload = r.resolve(Some("1396"), 100.0, SERVER, "10086").await;
        assert_eq!(payload, Some(json!([{ "m": "b" }])));

        assert_eq!(r.resolve(Some("1396"), 250.0, SERVER, "10086").await, None);
    }

    #[tokio::test]
    async fn test_index_fetched_once_per_tmdb_id() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        http.respond(&index_url(), segmented_index());
        http.respond("https://seg/a", json!([{ "m": "a" }]));
        http.respond("https://seg/b", json!([{ "m": "b" }]));

        let r = resolver(&http, &store);
        r.resolve(Some("1396"), 10.0, SERVER, "10086").await;
        r.resolve(Some("1396"), 150.0, SERVER, "10086").await;

        let index_hits = http.requests().iter().filter(|u| **u == index_url()).count();
        assert_eq!(index_hits, 1);
        assert_eq!(store.get("1396"), Some(segmented_index()));
    }

    #[tokio::test]
    async fn test_inline_comments_bypass_segments() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        http.respond(&index_url(), json!({ "count": 1, "comments": [{ "m": "all" }] }));

        let r = resolver(&http, &store);
        let payload = r.resolve(Some("1396"), 5000.0, SERVER, "10086").await;
        assert_eq!(payload, Some(json!([{ "m": "all" }])));
        assert_eq!(store.get("1396"), None);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_none() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        let r = resolver(&http, &store);

        // Index unreachable
        assert_eq!(r.resolve(Some("1"), 0.0, SERVER, "10086").await, None);

        // Index with neither shape
        http.respond(&index_url(), json!({}));
        assert_eq!(r.resolve(Some("1"), 0.0, SERVER, "10086").await, None);

        // Empty body
        http.respond_empty(&index_url());
        assert_eq!(r.resolve(Some("1"), 0.0, SERVER, "10086").await, None);

        // Segment unreachable
        http.respond(&index_url(), segmented_index());
        http.fail("https://seg/a");
        assert_eq!(r.resolve(Some("1"), 0.0, SERVER, "10086").await, None);
    }

    #[tokio::test]
    async fn test_memoized_lookup_never_hits_index() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        let r = resolver(&http, &store);

        assert_eq!(r.resolve_memoized(Some("1396"), 10.0).await, None);
        assert_eq!(r.resolve_memoized(None, 10.0).await, None);
        assert!(http.requests().is_empty());

        store.set("1396", segmented_index()).unwrap();
        http.respond("https://seg/a", json!([{ "m": "a" }]));
        assert_eq!(
            r.resolve_memoized(Some("1396"), 10.0).await,
            Some(json!([{ "m": "a" }]))
        );
        assert_eq!(http.requests(), vec!["https://seg/a".to_string()]);
    }

    #[tokio::test]
    async fn test_without_tmdb_id_nothing_is_memoized() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        http.respond(&index_url(), segmented_index());
        http.respond("https://seg/a", json!("<i></i>"));

        let r = resolver(&http, &store);
        assert_eq!(
            r.resolve(None, 1.0, SERVER, "10086").await,
            Some(json!("<i></i>"))
        );
        r.resolve(None, 2.0, SERVER, "10086").await;
        let index_hits = http.requests().iter().filter(|u| **u == index_url()).count();
        assert_eq!(index_hits, 2);
    }

    #[tokio::test]
    async fn test_segment_request_options() {
        let http = FakeHttp::new();
        let store = MemoryStore::new();
        store.set("7", segmented_index()).unwrap();
        http.respond("https://seg/a", json!([]));

        let r = resolver(&http, &store).with_zlib_segments(true);
        r.resolve_memoized(Some("7"), 1.0).await;

        let options = http.options_for("https://seg/a").unwrap();
        assert!(options.zlib_mode);
        assert!(options
            .headers
            .contains(&("User-Agent".to_string(), UA.to_string())));
    }

    #[test]
    fn test_search_placeholder() {
        let result = search("进击的巨人");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "animes": [{ "bangumiId": "-1", "animeTitle": "进击的巨人" }] })
        );
    }
}
