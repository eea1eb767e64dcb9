//! The lookup pipeline: search, resolve the top hit, fetch it, extract a preview.
//!
//! Every failure point is folded into [`LookupResult::Failure`] so each
//! delivery surface renders errors the same way.

pub mod events;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::iter;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::mdn::extractor::extract_snippet;
use crate::mdn::types::{ResolvedHit, SearchHit};
use crate::mdn::{DocsIndex, MdnError};

pub const NO_RESULTS_MESSAGE: &str = "No documentation found for this query.";

/// A non-empty search query. Sent as-is apart from URL encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// `None` for empty or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    /// First usable value among alternate field names, in preference order.
    pub fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<Self> {
        candidates.into_iter().flatten().find_map(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a lookup did not produce a page. Not part of the wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Missing or empty query, rejected before any network call.
    Validation,
    /// The index answered with zero hits.
    EmptySearchResult,
    /// A network call failed or returned a non-2xx status.
    Transport,
    /// The search response did not match the expected shape.
    Parse,
    /// A fault escaped the pipeline (panic) and was caught at the boundary.
    Internal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupSuccess {
    pub query: String,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupFailure {
    pub query: String,
    pub kind: FailureKind,
    pub message: String,
}

impl LookupFailure {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            query: String::new(),
            kind: FailureKind::Validation,
            message: message.into(),
        }
    }

    pub fn no_results(query: &Query) -> Self {
        Self {
            query: query.to_string(),
            kind: FailureKind::EmptySearchResult,
            message: NO_RESULTS_MESSAGE.to_string(),
        }
    }

    pub fn from_mdn(query: &Query, err: &MdnError) -> Self {
        let (kind, message) = if err.is_parse() {
            (
                FailureKind::Parse,
                format!("Failed to parse MDN search response: {err}"),
            )
        } else {
            (FailureKind::Transport, format!("Error fetching docs: {err}"))
        };
        Self {
            query: query.to_string(),
            kind,
            message,
        }
    }

    pub fn internal(query: &str, cause: &str) -> Self {
        Self {
            query: query.to_string(),
            kind: FailureKind::Internal,
            message: format!("Error processing request: {cause}"),
        }
    }
}

/// Outcome of one pipeline run. Exactly one shape is ever populated.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Success(LookupSuccess),
    Failure(LookupFailure),
}

impl LookupResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LookupResult::Success(_))
    }
}

/// Flat JSON shape shared by the request/response surface:
/// `{ success, query?, title?, snippet?, url?, summary?, message? }`.
/// `query` is absent only when the request carried none.
#[derive(Serialize)]
struct WireResult<'a> {
    success: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snippet: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl Serialize for LookupResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            LookupResult::Success(s) => WireResult {
                success: true,
                query: &s.query,
                title: Some(&s.title),
                snippet: Some(&s.snippet),
                url: Some(&s.url),
                summary: Some(&s.summary),
                message: None,
            },
            LookupResult::Failure(f) => WireResult {
                success: false,
                query: &f.query,
                title: None,
                snippet: None,
                url: None,
                summary: None,
                message: Some(&f.message),
            },
        };
        wire.serialize(serializer)
    }
}

/// Search hits known to be non-empty, in index order.
#[derive(Debug, Clone)]
pub struct RankedHits {
    top: SearchHit,
    rest: Vec<SearchHit>,
}

impl RankedHits {
    fn from_vec(hits: Vec<SearchHit>) -> Option<Self> {
        let mut iter = hits.into_iter();
        let top = iter.next()?;
        Some(Self {
            top,
            rest: iter.collect(),
        })
    }

    /// The authoritative hit; no secondary ranking is applied.
    pub fn top(&self) -> &SearchHit {
        &self.top
    }

    pub fn count(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchHit> {
        iter::once(&self.top).chain(self.rest.iter())
    }
}

/// Absolute document URL for a hit: origin and relative path concatenated.
pub fn document_url(origin: &str, hit: &SearchHit) -> String {
    format!("{origin}{}", hit.mdn_url)
}

/// Stage one: query the index. Zero hits is a failure of its own kind.
pub async fn search_stage<I: DocsIndex>(index: &I, query: &Query) -> Result<RankedHits, LookupFailure> {
    let hits = index.search(query.as_str()).await.map_err(|e| {
        warn!(%query, error = %e, "search failed");
        LookupFailure::from_mdn(query, &e)
    })?;
    debug!(%query, hits = hits.len(), "search stage complete");
    RankedHits::from_vec(hits).ok_or_else(|| {
        info!(%query, "no documentation found");
        LookupFailure::no_results(query)
    })
}

/// Stage two: fetch the hit's page, extract a preview, assemble the result.
/// A page without a usable paragraph still succeeds with an empty snippet.
pub async fn resolve_stage<I: DocsIndex>(index: &I, query: &Query, hit: &SearchHit) -> LookupResult {
    let url = document_url(index.origin(), hit);
    let html = match index.fetch_document(&url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(%url, error = %e, "document fetch failed");
            return LookupResult::Failure(LookupFailure::from_mdn(query, &e));
        }
    };

    let snippet = extract_snippet(&html);
    if snippet.is_empty() {
        debug!(%url, "no article paragraph found");
    }
    let summary = hit.summary().map(str::to_string).unwrap_or_else(|| snippet.clone());

    LookupResult::Success(LookupSuccess {
        query: query.to_string(),
        title: hit.title.clone(),
        url,
        snippet,
        summary,
    })
}

/// Run the full pipeline. Never fails; every error becomes a `Failure`.
pub async fn lookup<I: DocsIndex>(index: &I, query: &Query) -> LookupResult {
    let result = match search_stage(index, query).await {
        Ok(hits) => resolve_stage(index, query, hits.top()).await,
        Err(failure) => LookupResult::Failure(failure),
    };
    info!(%query, success = result.is_success(), "lookup complete");
    result
}

/// Multi-hit variant without document fetch: up to `limit` hits as index metadata.
pub async fn top_hits<I: DocsIndex>(
    index: &I,
    query: &Query,
    limit: usize,
) -> Result<Vec<ResolvedHit>, LookupFailure> {
    let hits = search_stage(index, query).await?;
    Ok(hits
        .iter()
        .take(limit)
        .map(|hit| ResolvedHit {
            title: hit.title.clone(),
            url: document_url(index.origin(), hit),
            summary: hit.summary.clone().unwrap_or_default(),
        })
        .collect())
}

/// Run `fut`, turning a panic inside it into the panic's message.
pub async fn guard<F: Future>(fut: F) -> Result<F::Output, String> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn q(s: &str) -> Query {
        Query::parse(s).unwrap()
    }

    #[test]
    fn query_rejects_empty_and_blank() {
        assert!(Query::parse("").is_none());
        assert!(Query::parse("   ").is_none());
        assert_eq!(Query::parse(" map ").unwrap().as_str(), " map ");
    }

    #[test]
    fn first_present_prefers_earlier_non_empty_value() {
        assert_eq!(
            Query::first_present([Some("a"), Some("b")]).unwrap().as_str(),
            "a"
        );
        assert_eq!(
            Query::first_present([Some(""), Some("b")]).unwrap().as_str(),
            "b"
        );
        assert_eq!(Query::first_present([None, Some("b")]).unwrap().as_str(), "b");
        assert!(Query::first_present([None, Some("")]).is_none());
    }

    #[tokio::test]
    async fn success_uses_top_hit_and_extracts_snippet() {
        let index = FakeIndex::new(
            FakeSearch::Hits(vec![
                hit("/en-US/docs/Array", "Array", Some("The Array object")),
                hit("/en-US/docs/TypedArray", "TypedArray", None),
            ]),
            Some("<article><p>JS arrays...</p></article>"),
        );

        let result = lookup(&index, &q("array")).await;
        assert_eq!(
            result,
            LookupResult::Success(LookupSuccess {
                query: "array".into(),
                title: "Array".into(),
                url: format!("{ORIGIN}/en-US/docs/Array"),
                snippet: "JS arrays...".into(),
                summary: "The Array object".into(),
            })
        );
        assert_eq!(index.fetch_count(), 1);
    }

    #[tokio::test]
    async fn summary_falls_back_to_snippet() {
        let index = FakeIndex::new(
            FakeSearch::Hits(vec![hit("/a", "A", Some(""))]),
            Some("<article><p>preview</p></article>"),
        );

        let LookupResult::Success(s) = lookup(&index, &q("a")).await else {
            panic!("expected success");
        };
        assert_eq!(s.summary, "preview");
    }

    #[tokio::test]
    async fn missing_paragraph_is_success_with_empty_snippet() {
        let index = FakeIndex::new(
            FakeSearch::Hits(vec![hit("/a", "A", None)]),
            Some("<html><body><h1>nothing here</h1></body></html>"),
        );

        let LookupResult::Success(s) = lookup(&index, &q("a")).await else {
            panic!("expected success");
        };
        assert_eq!(s.snippet, "");
        assert_eq!(s.summary, "");
    }

    #[tokio::test]
    async fn zero_hits_is_no_results_failure() {
        let index = FakeIndex::new(FakeSearch::Hits(vec![]), Some(""));

        let LookupResult::Failure(f) = lookup(&index, &q("zzzzzznotaword")).await else {
            panic!("expected failure");
        };
        assert_eq!(f.kind, FailureKind::EmptySearchResult);
        assert_eq!(f.message, "No documentation found for this query.");
        assert_eq!(f.query, "zzzzzznotaword");
        assert_eq!(index.fetch_count(), 0);
    }

    #[tokio::test]
    async fn search_transport_failure_embeds_cause() {
        let index = FakeIndex::new(FakeSearch::Status(502), Some(""));

        let LookupResult::Failure(f) = lookup(&index, &q("array")).await else {
            panic!("expected failure");
        };
        assert_eq!(f.kind, FailureKind::Transport);
        assert!(f.message.starts_with("Error fetching docs:"), "got: {}", f.message);
        assert!(f.message.contains("502"), "got: {}", f.message);
    }

    #[tokio::test]
    async fn search_parse_failure_is_distinguished() {
        let index = FakeIndex::new(FakeSearch::Malformed, Some(""));

        let LookupResult::Failure(f) = lookup(&index, &q("array")).await else {
            panic!("expected failure");
        };
        assert_eq!(f.kind, FailureKind::Parse);
        assert!(
            f.message.starts_with("Failed to parse MDN search response:"),
            "got: {}",
            f.message
        );
    }

    #[tokio::test]
    async fn document_fetch_failure_is_failure() {
        let index = FakeIndex::new(FakeSearch::Hits(vec![hit("/a", "A", None)]), None);

        let result = lookup(&index, &q("a")).await;
        let LookupResult::Failure(f) = &result else {
            panic!("expected failure");
        };
        assert_eq!(f.kind, FailureKind::Transport);
        assert!(f.message.contains("503"), "got: {}", f.message);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("snippet").is_none());
        assert!(json.get("url").is_none());
        assert!(json.get("title").is_none());
    }

    #[tokio::test]
    async fn top_hits_respects_limit_and_resolves_urls() {
        let index = FakeIndex::new(
            FakeSearch::Hits(vec![
                hit("/a", "A", Some("sa")),
                hit("/b", "B", None),
                hit("/c", "C", Some("sc")),
            ]),
            None,
        );

        let hits = top_hits(&index, &q("x"), 2).await.unwrap();
        assert_eq!(
            hits,
            vec![
                ResolvedHit {
                    title: "A".into(),
                    url: format!("{ORIGIN}/a"),
                    summary: "sa".into(),
                },
                ResolvedHit {
                    title: "B".into(),
                    url: format!("{ORIGIN}/b"),
                    summary: String::new(),
                },
            ]
        );
        assert_eq!(index.fetch_count(), 0);
    }

    #[tokio::test]
    async fn top_hits_empty_is_no_results() {
        let index = FakeIndex::new(FakeSearch::Hits(vec![]), None);
        let err = top_hits(&index, &q("x"), 5).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::EmptySearchResult);
    }

    #[tokio::test]
    async fn guard_captures_panic_message() {
        let index = FakeIndex::new(FakeSearch::Panic, None);
        let err = guard(lookup(&index, &q("boom"))).await.unwrap_err();
        assert_eq!(err, "index exploded");
    }

    #[test]
    fn success_serializes_flat_shape() {
        let result = LookupResult::Success(LookupSuccess {
            query: "array".into(),
            title: "Array".into(),
            url: "https://developer.mozilla.org/en-US/docs/Array".into(),
            snippet: "JS arrays...".into(),
            summary: "...".into(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "query": "array",
                "title": "Array",
                "snippet": "JS arrays...",
                "url": "https://developer.mozilla.org/en-US/docs/Array",
                "summary": "..."
            })
        );
    }

    #[test]
    fn failure_serializes_message_only() {
        let result = LookupResult::Failure(LookupFailure::no_results(&q("zzz")));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "query": "zzz",
                "message": "No documentation found for this query."
            })
        );
    }

    #[test]
    fn validation_failure_omits_query() {
        let result = LookupResult::Failure(LookupFailure::validation("query required"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "message": "query required" })
        );
    }
}
