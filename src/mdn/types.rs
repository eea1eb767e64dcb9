use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Body of `GET /api/v1/search`.
///
/// Only `documents` is required; MDN sends more top-level fields (metadata,
/// suggestions) which are ignored.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub documents: Vec<SearchHit>,
}

/// One ranked entry from the search index.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Site-relative path, e.g. `/en-US/docs/Web/JavaScript/Reference/Global_Objects/Array`.
    pub mdn_url: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
}

impl SearchHit {
    /// Summary text if the index supplied a non-empty one.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }
}

/// A hit as handed out by the tool surface: absolute URL, no preview.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ResolvedHit {
    pub title: String,
    pub url: String,
    pub summary: String,
}
