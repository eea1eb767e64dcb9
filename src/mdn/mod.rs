//! Client for the MDN search API and page host.

pub mod extractor;
pub mod types;

use std::env;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use types::{SearchHit, SearchResponse};

/// Origin that search hits' `mdn_url` paths are resolved against.
pub const MDN_ORIGIN: &str = "https://developer.mozilla.org";
/// Locale sent with every search request.
pub const SEARCH_LOCALE: &str = "en-US";

const SEARCH_PATH: &str = "/api/v1/search";
const MAX_RESPONSE_BYTES: usize = 10_000_000;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

/// Shared HTTP client for search and page requests.
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

#[derive(Debug, thiserror::Error)]
pub enum MdnError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("request failed with status code {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("{0}")]
    Parse(#[source] serde_json::Error),
}

impl MdnError {
    /// True when the service answered but the body did not match the expected shape.
    pub fn is_parse(&self) -> bool {
        matches!(self, MdnError::Parse(_))
    }
}

/// The documentation index as seen by the lookup pipeline.
/// Implemented by `MdnClient` for production; in-memory doubles are used in tests.
pub trait DocsIndex {
    /// Origin joined with a hit's relative path to form the document URL.
    fn origin(&self) -> &str;

    /// Ranked hits for `query`, best first.
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<SearchHit>, MdnError>> + Send;

    /// Raw markup of the page at `url`.
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String, MdnError>> + Send;
}

#[derive(Clone, Debug)]
pub struct MdnClient {
    http: Client,
    base_url: String,
}

impl MdnClient {
    /// Client for the public MDN site, or for `MDN_BASE_URL` when set.
    pub fn from_env(http: Client) -> Self {
        let base_url = env::var("MDN_BASE_URL")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| MDN_ORIGIN.to_string());
        if base_url != MDN_ORIGIN {
            debug!(%base_url, "using custom MDN origin");
        }
        Self { http, base_url }
    }

    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, MdnError> {
        let endpoint = format!("{}{SEARCH_PATH}", self.base_url);
        Ok(Url::parse_with_params(
            &endpoint,
            &[("q", query), ("locale", SEARCH_LOCALE)],
        )?)
    }

    async fn get_text(&self, url: &str) -> Result<String, MdnError> {
        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MdnError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > MAX_RESPONSE_BYTES
        {
            return Err(MdnError::TooLarge);
        }

        let mut body = Vec::new();
        let mut stream = response;
        while let Some(chunk) = stream.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_RESPONSE_BYTES {
                return Err(MdnError::TooLarge);
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl DocsIndex for MdnClient {
    fn origin(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, MdnError> {
        let url = self.search_url(query)?;
        let body = self.get_text(url.as_str()).await?;
        let parsed: SearchResponse = serde_json::from_str(&body).map_err(MdnError::Parse)?;
        debug!(hits = parsed.documents.len(), "mdn search complete");
        Ok(parsed.documents)
    }

    async fn fetch_document(&self, url: &str) -> Result<String, MdnError> {
        let html = self.get_text(url).await?;
        debug!(%url, bytes = html.len(), "document fetched");
        Ok(html)
    }
}
