//! Progress events for the streaming surface.
//!
//! A run is `start`, one or more `progress`, then exactly one terminal
//! `complete` or `error`. Nothing follows the terminal event. A query that
//! fails validation skips `start` and yields a lone `error`.

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{guard, resolve_stage, search_stage, LookupFailure, LookupResult, LookupSuccess, Query, RankedHits};
use crate::mdn::DocsIndex;

pub const MISSING_QUERY_MESSAGE: &str = "Query field \"query\" or \"q\" is required";
pub const SEARCHING_MESSAGE: &str = "Searching MDN...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Start {
        query: String,
    },
    Progress {
        message: String,
    },
    Complete {
        success: bool,
        query: String,
        title: String,
        snippet: String,
        url: String,
        summary: String,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Complete { .. } | ProgressEvent::Error { .. })
    }

    /// One self-contained NDJSON line, newline included.
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    fn progress(message: impl Into<String>) -> Self {
        ProgressEvent::Progress {
            message: message.into(),
        }
    }

    fn error(failure: LookupFailure) -> Self {
        ProgressEvent::Error {
            message: failure.message,
        }
    }
}

impl From<LookupSuccess> for ProgressEvent {
    fn from(s: LookupSuccess) -> Self {
        ProgressEvent::Complete {
            success: true,
            query: s.query,
            title: s.title,
            snippet: s.snippet,
            url: s.url,
            summary: s.summary,
        }
    }
}

enum State<I> {
    Idle { index: I, raw_query: String },
    Started { index: I, query: Query },
    Searching { index: I, query: Query },
    /// Search returned hits; the top one is being fetched and extracted.
    Resolving { index: I, query: Query, hits: RankedHits },
    Terminal,
}

/// Drive the pipeline for `raw_query`, yielding each event as soon as it is known.
/// The stream is fused: once the terminal event is out, every poll yields `None`.
pub fn lookup_events<I>(index: I, raw_query: String) -> impl Stream<Item = ProgressEvent> + Send + 'static
where
    I: DocsIndex + Send + Sync + 'static,
{
    stream::unfold(State::Idle { index, raw_query }, |state| async move {
        let (event, next) = step(state).await?;
        if let ProgressEvent::Error { message } = &event {
            warn!(%message, "stream terminated with error");
        } else if event.is_terminal() {
            debug!("stream terminated with complete");
        }
        Some((event, next))
    })
    .fuse()
}

async fn step<I: DocsIndex + Sync>(state: State<I>) -> Option<(ProgressEvent, State<I>)> {
    match state {
        State::Idle { index, raw_query } => match Query::parse(&raw_query) {
            Some(query) => {
                info!(%query, "stream:start");
                let event = ProgressEvent::Start {
                    query: query.to_string(),
                };
                Some((event, State::Started { index, query }))
            }
            None => Some((
                ProgressEvent::error(LookupFailure::validation(MISSING_QUERY_MESSAGE)),
                State::Terminal,
            )),
        },
        State::Started { index, query } => Some((
            ProgressEvent::progress(SEARCHING_MESSAGE),
            State::Searching { index, query },
        )),
        State::Searching { index, query } => match guard(search_stage(&index, &query)).await {
            Ok(Ok(hits)) => {
                let event = ProgressEvent::progress(format!(
                    "Found {} results, fetching content...",
                    hits.count()
                ));
                Some((event, State::Resolving { index, query, hits }))
            }
            Ok(Err(failure)) => Some((ProgressEvent::error(failure), State::Terminal)),
            Err(cause) => Some((
                ProgressEvent::error(LookupFailure::internal(query.as_str(), &cause)),
                State::Terminal,
            )),
        },
        State::Resolving { index, query, hits } => {
            let event = match guard(resolve_stage(&index, &query, hits.top())).await {
                Ok(LookupResult::Success(success)) => {
                    info!(%query, url = %success.url, "stream complete");
                    ProgressEvent::from(success)
                }
                Ok(LookupResult::Failure(failure)) => ProgressEvent::error(failure),
                Err(cause) => ProgressEvent::error(LookupFailure::internal(query.as_str(), &cause)),
            };
            Some((event, State::Terminal))
        }
        State::Terminal => None,
    }
}
