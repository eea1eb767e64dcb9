use rmcp::model::{CallToolResult, Content};
use tracing::warn;

use crate::lookup::{FailureKind, LookupFailure};

/// Render a search failure as a tool payload.
/// An empty result set is an answer, not an error; everything else is flagged `isError`.
pub(super) fn failure_to_tool_result(failure: LookupFailure) -> CallToolResult {
    match failure.kind {
        FailureKind::EmptySearchResult => {
            CallToolResult::success(vec![Content::text(failure.message)])
        }
        _ => {
            warn!(kind = ?failure.kind, message = %failure.message, "tool:mdnlookup failed");
            CallToolResult::error(vec![Content::text(failure.message)])
        }
    }
}
