mod errors;
mod params;

pub use params::{LookupParams, ToolHits};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use tracing::{error, info};

use errors::failure_to_tool_result;

use crate::lookup::{self, LookupFailure, Query};
use crate::mdn::{DocsIndex, MdnClient};

const DEFAULT_LIMIT: u32 = 5;

/// MCP server handler exposing the `mdnlookup` tool.
///
/// The tool returns index metadata for the top hits without fetching pages,
/// so a single call can answer with several candidates.
#[derive(Clone)]
pub struct MdnLookup<I = MdnClient> {
    index: I,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl<I> MdnLookup<I>
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    pub fn new(index: I) -> Self {
        Self {
            index,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "mdnlookup",
        description = "Fetches and summarizes developer documentation from MDN based on a search query.",
        output_schema = rmcp::handler::server::tool::schema_for_type::<ToolHits>(),
        annotations(
            title = "MDN Documentation Lookup",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn mdnlookup(
        &self,
        Parameters(params): Parameters<LookupParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = Query::parse(&params.query)
            .ok_or_else(|| McpError::invalid_params("query must not be empty", None))?;
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
        if limit < 1 {
            return Err(McpError::invalid_params("limit must be at least 1", None));
        }

        info!(%query, limit, "tool:mdnlookup");

        let outcome = lookup::guard(lookup::top_hits(&self.index, &query, limit as usize))
            .await
            .unwrap_or_else(|cause| {
                error!(%query, %cause, "tool:mdnlookup panicked");
                Err(LookupFailure::internal(query.as_str(), &cause))
            });

        match outcome {
            Ok(hits) => {
                info!(results = hits.len(), "mdnlookup complete");
                let payload = serde_json::to_value(ToolHits { result: hits })
                    .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                Ok(CallToolResult::structured(payload))
            }
            Err(failure) => Ok(failure_to_tool_result(failure)),
        }
    }
}

#[tool_handler]
impl<I> ServerHandler for MdnLookup<I>
where
    I: DocsIndex + Clone + Send + Sync + 'static,
{
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mdnlookup".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "mdnlookup searches MDN Web Docs and returns the best-matching pages (title, URL, summary) for a query."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
