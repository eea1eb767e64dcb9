use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::mdn::types::ResolvedHit;

#[derive(Deserialize, JsonSchema)]
pub struct LookupParams {
    /// Search query (e.g., "Array.prototype.map", "flexbox", "fetch API")
    pub query: String,
    /// Maximum number of results to return (minimum 1, default: 5)
    #[schemars(range(min = 1))]
    pub limit: Option<u32>,
}

/// Structured payload of a successful `mdnlookup` call.
#[derive(Serialize, JsonSchema)]
pub struct ToolHits {
    /// Best matches first
    pub result: Vec<ResolvedHit>,
}
