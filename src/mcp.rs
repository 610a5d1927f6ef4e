use std::sync::Arc;

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    catalog::Catalog,
    error,
    index::{IndexStats, SearchHit},
    search::{self, DEFAULT_SEARCH_LIMIT, DEFAULT_SUGGEST_LIMIT},
    text_util,
};

#[derive(Clone)]
pub struct CatalogMcpServer {
    catalog: Arc<Catalog>,
    tool_router: ToolRouter<Self>,
}

impl CatalogMcpServer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl CatalogMcpServer {
    /// Substring search over every indexed catalog element.
    #[tool(
        name = "catalog_search",
        description = "Search data models, agreements, domains, applications, reference data, toolkit components, policies and glossary terms. Optionally restrict to comma-separated types."
    )]
    pub async fn catalog_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let mut request = search::SearchParams::new(params.query)
            .with_limit(params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        if let Some(types) = params.types {
            request = request.with_types(types);
        }

        let response = self
            .catalog
            .search(&request)
            .map_err(|e| invalid_params("search failed", e))?;

        let summary = format_search_summary(&response.results, &request.query);
        let structured = serde_json::to_value(&response)
            .map_err(|e| mcp_error("failed to serialize search results", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Name, title and domain suggestions for a partial query.
    #[tool(
        name = "catalog_suggest",
        description = "Suggest element names, short names, titles and domains that match a partial query."
    )]
    pub async fn catalog_suggest(
        &self,
        params: Parameters<SuggestParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let response = self
            .catalog
            .suggest(
                &params.query,
                params.limit.unwrap_or(DEFAULT_SUGGEST_LIMIT),
            )
            .map_err(|e| invalid_params("suggest failed", e))?;

        let summary = if response.suggestions.is_empty() {
            format!("No suggestions for \"{}\"", response.query)
        } else {
            response.suggestions.join("\n")
        };
        let structured = serde_json::to_value(&response)
            .map_err(|e| mcp_error("failed to serialize suggestions", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Current index statistics.
    #[tool(
        name = "catalog_stats",
        description = "Report how many documents and tokens the search index holds, per collection type."
    )]
    pub async fn catalog_stats(
        &self,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let stats = self.catalog.stats();
        let summary = format_stats_summary(&stats);
        let structured = serde_json::to_value(&stats)
            .map_err(|e| mcp_error("failed to serialize stats", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Rebuild the whole index, or one collection.
    #[tool(
        name = "catalog_rebuild",
        description = "Rebuild the search index from the collection files. Pass a collection type to reindex only that collection."
    )]
    pub async fn catalog_rebuild(
        &self,
        params: Parameters<RebuildParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let catalog = Arc::clone(&self.catalog);
        let collection = params.0.collection;
        let response = tokio::task::spawn_blocking(move || match collection {
            Some(document_type) => catalog.rebuild_collection(&document_type),
            None => catalog.rebuild(),
        })
        .await
        .map_err(|e| mcp_error("rebuild task failed", e))?
        .map_err(|e| mcp_error("rebuild failed", e))?;

        let summary = format!(
            "{}\n{}",
            response.message,
            format_stats_summary(&response.stats)
        );
        let structured = serde_json::to_value(&response)
            .map_err(|e| mcp_error("failed to serialize rebuild result", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for CatalogMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("datacat", env!("CARGO_PKG_VERSION"))
                    .with_title("datacat MCP"),
            )
            .with_instructions(
                "Use catalog_search to find catalog elements by keyword. Narrow with types (e.g. models,policies) when possible.",
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Search query string.
    pub query: String,
    /// Comma-separated document types, e.g. "models,policies".
    pub types: Option<String>,
    /// Maximum number of results (default: 50, max: 200).
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestParams {
    /// Partial query string.
    pub query: String,
    /// Maximum number of suggestions (default: 10, max: 50).
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebuildParams {
    /// Reindex only this collection type.
    pub collection: Option<String>,
}

fn format_search_summary(results: &[SearchHit], query: &str) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let mut lines = Vec::with_capacity(results.len() + 1);
    let suffix = if results.len() == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} result{} for \"{query}\":",
        results.len(),
        suffix
    ));

    for hit in results {
        lines.push(format!(
            "{}:{} {:.3}",
            hit.document_type, hit.document_id, hit.score
        ));
        let snippet = hit
            .fields
            .get("description")
            .and_then(|v| v.as_str())
            .and_then(|text| text_util::extract_snippet(text, query));
        if let Some(snippet) = snippet {
            lines.push(format!("  {snippet}"));
        }
    }

    lines.join("\n")
}

fn format_stats_summary(stats: &IndexStats) -> String {
    let mut lines = vec![format!(
        "{} documents, {} tokens",
        stats.total_documents, stats.total_tokens
    )];
    for (document_type, count) in &stats.documents_by_type {
        lines.push(format!("{document_type}: {count}"));
    }
    lines.join("\n")
}

fn invalid_params(message: &str, err: error::Error) -> rmcp::ErrorData {
    match err {
        error::Error::InvalidArgument(_) | error::Error::NotFound { .. } => {
            rmcp::ErrorData::invalid_params(format!("{message}: {err}"), None)
        }
        other => mcp_error(message, other),
    }
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

pub fn run_mcp(catalog: Catalog) -> error::Result<()> {
    let server = CatalogMcpServer::new(Arc::new(catalog));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            error::Error::Config(format!(
                "MCP server initialization failed: {e}"
            ))
        })?;
        running.waiting().await.map_err(|e| {
            error::Error::Config(format!("MCP server error: {e}"))
        })?;
        Ok(())
    })
}
