//! MCP tool definitions and handlers

use crate::protocol::*;
use anyhow::Result;
use coderoot_core::{IndexOptions, Indexer, SearchQuery, StartOutcome};
use serde_json::Value;
use std::path::Path;

pub fn index_codebase_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "index_codebase".to_string(),
        description: "Index a codebase directory for semantic code search. Returns immediately; poll get_indexing_status for progress.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Absolute path to the codebase directory"
                },
                "force": {
                    "type": "boolean",
                    "description": "Re-index even if already indexed (default: false)",
                    "default": false
                },
                "extensions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Extra file extensions to index beyond the defaults"
                },
                "ignorePatterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Glob patterns (relative paths) to skip"
                }
            },
            "required": ["path"]
        }),
    }
}

pub fn search_code_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_code".to_string(),
        description: "Hybrid semantic and keyword search over indexed code. Searches one codebase when path is given, otherwise all indexed codebases.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language or keyword query"
                },
                "path": {
                    "type": "string",
                    "description": "Codebase path to search (omit to search all)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum results (default: 10)",
                    "default": 10
                },
                "extensions": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Restrict results to these file extensions"
                }
            },
            "required": ["query"]
        }),
    }
}

pub fn get_indexing_status_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_indexing_status".to_string(),
        description: "Report indexing status for a codebase, or for every known codebase when path is omitted.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Codebase path (omit for all)"
                }
            }
        }),
    }
}

pub fn clear_index_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "clear_index".to_string(),
        description: "Remove a codebase's index and state".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Codebase path to clear"
                }
            },
            "required": ["path"]
        }),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing {}", key))
}

fn string_array(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

pub async fn handle_index_codebase(indexer: &Indexer, args: Value) -> Result<ToolResult> {
    let path = required_str(&args, "path")?;
    let options = IndexOptions {
        force: args.get("force").and_then(|v| v.as_bool()).unwrap_or(false),
        extensions: string_array(&args, "extensions"),
        ignore_patterns: string_array(&args, "ignorePatterns"),
    };

    match indexer.start(Path::new(path), options, None).await? {
        StartOutcome::Started { collection } => Ok(ToolResult::text(
            format!("Indexing started for {}", path),
            Some(serde_json::json!({
                "status": "indexing",
                "path": path,
                "collection": collection,
            })),
        )),
        // Capacity exhaustion is informational, not a tool failure:
        // retrying cannot succeed until a codebase is cleared.
        StartOutcome::CollectionLimit { message } => Ok(ToolResult::text(
            message.clone(),
            Some(serde_json::json!({
                "status": "collection_limit",
                "path": path,
                "message": message,
            })),
        )),
    }
}

pub async fn handle_search_code(indexer: &Indexer, args: Value) -> Result<ToolResult> {
    let query = required_str(&args, "query")?;
    let search = SearchQuery {
        limit: args.get("limit").and_then(|v| v.as_u64()).unwrap_or(10) as usize,
        extensions: string_array(&args, "extensions"),
    };

    let structured = match args.get("path").and_then(|v| v.as_str()) {
        Some(path) => {
            let results = indexer.search(Path::new(path), query, &search).await?;
            serde_json::json!({
                "results": [{
                    "path": path,
                    "results": results,
                }]
            })
        }
        None => {
            let grouped = indexer.search_all(query, &search).await?;
            serde_json::json!({ "results": grouped })
        }
    };

    let total: usize = structured["results"]
        .as_array()
        .map(|groups| {
            groups
                .iter()
                .filter_map(|g| g["results"].as_array().map(|r| r.len()))
                .sum()
        })
        .unwrap_or(0);
    Ok(ToolResult::text(
        format!("Found {} results for \"{}\"", total, query),
        Some(structured),
    ))
}

pub async fn handle_get_indexing_status(indexer: &Indexer, args: Value) -> Result<ToolResult> {
    match args.get("path").and_then(|v| v.as_str()) {
        Some(path) => {
            let state = indexer.status(Path::new(path));
            Ok(ToolResult::text(
                format!("{}: {:?}", path, state.status),
                Some(serde_json::to_value(&state)?),
            ))
        }
        None => {
            let states = indexer.all_statuses();
            Ok(ToolResult::text(
                format!("{} known codebases", states.len()),
                Some(serde_json::json!({ "codebases": states })),
            ))
        }
    }
}

pub async fn handle_clear_index(indexer: &Indexer, args: Value) -> Result<ToolResult> {
    let path = required_str(&args, "path")?;
    let dropped = indexer.clear(Path::new(path)).await?;
    Ok(ToolResult::text(
        if dropped {
            format!("Cleared index for {}", path)
        } else {
            format!("No index existed for {}", path)
        },
        Some(serde_json::json!({ "path": path, "dropped": dropped })),
    ))
}
