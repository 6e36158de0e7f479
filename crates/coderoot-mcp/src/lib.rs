//! Coderoot MCP Server
//!
//! Model Context Protocol server exposing codebase indexing and hybrid
//! code search to AI assistants.

mod protocol;
mod server;
mod tools;

pub use server::{start_server, McpServer};
