//! Language-aware code chunking
//!
//! Splits source text into bounded, semantically meaningful chunks using
//! tree-sitter node boundaries. Nodes listed in a language's splittable
//! table each yield one chunk; traversal always continues into children, so
//! nested units (a method inside a class) produce their own chunks and the
//! resulting parent/child overlap is preserved, not deduplicated.

pub mod language;
pub mod parser;
pub mod refiner;
pub mod text_splitter;
pub mod types;

pub use language::{validate_node_tables, Language};
pub use refiner::{refine, CHUNK_MAX_CHARS, CHUNK_OVERLAP_CHARS};
pub use text_splitter::TextSplitter;
pub use types::{compute_chunk_id, Chunk};

use crate::error::Result;
use tracing::debug;
use tree_sitter::Node;

/// AST-driven chunker with a generic text fallback
pub struct AstChunker {
    fallback: TextSplitter,
}

impl Default for AstChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl AstChunker {
    pub fn new() -> Self {
        Self {
            fallback: TextSplitter::default(),
        }
    }

    /// Split source code into an ordered sequence of chunks.
    ///
    /// `language` is an identifier or alias ("rust", "js", "py", ...). When
    /// it is unrecognized, parsing fails, or the tree yields no splittable
    /// nodes, the generic text splitter takes over.
    pub fn split(&self, code: &str, language: &str, file_path: Option<&str>) -> Result<Vec<Chunk>> {
        let lang = match Language::from_identifier(language) {
            Some(lang) => lang,
            None => {
                debug!(language, "no language mapping, using text splitter");
                return Ok(self.fallback.split(code, language, file_path));
            }
        };

        let tree = match parser::parse(code, lang) {
            Ok(tree) => tree,
            Err(e) => {
                debug!(error = %e, language = lang.as_str(), "parse failed, using text splitter");
                return Ok(self.fallback.split(code, language, file_path));
            }
        };

        let mut chunks = Vec::new();
        collect_chunks(code, tree.root_node(), lang, file_path, &mut chunks);

        if chunks.is_empty() {
            debug!(language = lang.as_str(), "no splittable nodes, using text splitter");
            return Ok(self.fallback.split(code, language, file_path));
        }

        Ok(chunks)
    }
}

fn collect_chunks(
    source: &str,
    node: Node,
    lang: Language,
    file_path: Option<&str>,
    chunks: &mut Vec<Chunk>,
) {
    let kind = node.kind();
    if lang.splittable_nodes().contains(&kind) {
        let content = source[node.start_byte()..node.end_byte()].to_string();
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let is_definition = lang.definition_nodes().contains(&kind);

        chunks.push(
            Chunk::new(content, start_line, end_line, lang.as_str())
                .with_file_path(file_path)
                .with_definition(is_definition),
        );
    }

    // Always descend: nested declarations get their own chunks.
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_chunks(source, child, lang, file_path, chunks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_function_chunk() {
        let code = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}";
        let chunks = AstChunker::new().split(code, "rust", Some("math.rs")).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, code);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
        assert!(chunks[0].is_definition);
    }

    #[test]
    fn test_nested_units_each_chunked() {
        let code = r#"
class Greeter:
    def greet(self):
        return "hi"
"#;
        let chunks = AstChunker::new().split(code, "python", None).unwrap();

        // Class and nested method both yield chunks; overlap is preserved.
        assert!(chunks.len() >= 2);
        let class_chunk = chunks.iter().find(|c| c.content.starts_with("class")).unwrap();
        let method_chunk = chunks.iter().find(|c| c.content.starts_with("def")).unwrap();
        assert!(class_chunk.start_line <= method_chunk.start_line);
        assert!(class_chunk.content.contains("def greet"));
    }

    #[test]
    fn test_alias_resolution() {
        let code = "function hello() { return 1; }";
        let chunks = AstChunker::new().split(code, "js", None).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].language, "javascript");
        assert!(chunks[0].is_definition);
    }

    #[test]
    fn test_typescript_interface() {
        let code = "interface Point {\n  x: number;\n  y: number;\n}";
        let chunks = AstChunker::new().split(code, "ts", None).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_definition);
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let code = "# Heading\n\nSome markdown prose.";
        let chunks = AstChunker::new().split(code, "markdown", None).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, code);
        assert!(!chunks[0].is_definition);
    }

    #[test]
    fn test_no_splittable_nodes_falls_back() {
        // Valid rust, but nothing in the splittable table.
        let code = "use std::collections::HashMap;";
        let chunks = AstChunker::new().split(code, "rust", None).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, code);
    }

    #[test]
    fn test_emission_order_is_monotonic() {
        let code = r#"
fn first() {}

fn second() {}

struct Third;
"#;
        let chunks = AstChunker::new().split(code, "rust", None).unwrap();

        assert!(chunks.len() >= 3);
        for pair in chunks.windows(2) {
            assert!(pair[1].start_line >= pair[0].start_line);
        }
    }
}
