//! Tree-sitter parser wrapper

use super::language::Language;
use crate::error::{Error, Result};
use tree_sitter::{Parser, Tree};

/// Parse source code into a tree-sitter CST
pub fn parse(source: &str, language: Language) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.grammar())
        .map_err(|e| Error::Parse(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::Parse("Failed to parse source".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rust() {
        let source = "fn main() { println!(\"Hello\"); }";
        let tree = parse(source, Language::Rust).unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn test_parse_python() {
        let source = "def main():\n    print('Hello')";
        let tree = parse(source, Language::Python).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_typescript() {
        let source = "function main(): void { console.log('Hello'); }";
        let tree = parse(source, Language::TypeScript).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn test_parse_go() {
        let source = "package main\n\nfunc main() { fmt.Println(\"Hello\") }";
        let tree = parse(source, Language::Go).unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }
}
