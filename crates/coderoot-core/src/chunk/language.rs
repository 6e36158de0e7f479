//! Language identification and per-language node tables
//!
//! Each supported language declares two static node-kind tables: the
//! splittable set (any node whose kind is listed yields a chunk) and the
//! narrower definition subset (named declarations that earn the ranking
//! bonus). The tables are validated against the compiled grammars at
//! startup via [`validate_node_tables`].

use crate::error::{CoderootError, Result};
use std::path::Path;

/// Supported programming languages for AST chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    TypeScriptTsx,
    Go,
}

const RUST_SPLITTABLE: &[&str] = &[
    "function_item",
    "impl_item",
    "struct_item",
    "enum_item",
    "trait_item",
    "mod_item",
    "macro_definition",
];
const RUST_DEFINITIONS: &[&str] = &[
    "function_item",
    "struct_item",
    "enum_item",
    "trait_item",
];

const PYTHON_SPLITTABLE: &[&str] = &[
    "function_definition",
    "class_definition",
    "decorated_definition",
];
const PYTHON_DEFINITIONS: &[&str] = &["function_definition", "class_definition"];

const JAVASCRIPT_SPLITTABLE: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "class_declaration",
    "method_definition",
];
const JAVASCRIPT_DEFINITIONS: &[&str] = &[
    "function_declaration",
    "class_declaration",
    "method_definition",
];

const TYPESCRIPT_SPLITTABLE: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "class_declaration",
    "method_definition",
    "interface_declaration",
    "enum_declaration",
    "type_alias_declaration",
];
const TYPESCRIPT_DEFINITIONS: &[&str] = &[
    "function_declaration",
    "class_declaration",
    "method_definition",
    "interface_declaration",
    "enum_declaration",
];

const GO_SPLITTABLE: &[&str] = &[
    "function_declaration",
    "method_declaration",
    "type_declaration",
];
const GO_DEFINITIONS: &[&str] = &[
    "function_declaration",
    "method_declaration",
    "type_declaration",
];

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::TypeScriptTsx => "tsx",
            Self::Go => "go",
        }
    }

    /// Resolve a language identifier, including common aliases.
    pub fn from_identifier(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "rust" | "rs" => Some(Self::Rust),
            "python" | "py" => Some(Self::Python),
            "javascript" | "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "typescript" | "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::TypeScriptTsx),
            "go" | "golang" => Some(Self::Go),
            _ => None,
        }
    }

    /// Detect language from a file path extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_identifier(ext)
    }

    /// Node kinds that yield a chunk
    pub fn splittable_nodes(&self) -> &'static [&'static str] {
        match self {
            Self::Rust => RUST_SPLITTABLE,
            Self::Python => PYTHON_SPLITTABLE,
            Self::JavaScript => JAVASCRIPT_SPLITTABLE,
            Self::TypeScript | Self::TypeScriptTsx => TYPESCRIPT_SPLITTABLE,
            Self::Go => GO_SPLITTABLE,
        }
    }

    /// Node kinds that mark a chunk as a definition
    pub fn definition_nodes(&self) -> &'static [&'static str] {
        match self {
            Self::Rust => RUST_DEFINITIONS,
            Self::Python => PYTHON_DEFINITIONS,
            Self::JavaScript => JAVASCRIPT_DEFINITIONS,
            Self::TypeScript | Self::TypeScriptTsx => TYPESCRIPT_DEFINITIONS,
            Self::Go => GO_DEFINITIONS,
        }
    }

    /// The compiled tree-sitter grammar for this language
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::TypeScriptTsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    fn all() -> &'static [Language] {
        &[
            Self::Rust,
            Self::Python,
            Self::JavaScript,
            Self::TypeScript,
            Self::TypeScriptTsx,
            Self::Go,
        ]
    }
}

/// Validate every declared node kind against its compiled grammar.
///
/// A kind the grammar does not know would silently never match during
/// traversal, so a typo in the tables is caught here instead.
pub fn validate_node_tables() -> Result<()> {
    for lang in Language::all() {
        let grammar = lang.grammar();
        for kind in lang
            .splittable_nodes()
            .iter()
            .chain(lang.definition_nodes())
        {
            if grammar.id_for_node_kind(kind, true) == 0 {
                return Err(CoderootError::Parse(format!(
                    "unknown node kind '{}' for language {}",
                    kind,
                    lang.as_str()
                )));
            }
        }
    }
    Ok(())
}
