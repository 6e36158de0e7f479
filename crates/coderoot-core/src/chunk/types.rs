//! Core chunk types

/// A bounded unit of source text with location metadata, the unit of indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The chunk text content
    pub content: String,
    /// Starting line number (1-indexed, inclusive)
    pub start_line: usize,
    /// Ending line number (1-indexed, inclusive)
    pub end_line: usize,
    /// Source language identifier
    pub language: String,
    /// Relative file path, when known
    pub file_path: Option<String>,
    /// True when the chunk spans a named declaration (function/class/etc.)
    pub is_definition: bool,
}

impl Chunk {
    pub fn new(content: String, start_line: usize, end_line: usize, language: &str) -> Self {
        debug_assert!(end_line >= start_line);
        Self {
            content,
            start_line,
            end_line,
            language: language.to_string(),
            file_path: None,
            is_definition: false,
        }
    }

    pub fn with_file_path(mut self, file_path: Option<&str>) -> Self {
        self.file_path = file_path.map(|p| p.to_string());
        self
    }

    pub fn with_definition(mut self, is_definition: bool) -> Self {
        self.is_definition = is_definition;
        self
    }
}

/// Compute a stable chunk identifier from its location and content.
pub fn compute_chunk_id(relative_path: &str, start_line: usize, end_line: usize, content: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(relative_path.as_bytes());
    hasher.update(format!(":{}-{}:", start_line, end_line).as_bytes());
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex()[..32].to_string()
}
