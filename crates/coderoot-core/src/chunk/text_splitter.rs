//! Generic line-based text splitter
//!
//! Fallback for files with no recognized language, parse failures, or
//! sources where the CST yields no splittable nodes. Produces size-bounded
//! chunks on its own, with the same signature as the AST chunker.

use super::types::Chunk;

/// Default chunk bound for fallback splitting, in characters
pub const TEXT_CHUNK_CHARS: usize = 2500;

pub struct TextSplitter {
    max_chars: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(TEXT_CHUNK_CHARS)
    }
}

impl TextSplitter {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Split raw text into size-bounded chunks on line boundaries.
    pub fn split(&self, code: &str, language: &str, file_path: Option<&str>) -> Vec<Chunk> {
        if code.is_empty() {
            return Vec::new();
        }
        if code.len() <= self.max_chars {
            let end_line = code.lines().count().max(1);
            return vec![
                Chunk::new(code.to_string(), 1, end_line, language).with_file_path(file_path),
            ];
        }

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_start_line = 1;

        for (idx, line) in code.split('\n').enumerate() {
            let line_no = idx + 1;
            let projected = if buffer.is_empty() {
                line.len()
            } else {
                buffer.len() + 1 + line.len()
            };

            if projected > self.max_chars && !buffer.is_empty() {
                chunks.push(
                    Chunk::new(
                        buffer.trim_end().to_string(),
                        buffer_start_line,
                        line_no - 1,
                        language,
                    )
                    .with_file_path(file_path),
                );
                buffer = String::new();
                buffer_start_line = line_no;
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(line);
        }

        if !buffer.trim().is_empty() {
            let end_line = buffer_start_line + buffer.matches('\n').count();
            chunks.push(
                Chunk::new(buffer.trim_end().to_string(), buffer_start_line, end_line, language)
                    .with_file_path(file_path),
            );
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_content_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("line one\nline two", "text", Some("notes.txt"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[0].file_path.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_split_respects_bound() {
        let content = (1..=40)
            .map(|i| format!("line number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let splitter = TextSplitter::new(60);
        let chunks = splitter.split(&content, "text", None);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.len() <= 60);
        }
    }

    #[test]
    fn test_line_numbers_contiguous() {
        let content = (1..=20)
            .map(|i| format!("row {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let splitter = TextSplitter::new(30);
        let chunks = splitter.split(&content, "text", None);

        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_line, pair[0].end_line + 1);
        }
    }

    #[test]
    fn test_empty_content() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("", "text", None).is_empty());
    }
}
