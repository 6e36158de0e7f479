//! Chunk size enforcement and trailing-context overlap
//!
//! Runs after the chunker: oversized chunks are re-split on line
//! boundaries, then a single global pass prepends a trailing-context
//! overlap from each chunk's predecessor. The overlap pass reads the
//! pre-overlap contents, so invoking it mid-pipeline can never compound.

use super::types::Chunk;

/// Maximum chunk size in characters
pub const CHUNK_MAX_CHARS: usize = 2500;
/// Trailing-context overlap between consecutive chunks, in characters
pub const CHUNK_OVERLAP_CHARS: usize = 300;

/// Enforce `max_size` on every chunk, then apply the overlap pass once.
pub fn refine(chunks: Vec<Chunk>, max_size: usize, overlap_size: usize) -> Vec<Chunk> {
    let mut refined: Vec<Chunk> = chunks
        .into_iter()
        .flat_map(|c| split_oversized(c, max_size))
        .collect();
    apply_overlap(&mut refined, overlap_size);
    refined
}

/// Re-split a chunk on line boundaries so each piece stays within
/// `max_size`. A single line longer than the bound is emitted as its own
/// sub-chunk rather than being cut mid-line.
pub fn split_oversized(chunk: Chunk, max_size: usize) -> Vec<Chunk> {
    if max_size == 0 || chunk.content.len() <= max_size {
        return vec![chunk];
    }

    let mut out = Vec::new();
    let mut buffer = String::new();
    let mut buffer_start_offset = 0;
    let line_count = chunk.content.split('\n').count();

    for (idx, line) in chunk.content.split('\n').enumerate() {
        let projected = if buffer.is_empty() {
            line.len()
        } else {
            buffer.len() + 1 + line.len()
        };

        if projected > max_size && !buffer.is_empty() {
            push_sub_chunk(&mut out, &chunk, &buffer, buffer_start_offset, idx - 1);
            buffer.clear();
            buffer_start_offset = idx;
        }

        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(line);
    }

    if !buffer.trim().is_empty() {
        push_sub_chunk(&mut out, &chunk, &buffer, buffer_start_offset, line_count - 1);
    }

    out
}

fn push_sub_chunk(
    out: &mut Vec<Chunk>,
    parent: &Chunk,
    buffer: &str,
    start_offset: usize,
    end_offset: usize,
) {
    let content = buffer.trim_end().to_string();
    if content.is_empty() {
        return;
    }
    out.push(Chunk {
        content,
        start_line: parent.start_line + start_offset,
        end_line: parent.start_line + end_offset,
        language: parent.language.clone(),
        file_path: parent.file_path.clone(),
        is_definition: parent.is_definition,
    });
}

/// Prepend to each chunk (except the first) the last `overlap_size`
/// characters of its predecessor's content, joined by a newline, and pull
/// `start_line` back by the newline count of the overlap text, floored at
/// line 1. Overlaps are taken from the pre-overlap contents.
///
/// The tail keeps its full `overlap_size` length and the joining newline
/// sits outside that budget, so refined content can reach
/// `max_size + overlap_size + 1` characters. Trimming the tail to make
/// room for the newline would break the guarantee that a chunk begins
/// with its predecessor's exact last `overlap_size` characters.
pub fn apply_overlap(chunks: &mut [Chunk], overlap_size: usize) {
    if overlap_size == 0 || chunks.len() < 2 {
        return;
    }

    let originals: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

    for i in 1..chunks.len() {
        let tail = content_tail(&originals[i - 1], overlap_size);
        if tail.is_empty() {
            continue;
        }
        let newlines = tail.matches('\n').count();
        let chunk = &mut chunks[i];
        chunk.content = format!("{}\n{}", tail, chunk.content);
        chunk.start_line = chunk.start_line.saturating_sub(newlines).max(1);
    }
}

/// Last `size` characters of `content`, kept on a char boundary.
fn content_tail(content: &str, size: usize) -> &str {
    if content.len() <= size {
        return content;
    }
    let mut start = content.len() - size;
    while start < content.len() && !content.is_char_boundary(start) {
        start += 1;
    }
    &content[start..]
}
