//! Vector and hybrid search over the collection store

use super::{
    cosine_similarity, fuse_scores, HybridOptions, SearchOptions, SearchResult, DEFINITION_BONUS,
};
use crate::error::Result;
use crate::store::filter::compile_filter;
use crate::store::sqlite::bytes_to_embedding;
use crate::store::{storage_name, SqliteStore};
use rusqlite::params_from_iter;
use std::collections::HashMap;

struct CandidateRow {
    result: SearchResult,
    vector: Vec<f32>,
}

impl SqliteStore {
    /// Vector similarity search: `1 - cosineDistance`, thresholded,
    /// filtered, descending, capped at `top_k`.
    pub fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let mut rows = self.load_candidates(collection, options.filter.as_deref())?;

        for row in &mut rows {
            row.result.score = cosine_similarity(&row.vector, query_vector);
        }
        let mut results: Vec<SearchResult> = rows
            .into_iter()
            .map(|r| r.result)
            .filter(|r| r.score >= options.threshold)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(options.top_k);
        Ok(results)
    }

    /// Hybrid search. The dense query vector is required; lexical text is
    /// optional. With text present, vector and lexical candidate sets are
    /// fused outer-join with missing scores as 0; without text the fusion
    /// collapses to `vectorScore + definitionBonus` over the vector
    /// candidates alone.
    pub fn hybrid_search(
        &self,
        collection: &str,
        query_vector: &[f32],
        query_text: Option<&str>,
        options: &HybridOptions,
    ) -> Result<Vec<SearchResult>> {
        let mut rows = self.load_candidates(collection, options.filter.as_deref())?;
        for row in &mut rows {
            row.result.score = cosine_similarity(&row.vector, query_vector);
        }
        rows.sort_by(|a, b| {
            b.result
                .score
                .partial_cmp(&a.result.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows.truncate(options.limit);

        let match_query = query_text.map(sanitize_match_query).unwrap_or_default();
        if match_query.is_empty() {
            // No lexical signal: inner-join semantics on vector candidates.
            let mut results: Vec<SearchResult> = rows
                .into_iter()
                .map(|r| {
                    let mut result = r.result;
                    if result.is_definition {
                        result.score += DEFINITION_BONUS;
                    }
                    result
                })
                .collect();
            results.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal)
            });
            return Ok(results);
        }

        let lexical = self.lexical_candidates(
            collection,
            &match_query,
            options.filter.as_deref(),
            options.limit,
        )?;

        // Outer join: vector candidates first (rank order), then
        // lexical-only candidates; stable sort keeps that order on ties.
        let vector_ids: HashMap<String, f32> = rows
            .iter()
            .map(|r| (r.result.id.clone(), r.result.score))
            .collect();
        let lexical_scores: HashMap<String, f32> =
            lexical.iter().map(|r| (r.result.id.clone(), r.result.score)).collect();

        let mut fused: Vec<SearchResult> = Vec::with_capacity(rows.len() + lexical.len());
        for row in rows {
            let mut result = row.result;
            let lexical_score = lexical_scores.get(&result.id).copied().unwrap_or(0.0);
            result.score = fuse_scores(result.score, lexical_score, result.is_definition);
            fused.push(result);
        }
        for row in lexical {
            if vector_ids.contains_key(&row.result.id) {
                continue;
            }
            let mut result = row.result;
            result.score = fuse_scores(0.0, result.score, result.is_definition);
            fused.push(result);
        }

        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(options.limit);
        Ok(fused)
    }

    fn load_candidates(
        &self,
        collection: &str,
        filter_expr: Option<&str>,
    ) -> Result<Vec<CandidateRow>> {
        let table = storage_name(collection);
        let mut sql = format!(
            "SELECT id, vector, content, relative_path, start_line, end_line,
                    file_extension, is_definition, metadata
             FROM {t}",
            t = table
        );
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();
        if let Some((fragment, mut values)) = filter_expr.and_then(compile_filter) {
            sql.push_str(" WHERE ");
            sql.push_str(&fragment);
            params_vec.append(&mut values);
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params_vec.iter()), |row| {
                let vector_bytes: Vec<u8> = row.get(1)?;
                Ok(CandidateRow {
                    vector: bytes_to_embedding(&vector_bytes),
                    result: result_from_row(row, 0.0)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Top lexical candidates by BM25 over the same filtered population.
    /// FTS5 bm25() is more negative for better matches, so the negated
    /// value ranks descending; normalization puts the best match at 1.0.
    fn lexical_candidates(
        &self,
        collection: &str,
        match_query: &str,
        filter_expr: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CandidateRow>> {
        let table = storage_name(collection);
        let mut sql = format!(
            "SELECT {t}.id, {t}.vector, {t}.content, {t}.relative_path, {t}.start_line,
                    {t}.end_line, {t}.file_extension, {t}.is_definition, {t}.metadata,
                    -1.0 * bm25({t}_fts) AS rank
             FROM {t}_fts
             JOIN {t} ON {t}.id = {t}_fts.id
             WHERE {t}_fts MATCH ?",
            t = table
        );
        let mut params_vec: Vec<rusqlite::types::Value> =
            vec![rusqlite::types::Value::Text(match_query.to_string())];
        if let Some((fragment, mut values)) = filter_expr.and_then(compile_filter) {
            sql.push_str(" AND ");
            sql.push_str(&fragment);
            params_vec.append(&mut values);
        }
        sql.push_str(&format!(" ORDER BY rank DESC LIMIT {}", limit));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
            .query_map(params_from_iter(params_vec.iter()), |row| {
                let vector_bytes: Vec<u8> = row.get(1)?;
                let rank: f64 = row.get(9)?;
                Ok(CandidateRow {
                    vector: bytes_to_embedding(&vector_bytes),
                    result: result_from_row(row, rank as f32)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let max_rank = rows
            .iter()
            .map(|r| r.result.score)
            .fold(0.0_f32, f32::max);
        if max_rank > 0.0 {
            for row in &mut rows {
                row.result.score /= max_rank;
            }
        }
        Ok(rows)
    }
}

fn result_from_row(row: &rusqlite::Row<'_>, score: f32) -> rusqlite::Result<SearchResult> {
    let metadata_raw: String = row.get(8)?;
    Ok(SearchResult {
        id: row.get(0)?,
        content: row.get(2)?,
        relative_path: row.get(3)?,
        start_line: row.get::<_, i64>(4)? as usize,
        end_line: row.get::<_, i64>(5)? as usize,
        file_extension: row.get(6)?,
        is_definition: row.get::<_, i64>(7)? != 0,
        metadata: serde_json::from_str(&metadata_raw).unwrap_or_default(),
        score,
    })
}

/// Sanitize free text into an FTS5 MATCH expression: every token is
/// double-quoted so query punctuation can never become FTS5 syntax.
pub fn sanitize_match_query(text: &str) -> String {
    text.split_whitespace()
        .map(|token| token.replace('"', ""))
        .filter(|token| !token.is_empty())
        .map(|token| format!("\"{}\"", token))
        .collect::<Vec<_>>()
        .join(" ")
}
