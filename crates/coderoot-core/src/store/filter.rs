//! Filter predicate parsing and compilation
//!
//! A small predicate language over known field aliases:
//! `field == value`, `field in [v1, v2]`, and `and`-conjunctions. Input is
//! parsed into an AST and compiled to parameterized SQL, so values never
//! reach the statement text. Statement separators are stripped before
//! parsing; clauses the parser does not understand are passed through
//! as-is (caller responsibility), still with separators removed.

use rusqlite::types::Value as SqlValue;

/// A literal value in a filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Int(i64),
}

impl FilterValue {
    fn to_sql(&self) -> SqlValue {
        match self {
            Self::Str(s) => SqlValue::Text(s.clone()),
            Self::Int(i) => SqlValue::Integer(*i),
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Eq(String, FilterValue),
    In(String, Vec<FilterValue>),
    And(Vec<FilterExpr>),
    /// Unrecognized predicate text, passed through verbatim (separators stripped)
    Raw(String),
}

/// Map caller-facing field aliases to column names; unknown fields are
/// reduced to identifier characters so they can never carry SQL syntax.
fn column_for_field(field: &str) -> String {
    match field {
        "relativePath" | "relative_path" => "relative_path".to_string(),
        "startLine" | "start_line" => "start_line".to_string(),
        "endLine" | "end_line" => "end_line".to_string(),
        "fileExtension" | "file_extension" => "file_extension".to_string(),
        other => other
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect(),
    }
}

/// Parse a filter string. Returns `None` for blank input.
pub fn parse_filter(input: &str) -> Option<FilterExpr> {
    let stripped: String = input.chars().filter(|c| *c != ';').collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }

    let clauses: Vec<&str> = split_conjunctions(trimmed);
    let mut parsed = Vec::with_capacity(clauses.len());
    for clause in &clauses {
        match parse_clause(clause) {
            Some(expr) => parsed.push(expr),
            // One opaque clause makes the whole expression opaque: the
            // caller's text is preserved rather than partially rewritten.
            None => return Some(FilterExpr::Raw(trimmed.to_string())),
        }
    }

    if parsed.len() == 1 {
        parsed.pop()
    } else {
        Some(FilterExpr::And(parsed))
    }
}

fn split_conjunctions(input: &str) -> Vec<&str> {
    const SEPARATORS: &[&str] = &[" and ", " AND ", " && "];
    let mut clauses = Vec::new();
    let mut rest = input;
    loop {
        let next = SEPARATORS
            .iter()
            .filter_map(|sep| rest.find(sep).map(|i| (i, sep.len())))
            .min();
        match next {
            Some((idx, sep_len)) => {
                clauses.push(rest[..idx].trim());
                rest = &rest[idx + sep_len..];
            }
            None => {
                clauses.push(rest.trim());
                return clauses;
            }
        }
    }
}

fn parse_clause(clause: &str) -> Option<FilterExpr> {
    if let Some((field, value)) = clause.split_once("==") {
        let field = field.trim();
        let value = parse_value(value.trim())?;
        if field.is_empty() {
            return None;
        }
        return Some(FilterExpr::Eq(field.to_string(), value));
    }

    if let Some(idx) = clause.find(" in ") {
        let field = clause[..idx].trim();
        let list = clause[idx + 4..].trim();
        if field.is_empty() || !list.starts_with('[') || !list.ends_with(']') {
            return None;
        }
        let inner = &list[1..list.len() - 1];
        let mut values = Vec::new();
        for item in inner.split(',') {
            values.push(parse_value(item.trim())?);
        }
        if values.is_empty() {
            return None;
        }
        return Some(FilterExpr::In(field.to_string(), values));
    }

    None
}

fn parse_value(raw: &str) -> Option<FilterValue> {
    if raw.is_empty() {
        return None;
    }
    if (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
        || (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
    {
        return Some(FilterValue::Str(raw[1..raw.len() - 1].to_string()));
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(FilterValue::Int(i));
    }
    Some(FilterValue::Str(raw.to_string()))
}

/// Compile an expression to a SQL fragment plus bound parameters.
pub fn compile(expr: &FilterExpr) -> (String, Vec<SqlValue>) {
    match expr {
        FilterExpr::Eq(field, value) => (
            format!("{} = ?", column_for_field(field)),
            vec![value.to_sql()],
        ),
        FilterExpr::In(field, values) => {
            let placeholders = vec!["?"; values.len()].join(", ");
            (
                format!("{} IN ({})", column_for_field(field), placeholders),
                values.iter().map(FilterValue::to_sql).collect(),
            )
        }
        FilterExpr::And(exprs) => {
            let mut fragments = Vec::with_capacity(exprs.len());
            let mut params = Vec::new();
            for e in exprs {
                let (sql, mut p) = compile(e);
                fragments.push(format!("({})", sql));
                params.append(&mut p);
            }
            (fragments.join(" AND "), params)
        }
        FilterExpr::Raw(text) => (text.clone(), Vec::new()),
    }
}

/// Parse and compile in one step. Blank input compiles to no constraint.
pub fn compile_filter(input: &str) -> Option<(String, Vec<SqlValue>)> {
    parse_filter(input).map(|expr| compile(&expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eq() {
        let expr = parse_filter("fileExtension == 'rs'").unwrap();
        assert_eq!(
            expr,
            FilterExpr::Eq(
                "fileExtension".to_string(),
                FilterValue::Str("rs".to_string())
            )
        );
    }

    #[test]
    fn test_parse_in_list() {
        let expr = parse_filter("fileExtension in ['rs', 'go']").unwrap();
        let (sql, params) = compile(&expr);
        assert_eq!(sql, "file_extension IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_conjunction() {
        let expr = parse_filter("fileExtension == 'rs' and startLine == 10").unwrap();
        let (sql, params) = compile(&expr);
        assert_eq!(sql, "(file_extension = ?) AND (start_line = ?)");
        assert_eq!(params.len(), 2);
        assert_eq!(params[1], SqlValue::Integer(10));
    }

    #[test]
    fn test_alias_mapping() {
        let (sql, _) = compile_filter("relativePath == 'src/main.rs'").unwrap();
        assert!(sql.starts_with("relative_path = "));
    }

    #[test]
    fn test_statement_separator_always_stripped() {
        let (sql, _) = compile_filter("fileExtension == 'rs'; DROP TABLE docs").unwrap();
        assert!(!sql.contains(';'));

        // Opaque clause: passthrough, but still no separator.
        let (sql, params) = compile_filter("custom_op(x); DELETE FROM docs").unwrap();
        assert!(!sql.contains(';'));
        assert!(params.is_empty());
    }

    #[test]
    fn test_values_never_reach_sql_text() {
        let (sql, params) =
            compile_filter("relativePath == \"a' OR '1'='1\"").unwrap();
        assert_eq!(sql, "relative_path = ?");
        assert_eq!(params[0], SqlValue::Text("a' OR '1'='1".to_string()));
    }

    #[test]
    fn test_unknown_syntax_passthrough() {
        let expr = parse_filter("startLine > 5").unwrap();
        assert_eq!(expr, FilterExpr::Raw("startLine > 5".to_string()));
    }

    #[test]
    fn test_blank_input() {
        assert!(parse_filter("").is_none());
        assert!(parse_filter("  ;; ").is_none());
    }

    #[test]
    fn test_unknown_field_reduced_to_identifier() {
        let (sql, _) = compile_filter("weird-field() == 1").unwrap();
        assert_eq!(sql, "weirdfield = ?");
    }
}
