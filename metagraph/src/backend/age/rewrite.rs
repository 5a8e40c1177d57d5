// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cypher to Apache AGE SQL rewriting
//!
//! AGE executes Cypher through the `ag_catalog.cypher()` set-returning
//! function, which needs the output columns declared up front. The column
//! list is derived from the query's RETURN clause.

use crate::error::{GraphError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Column declared when no branch of the query has a RETURN clause
pub const DEFAULT_COLUMN: &str = "a";

static SET_OPERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:UNION|EXCEPT)\b").expect("valid set operator pattern"));
static RETURN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bRETURN\b").expect("valid return pattern"));
static RETURN_MODIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ORDER\s+BY|SKIP|LIMIT)\b").expect("valid modifier pattern")
});
static LEADING_DISTINCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DISTINCT\b").expect("valid distinct pattern"));
static ALIAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+as\s+").expect("valid alias pattern"));

/// Per-byte nesting information: `None` inside quoted text, otherwise the
/// bracket depth at that position
fn nesting_mask(text: &str) -> Vec<Option<usize>> {
    let mut mask = vec![None; text.len()];
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for (idx, c) in text.char_indices() {
        let state = match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q != '`' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                None
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    None
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    Some(depth - 1)
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    Some(depth)
                }
                _ => Some(depth),
            },
        };
        for slot in mask.iter_mut().skip(idx).take(c.len_utf8()) {
            *slot = state;
        }
    }
    mask
}

/// Split on set operators that appear outside quoted text
fn split_branches(query: &str) -> Vec<&str> {
    let mask = nesting_mask(query);
    let mut branches = Vec::new();
    let mut start = 0;
    for m in SET_OPERATOR.find_iter(query) {
        if mask[m.start()].is_some() {
            branches.push(&query[start..m.start()]);
            start = m.end();
        }
    }
    branches.push(&query[start..]);
    branches
}

/// Text following the last RETURN keyword outside quoted text
fn return_clause(branch: &str) -> Option<&str> {
    let mask = nesting_mask(branch);
    RETURN_KEYWORD
        .find_iter(branch)
        .filter(|m| mask[m.start()].is_some())
        .last()
        .map(|m| &branch[m.end()..])
}

/// Drop a leading DISTINCT and everything from ORDER BY / SKIP / LIMIT on
fn projection_list(clause: &str) -> &str {
    let clause = match LEADING_DISTINCT.find(clause) {
        Some(m) => &clause[m.end()..],
        None => clause,
    };
    let mask = nesting_mask(clause);
    let end = RETURN_MODIFIER
        .find_iter(clause)
        .find(|m| mask[m.start()] == Some(0))
        .map(|m| m.start())
        .unwrap_or(clause.len());
    clause[..end].trim().trim_end_matches(';')
}

/// Split on commas outside quotes and brackets
fn split_fields(list: &str) -> Vec<&str> {
    let mask = nesting_mask(list);
    let mut fields = Vec::new();
    let mut start = 0;
    for (idx, c) in list.char_indices() {
        if c == ',' && mask[idx] == Some(0) {
            fields.push(&list[start..idx]);
            start = idx + 1;
        }
    }
    fields.push(&list[start..]);
    fields
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

fn is_valid_column(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// PostgreSQL key words that cannot name an output column unquoted
const SQL_RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "intersect", "into", "is",
    "isnull", "join", "lateral", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "not", "notnull", "null", "offset", "on", "only", "or",
    "order", "outer", "overlaps", "placing", "primary", "references", "returning", "right",
    "select", "session_user", "similar", "some", "symmetric", "system_user", "table",
    "tablesample", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "verbose", "when", "where", "window", "with",
];

/// Render a column name for the SQL projection and column definitions
pub fn sql_identifier(column: &str) -> String {
    if SQL_RESERVED.contains(&column) {
        format!("\"{}\"", column)
    } else {
        column.to_string()
    }
}

/// Map arbitrary field text onto an identifier, or `column_<idx>`
fn identifier_of(text: &str, idx: usize) -> String {
    let name: String = text
        .replace('(', "_")
        .replace(')', "")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if is_valid_column(&name) {
        name
    } else {
        format!("column_{}", idx)
    }
}

/// Derive the SQL column name of one returned field
fn column_name(field: &str, idx: usize) -> String {
    let field = field.trim();
    if let Some(m) = ALIAS.find_iter(field).last() {
        let alias = field[m.end()..].trim();
        let alias = alias
            .strip_prefix('`')
            .and_then(|a| a.strip_suffix('`'))
            .unwrap_or(alias);
        return identifier_of(alias, idx);
    }
    if (!field.is_empty() && field.chars().all(|c| c.is_ascii_digit()))
        || matches!(field, "true" | "false" | "null")
    {
        return format!("column_{}", idx);
    }
    identifier_of(field, idx)
}

/// Output columns declared by the query's RETURN clause.
///
/// With UNION/EXCEPT the last branch carrying a RETURN clause decides. When
/// no branch returns anything a single synthetic column is declared.
pub fn return_columns(query: &str) -> Result<Vec<String>> {
    let clause = split_branches(query).into_iter().rev().find_map(return_clause);
    let clause = match clause {
        Some(clause) => clause,
        None => return Ok(vec![DEFAULT_COLUMN.to_string()]),
    };

    let fields: Vec<String> = split_fields(projection_list(clause))
        .into_iter()
        .map(|f| f.to_lowercase().replace('.', "_"))
        .collect();

    if fields.iter().any(|f| f == "*") {
        return Err(GraphError::InvalidQuery(
            "Apache AGE does not support RETURN * in Cypher queries".to_string(),
        ));
    }

    let mut columns: Vec<String> = Vec::with_capacity(fields.len());
    for (idx, field) in fields.iter().enumerate() {
        let name = column_name(field, idx);
        if !columns.contains(&name) {
            columns.push(name);
        }
    }

    if columns.is_empty() {
        columns.push(DEFAULT_COLUMN.to_string());
    }
    Ok(columns)
}

/// Graph names are embedded in SQL and must be plain identifiers
pub fn validate_graph_name(graph_name: &str) -> Result<()> {
    let mut chars = graph_name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(GraphError::InvalidQuery(format!(
            "invalid graph name '{}'",
            graph_name
        )))
    }
}

/// Wrap a Cypher query into the AGE SQL form:
///
/// ```text
/// SELECT <cols> FROM ag_catalog.cypher('<graph>', $$
///     <query>
/// $$) AS (<col> agtype, ...);
/// ```
pub fn wrap_query(query: &str, graph_name: &str) -> Result<String> {
    let query = query.trim().trim_end_matches(';').trim_end();
    if query.is_empty() {
        return Err(GraphError::InvalidQuery("Empty query provided".to_string()));
    }
    if query.contains("$$") {
        return Err(GraphError::InvalidQuery(
            "query text must not contain the '$$' delimiter".to_string(),
        ));
    }
    validate_graph_name(graph_name)?;

    let columns = return_columns(query)?;
    let columns: Vec<String> = columns.iter().map(|c| sql_identifier(c)).collect();
    let fields: Vec<String> = columns.iter().map(|c| format!("{} agtype", c)).collect();

    Ok(format!(
        "SELECT {projection} FROM ag_catalog.cypher('{graph_name}', $$\n    {query}\n$$) AS ({fields});",
        projection = columns.join(", "),
        graph_name = graph_name,
        query = query,
        fields = fields.join(", "),
    ))
}
