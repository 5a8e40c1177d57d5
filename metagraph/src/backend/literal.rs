// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cypher literal rendering and inline parameter binding

use super::QueryParams;
use crate::error::{GraphError, Result};
use serde_json::Value as JsonValue;

/// Render a string as a single-quoted Cypher literal
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn map_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}

/// Render a JSON value as a Cypher literal expression
pub fn json_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => string_literal(s),
        JsonValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(json_literal).collect();
            format!("[{}]", rendered.join(", "))
        }
        JsonValue::Object(obj) => {
            let rendered: Vec<String> = obj
                .iter()
                .map(|(k, v)| format!("{}: {}", map_key(k), json_literal(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

/// Replace `$name` placeholders outside quoted text with inline literals.
///
/// Placeholders that are not followed by an identifier (for example the
/// `$$` dollar quote) are copied through unchanged.
pub fn bind_parameters(query: &str, params: &QueryParams) -> Result<String> {
    let mut out = String::with_capacity(query.len());
    let mut quote: Option<char> = None;
    let mut chars = query.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '$' if matches!(chars.peek(), Some((_, '$'))) => {
                chars.next();
                out.push_str("$$");
            }
            '$' => {
                let starts_identifier = matches!(
                    chars.peek(),
                    Some((_, next)) if next.is_ascii_alphabetic() || *next == '_'
                );
                if !starts_identifier {
                    out.push(c);
                    continue;
                }
                let start = idx + 1;
                let mut end = start;
                while let Some((pos, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        end = pos + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &query[start..end];
                let value = params.get(name).ok_or_else(|| {
                    GraphError::InvalidQuery(format!("no value bound for parameter ${}", name))
                })?;
                out.push_str(&json_literal(value));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_literal_escapes_quotes_and_backslashes() {
        assert_eq!(string_literal("ods.t_bank"), "'ods.t_bank'");
        assert_eq!(string_literal("o'brien"), "'o\\'brien'");
        assert_eq!(string_literal("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn json_literal_renders_nested_values() {
        let value = json!({"name": "银行", "tags": [1, true, null], "odd key": 1.5});
        let rendered = json_literal(&value);

        assert!(rendered.contains("name: '银行'"));
        assert!(rendered.contains("tags: [1, true, null]"));
        assert!(rendered.contains("`odd key`: 1.5"));
    }

    #[test]
    fn binds_placeholders_outside_strings() {
        let mut params = QueryParams::new();
        params.insert("name".to_string(), json!("资金账户"));
        params.insert("limit".to_string(), json!(5));

        let bound = bind_parameters(
            "MATCH (e:DataEntity {name: $name}) WHERE e.note <> '$name' RETURN e LIMIT $limit",
            &params,
        )
        .unwrap();

        assert_eq!(
            bound,
            "MATCH (e:DataEntity {name: '资金账户'}) WHERE e.note <> '$name' RETURN e LIMIT 5"
        );
    }

    #[test]
    fn unbound_placeholder_is_rejected() {
        let err = bind_parameters("MATCH (e) WHERE e.name = $missing RETURN e", &QueryParams::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidQuery(_)));
    }

    #[test]
    fn dollar_quotes_are_left_alone() {
        let bound = bind_parameters("RETURN $$x$$", &QueryParams::new()).unwrap();
        assert_eq!(bound, "RETURN $$x$$");
    }
}
