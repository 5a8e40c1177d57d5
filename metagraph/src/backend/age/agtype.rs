// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Parser for the textual `agtype` output format
//!
//! AGE renders values as JSON extended with type annotations:
//! `{"id": 844424930131969, "label": "DataEntity", "properties": {...}}::vertex`,
//! `[...]::path`, `3.5::numeric`, plus the `NaN` and `Infinity` floats.

use crate::backend::raw::{Properties, RawEdge, RawPath, RawValue, RawVertex};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, value},
    error::{Error as NomError, ErrorKind},
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::{delimited, preceded, separated_pair},
    Err as NomErr, IResult,
};

/// A parsed agtype value before graph-record recognition
#[derive(Debug, Clone, PartialEq)]
pub enum Agtype {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Agtype>),
    Object(Vec<(String, Agtype)>),
    Vertex(Vec<(String, Agtype)>),
    Edge(Vec<(String, Agtype)>),
    Path(Vec<Agtype>),
}

fn parse_string(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('"')(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.char_indices();
        let (_, c) = chars
            .next()
            .ok_or_else(|| NomErr::Error(NomError::new(rest, ErrorKind::Char)))?;
        match c {
            '"' => return Ok((&rest[1..], out)),
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or_else(|| NomErr::Error(NomError::new(rest, ErrorKind::Escaped)))?;
                let consumed = match escaped {
                    '"' => {
                        out.push('"');
                        2
                    }
                    '\\' => {
                        out.push('\\');
                        2
                    }
                    '/' => {
                        out.push('/');
                        2
                    }
                    'b' => {
                        out.push('\u{8}');
                        2
                    }
                    'f' => {
                        out.push('\u{c}');
                        2
                    }
                    'n' => {
                        out.push('\n');
                        2
                    }
                    'r' => {
                        out.push('\r');
                        2
                    }
                    't' => {
                        out.push('\t');
                        2
                    }
                    'u' => {
                        let (decoded, used) = parse_unicode_escape(&rest[2..])
                            .ok_or_else(|| NomErr::Error(NomError::new(rest, ErrorKind::Escaped)))?;
                        out.push(decoded);
                        2 + used
                    }
                    _ => return Err(NomErr::Error(NomError::new(rest, ErrorKind::Escaped))),
                };
                rest = &rest[consumed..];
            }
            other => {
                out.push(other);
                rest = &rest[other.len_utf8()..];
            }
        }
    }
}

/// Decode the hex digits after `\u`, joining surrogate pairs. Returns the
/// character and the number of bytes consumed after the `\u`.
fn parse_unicode_escape(input: &str) -> Option<(char, usize)> {
    let high = u32::from_str_radix(input.get(..4)?, 16).ok()?;
    if (0xD800..0xDC00).contains(&high) {
        let low_text = input.get(4..10)?.strip_prefix("\\u")?;
        let low = u32::from_str_radix(low_text, 16).ok()?;
        if !(0xDC00..0xE000).contains(&low) {
            return None;
        }
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        return char::from_u32(combined).map(|c| (c, 10));
    }
    char::from_u32(high).map(|c| (c, 4))
}

fn parse_number(input: &str) -> IResult<&str, Agtype> {
    let (rest, text) = recognize_float(input)?;
    let parsed = if text.contains(&['.', 'e', 'E'][..]) {
        text.parse::<f64>().ok().map(Agtype::Float)
    } else {
        text.parse::<i64>()
            .ok()
            .map(Agtype::Integer)
            .or_else(|| text.parse::<f64>().ok().map(Agtype::Float))
    };
    match parsed {
        Some(number) => Ok((rest, number)),
        None => Err(NomErr::Error(NomError::new(input, ErrorKind::Float))),
    }
}

fn parse_array(input: &str) -> IResult<&str, Agtype> {
    map(
        delimited(
            char('['),
            separated_list0(char(','), parse_value),
            preceded(multispace0, char(']')),
        ),
        Agtype::Array,
    )(input)
}

fn parse_member(input: &str) -> IResult<&str, (String, Agtype)> {
    separated_pair(
        delimited(multispace0, parse_string, multispace0),
        char(':'),
        parse_value,
    )(input)
}

fn parse_object(input: &str) -> IResult<&str, Agtype> {
    map(
        delimited(
            char('{'),
            separated_list0(char(','), parse_member),
            preceded(multispace0, char('}')),
        ),
        Agtype::Object,
    )(input)
}

fn parse_base(input: &str) -> IResult<&str, Agtype> {
    alt((
        map(parse_string, Agtype::String),
        parse_array,
        parse_object,
        value(Agtype::Null, tag("null")),
        value(Agtype::Bool(true), tag("true")),
        value(Agtype::Bool(false), tag("false")),
        value(Agtype::Float(f64::NAN), tag("NaN")),
        value(Agtype::Float(f64::INFINITY), tag("Infinity")),
        value(Agtype::Float(f64::NEG_INFINITY), tag("-Infinity")),
        parse_number,
    ))(input)
}

fn annotate(base: Agtype, annotation: Option<&str>) -> Agtype {
    match (annotation, base) {
        (Some("vertex"), Agtype::Object(members)) => Agtype::Vertex(members),
        (Some("edge"), Agtype::Object(members)) => Agtype::Edge(members),
        (Some("path"), Agtype::Array(items)) => Agtype::Path(items),
        (Some("numeric"), Agtype::Integer(i)) => Agtype::Float(i as f64),
        (_, base) => base,
    }
}

fn parse_value(input: &str) -> IResult<&str, Agtype> {
    let (input, base) = preceded(multispace0, parse_base)(input)?;
    let (input, annotation) = opt(preceded(
        tag("::"),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, annotate(base, annotation)))
}

/// Parse one complete agtype text
pub fn parse_agtype(text: &str) -> Result<Agtype, String> {
    all_consuming(parse_value)(text)
        .map(|(_, parsed)| parsed)
        .map_err(|e| match e {
            NomErr::Error(err) | NomErr::Failure(err) => {
                let near: String = err.input.chars().take(32).collect();
                format!("unreadable agtype near '{}'", near)
            }
            NomErr::Incomplete(_) => "incomplete agtype value".to_string(),
        })
}

fn identity_of(value: &Agtype) -> Option<String> {
    match value {
        Agtype::Integer(i) => Some(i.to_string()),
        Agtype::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn member<'a>(members: &'a [(String, Agtype)], key: &str) -> Option<&'a Agtype> {
    members.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn properties_of(members: &[(String, Agtype)]) -> Properties {
    match member(members, "properties") {
        Some(Agtype::Object(props)) => props
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into_raw()))
            .collect(),
        _ => Properties::new(),
    }
}

fn label_of(members: &[(String, Agtype)]) -> Option<String> {
    match member(members, "label") {
        Some(Agtype::String(label)) => Some(label.clone()),
        _ => None,
    }
}

fn object_to_map(members: Vec<(String, Agtype)>) -> RawValue {
    RawValue::Map(members.into_iter().map(|(k, v)| (k, v.into_raw())).collect())
}

impl Agtype {
    /// Convert into a backend-neutral raw value. Annotated objects missing
    /// their identity or label degrade to plain maps.
    pub fn into_raw(self) -> RawValue {
        match self {
            Agtype::Null => RawValue::Null,
            Agtype::Bool(b) => RawValue::Bool(b),
            Agtype::Integer(i) => RawValue::Int(i),
            Agtype::Float(f) => RawValue::Float(f),
            Agtype::String(s) => RawValue::String(s),
            Agtype::Array(items) => RawValue::List(items.into_iter().map(Agtype::into_raw).collect()),
            Agtype::Object(members) => object_to_map(members),
            Agtype::Vertex(members) => {
                let id = member(&members, "id").and_then(identity_of);
                match (id, label_of(&members)) {
                    (Some(id), Some(label)) => RawValue::Vertex(RawVertex {
                        id,
                        label,
                        properties: properties_of(&members),
                    }),
                    _ => object_to_map(members),
                }
            }
            Agtype::Edge(members) => {
                let id = member(&members, "id").and_then(identity_of);
                let from_id = member(&members, "start_id").and_then(identity_of);
                let to_id = member(&members, "end_id").and_then(identity_of);
                match (id, label_of(&members), from_id, to_id) {
                    (Some(id), Some(label), Some(from_id), Some(to_id)) => RawValue::Edge(RawEdge {
                        id,
                        label,
                        from_id,
                        to_id,
                        properties: properties_of(&members),
                    }),
                    _ => object_to_map(members),
                }
            }
            Agtype::Path(items) => {
                let mut path = RawPath::default();
                for item in items {
                    match item.into_raw() {
                        RawValue::Vertex(v) => path.nodes.push(v),
                        RawValue::Edge(e) => path.rels.push(e),
                        _ => {}
                    }
                }
                RawValue::Path(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_annotated_vertex() {
        let text = r#"{"id": 844424930131969, "label": "DataEntity", "properties": {"name": "银行", "code": "E01"}}::vertex"#;
        let raw = parse_agtype(text).unwrap().into_raw();

        match raw {
            RawValue::Vertex(v) => {
                assert_eq!(v.id, "844424930131969");
                assert_eq!(v.label, "DataEntity");
                assert_eq!(v.properties.get("name"), Some(&RawValue::String("银行".to_string())));
            }
            other => panic!("expected vertex, got {:?}", other),
        }
    }

    #[test]
    fn parses_annotated_edge() {
        let text = r#"{"id": 1125899906842625, "label": "RELATED_TO", "end_id": 844424930131970, "start_id": 844424930131969, "properties": {"rel": "owns"}}::edge"#;
        let raw = parse_agtype(text).unwrap().into_raw();

        match raw {
            RawValue::Edge(e) => {
                assert_eq!(e.from_id, "844424930131969");
                assert_eq!(e.to_id, "844424930131970");
                assert_eq!(e.properties.get("rel"), Some(&RawValue::String("owns".to_string())));
            }
            other => panic!("expected edge, got {:?}", other),
        }
    }

    #[test]
    fn parses_path_in_order() {
        let text = concat!(
            r#"[{"id": 1, "label": "DataEntity", "properties": {}}::vertex, "#,
            r#"{"id": 10, "label": "FLOWS_TO", "end_id": 2, "start_id": 1, "properties": {}}::edge, "#,
            r#"{"id": 2, "label": "DataEntity", "properties": {}}::vertex]::path"#
        );
        match parse_agtype(text).unwrap().into_raw() {
            RawValue::Path(path) => {
                assert_eq!(path.nodes.len(), 2);
                assert_eq!(path.rels.len(), 1);
                assert_eq!(path.rels[0].id, "10");
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_agtype("42").unwrap(), Agtype::Integer(42));
        assert_eq!(parse_agtype("-1.5").unwrap(), Agtype::Float(-1.5));
        assert_eq!(parse_agtype("2.50::numeric").unwrap(), Agtype::Float(2.5));
        assert_eq!(parse_agtype("true").unwrap(), Agtype::Bool(true));
        assert_eq!(parse_agtype("null").unwrap(), Agtype::Null);
        assert_eq!(parse_agtype("-Infinity").unwrap(), Agtype::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(
            parse_agtype(r#""a\"b\né😀""#).unwrap(),
            Agtype::String("a\"b\né😀".to_string())
        );
    }

    #[test]
    fn plain_object_becomes_map() {
        let raw = parse_agtype(r#"{"name": "ods", "size": 3}"#).unwrap().into_raw();
        assert!(matches!(raw, RawValue::Map(ref m) if m.len() == 2));
    }

    #[test]
    fn empty_containers_parse() {
        assert_eq!(parse_agtype("[ ]").unwrap(), Agtype::Array(vec![]));
        assert_eq!(parse_agtype("{}").unwrap(), Agtype::Object(vec![]));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse_agtype("{\"a\": 1} x").is_err());
        assert!(parse_agtype("\"unterminated").is_err());
    }
}
