use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, warn};
use regex::{Captures, NoExpand, Regex};
use thiserror::Error;

use crate::{
    catalog::SchemaCatalog, config::EngineConfig, field_set, object_spec::MigrationObjectSpec,
};

pub const FIELDS_PLACEHOLDER: &str = "{fields}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query text is empty")]
    Empty,
    #[error("query must start with SELECT")]
    MissingSelect,
    #[error("query has no FROM clause")]
    MissingFrom,
    #[error("query selects no fields")]
    NoFields,
    #[error("query names no object after FROM")]
    MissingObject,
    #[error("invalid {clause} value '{value}'")]
    InvalidNumber { clause: &'static str, value: String },
    #[error("unterminated string literal")]
    UnterminatedLiteral,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub fields: Vec<String>,
    pub object_name: String,
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    From,
    Where,
    OrderBy,
    Limit,
    Offset,
}

const CLAUSE_KEYWORDS: &[(&[&str], Clause)] = &[
    (&["SELECT"], Clause::Select),
    (&["FROM"], Clause::From),
    (&["WHERE"], Clause::Where),
    (&["ORDER", "BY"], Clause::OrderBy),
    (&["LIMIT"], Clause::Limit),
    (&["OFFSET"], Clause::Offset),
];

#[derive(Debug, Clone, Copy)]
struct ClauseSpan {
    clause: Clause,
    keyword_start: usize,
    body_start: usize,
}

/// `SELECT {fields} FROM <name>[ WHERE …][ ORDER BY …][ LIMIT n][ OFFSET n]`.
pub fn build_query_template(spec: &MigrationObjectSpec) -> String {
    let mut query = format!("SELECT {FIELDS_PLACEHOLDER} FROM {}", spec.name);
    if let Some(condition) = non_blank(spec.where_clause.as_deref()) {
        query.push_str(&format!(" WHERE {condition}"));
    }
    if let Some(order_by) = non_blank(spec.order_by.as_deref()) {
        query.push_str(&format!(" ORDER BY {order_by}"));
    }
    if let Some(limit) = spec.limit {
        query.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = spec.offset {
        query.push_str(&format!(" OFFSET {offset}"));
    }
    query
}

pub fn render_query<S: AsRef<str>>(template: &str, fields: &[S]) -> String {
    let field_list = fields.iter().map(|field| field.as_ref()).join(", ");
    template.replacen(FIELDS_PLACEHOLDER, &field_list, 1)
}

pub fn count_query(spec: &MigrationObjectSpec) -> String {
    match non_blank(spec.where_clause.as_deref()) {
        Some(condition) => format!("SELECT COUNT() FROM {} WHERE {condition}", spec.name),
        None => format!("SELECT COUNT() FROM {}", spec.name),
    }
}

/// Full query text for `spec` with the computed field list.
pub fn build_query(spec: &MigrationObjectSpec, catalog: &SchemaCatalog, config: &EngineConfig) -> String {
    let fields = field_set::compute_full_query_fields(spec, catalog, config);
    render_query(&build_query_template(spec), &fields)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn parse_query(text: &str) -> Result<ParsedQuery, QueryError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(QueryError::Empty);
    }
    let spans = clause_spans(text)?;
    let select = spans
        .first()
        .filter(|span| span.clause == Clause::Select && span.keyword_start == 0)
        .ok_or(QueryError::MissingSelect)?;
    let from_index = spans
        .iter()
        .position(|span| span.clause == Clause::From)
        .ok_or(QueryError::MissingFrom)?;
    let from = spans[from_index];

    let fields = split_top_level(&text[select.body_start..from.keyword_start])
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if fields.is_empty() {
        return Err(QueryError::NoFields);
    }

    let mut parsed = ParsedQuery {
        fields,
        ..ParsedQuery::default()
    };
    let trailing = &spans[from_index..];
    for (position, span) in trailing.iter().enumerate() {
        let body_end = trailing
            .get(position + 1)
            .map_or(text.len(), |next| next.keyword_start);
        let body = text[span.body_start..body_end].trim();
        match span.clause {
            Clause::From => {
                parsed.object_name = body
                    .split_whitespace()
                    .next()
                    .ok_or(QueryError::MissingObject)?
                    .to_string();
            }
            Clause::Where if parsed.where_clause.is_none() => {
                parsed.where_clause = non_blank(Some(body)).map(str::to_string);
            }
            Clause::OrderBy if parsed.order_by.is_none() => {
                parsed.order_by = non_blank(Some(body)).map(str::to_string);
            }
            Clause::Limit => parsed.limit = Some(parse_count("LIMIT", body)?),
            Clause::Offset => parsed.offset = Some(parse_count("OFFSET", body)?),
            _ => {}
        }
    }
    Ok(parsed)
}

fn parse_count(clause: &'static str, body: &str) -> Result<usize, QueryError> {
    body.parse::<usize>().map_err(|_| QueryError::InvalidNumber {
        clause,
        value: body.to_string(),
    })
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'$' | b'.')
}

/// Locates clause keywords outside string literals and parentheses.
fn clause_spans(text: &str) -> Result<Vec<ClauseSpan>, QueryError> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut in_literal = false;
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if in_literal {
            match byte {
                b'\\' => index += 1,
                b'\'' => in_literal = false,
                _ => {}
            }
            index += 1;
            continue;
        }
        match byte {
            b'\'' => in_literal = true,
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if depth == 0
                && byte.is_ascii_alphabetic()
                && (index == 0 || !is_word_byte(bytes[index - 1])) =>
            {
                if let Some((clause, end)) = match_clause(bytes, index) {
                    spans.push(ClauseSpan {
                        clause,
                        keyword_start: index,
                        body_start: end,
                    });
                    index = end;
                    continue;
                }
            }
            _ => {}
        }
        index += 1;
    }

    if in_literal {
        return Err(QueryError::UnterminatedLiteral);
    }
    Ok(spans)
}

fn match_clause(bytes: &[u8], start: usize) -> Option<(Clause, usize)> {
    CLAUSE_KEYWORDS.iter().find_map(|(words, clause)| {
        let mut position = start;
        for (word_index, word) in words.iter().enumerate() {
            if word_index > 0 {
                let gap_start = position;
                while position < bytes.len() && bytes[position].is_ascii_whitespace() {
                    position += 1;
                }
                if position == gap_start {
                    return None;
                }
            }
            let end = position + word.len();
            if end > bytes.len() || !bytes[position..end].eq_ignore_ascii_case(word.as_bytes()) {
                return None;
            }
            position = end;
        }
        let at_boundary = position == bytes.len() || !is_word_byte(bytes[position]);
        at_boundary.then_some((*clause, position))
    })
}

/// Splits on commas outside parentheses and string literals.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_literal = false;
    let mut start = 0;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if in_literal {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '\'' {
                in_literal = false;
            }
            continue;
        }
        match ch {
            '\'' => in_literal = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

/// Rewrites a source-side query so it runs against the target connection.
///
/// Applied only when `use_target_connection` is set and the object settings map
/// anything. Field names are replaced as whole identifiers in one pass;
/// identifiers right after a `.` belong to a related object and are left
/// alone. Custom relationship names follow their field (`A__c -> B__c` also
/// maps `A__r -> B__r`).
pub fn rewrite_for_field_mapping(
    query: &str,
    spec: &MigrationObjectSpec,
    use_target_connection: bool,
) -> String {
    if !use_target_connection || !spec.has_field_mapping() {
        return query.to_string();
    }
    let renames = field_renames(spec);
    let mut rewritten = substitute_identifiers(query, &renames);
    let target_object = spec.target_object_name();
    if target_object != spec.name {
        rewritten = substitute_from_object(&rewritten, &spec.name, target_object);
    }
    debug!("Rewrote query for target connection: {rewritten}");
    rewritten
}

fn field_renames(spec: &MigrationObjectSpec) -> BTreeMap<String, String> {
    let mut renames = BTreeMap::new();
    for mapping in spec.field_mapping.iter().filter(|m| m.renames_field()) {
        let source = mapping.source_field.trim();
        let target = mapping.target_field.trim();
        renames
            .entry(source.to_string())
            .or_insert_with(|| target.to_string());
        if let (Some(source_base), Some(target_base)) =
            (source.strip_suffix("__c"), target.strip_suffix("__c"))
        {
            renames
                .entry(format!("{source_base}__r"))
                .or_insert_with(|| format!("{target_base}__r"));
        }
    }
    renames
}

fn substitute_identifiers(query: &str, renames: &BTreeMap<String, String>) -> String {
    if renames.is_empty() {
        return query.to_string();
    }
    let alternatives = renames
        .keys()
        .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
        .map(|name| regex::escape(name))
        .join("|");
    let regex = match Regex::new(&format!(r"\b(?:{alternatives})\b")) {
        Ok(regex) => regex,
        Err(err) => {
            warn!("Skipping field-mapping rewrite: {err}");
            return query.to_string();
        }
    };
    regex
        .replace_all(query, |caps: &Captures| {
            let Some(found) = caps.get(0) else {
                return String::new();
            };
            let follows_dot = query[..found.start()].ends_with('.');
            match renames.get(found.as_str()) {
                Some(target) if !follows_dot => target.clone(),
                _ => found.as_str().to_string(),
            }
        })
        .into_owned()
}

fn substitute_from_object(query: &str, source_object: &str, target_object: &str) -> String {
    let pattern = format!(r"(?i)\bFROM\s+{}\b", regex::escape(source_object));
    match Regex::new(&pattern) {
        Ok(regex) => regex
            .replace_all(query, NoExpand(&format!("FROM {target_object}")))
            .into_owned(),
        Err(err) => {
            warn!("Skipping object rewrite: {err}");
            query.to_string()
        }
    }
}
