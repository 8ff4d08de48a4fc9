//! `$` codec for polymorphic field tokens (`WhatId$Account`). The format is
//! persisted and must stay bit-exact.

use serde::{Deserialize, Serialize};

pub const POLYMORPHIC_SEPARATOR: char = '$';
pub const DISPLAY_SUFFIX_SEPARATOR: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolymorphicAssignment {
    pub name: String,
    pub object_name: String,
}

impl PolymorphicAssignment {
    pub fn new(name: &str, object_name: &str) -> Self {
        Self {
            name: name.to_string(),
            object_name: object_name.to_string(),
        }
    }

    pub fn token(&self) -> String {
        encode(&self.name, &self.object_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedField<'a> {
    pub field_name: &'a str,
    pub object_name: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub plain_fields: Vec<String>,
    pub polymorphic_assignments: Vec<PolymorphicAssignment>,
}

pub fn encode(field_name: &str, object_name: &str) -> String {
    format!("{field_name}{POLYMORPHIC_SEPARATOR}{object_name}")
}

/// Splits a token on its first `$`.
pub fn decode(token: &str) -> DecodedField<'_> {
    match token.split_once(POLYMORPHIC_SEPARATOR) {
        Some((field_name, object_name)) => DecodedField {
            field_name,
            object_name: Some(object_name),
        },
        None => DecodedField {
            field_name: token,
            object_name: None,
        },
    }
}

pub fn extract_all<S>(fields: &[S]) -> ExtractedFields
where
    S: AsRef<str>,
{
    let mut extracted = ExtractedFields::default();
    for token in fields {
        let decoded = decode(token.as_ref());
        extracted.plain_fields.push(decoded.field_name.to_string());
        if let Some(object_name) = decoded.object_name {
            extracted
                .polymorphic_assignments
                .push(PolymorphicAssignment::new(decoded.field_name, object_name));
        }
    }
    extracted
}

/// Drops the `\name.Object` display suffix from a field token.
pub fn clean_name(field: &str) -> &str {
    match field.split_once(DISPLAY_SUFFIX_SEPARATOR) {
        Some((name, _)) => name.trim(),
        None => field.trim(),
    }
}
