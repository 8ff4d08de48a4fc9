//! Per-object migration settings as edited by the host.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    io_utils,
    polymorphic::{self, PolymorphicAssignment},
    query::{self, QueryError},
};

/// One rename between the source and target schema.
///
/// An entry with only `target_object` renames the object itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_object: String,
}

impl FieldMapping {
    pub fn field(source_field: &str, target_field: &str) -> Self {
        Self {
            source_field: source_field.to_string(),
            target_field: target_field.to_string(),
            target_object: String::new(),
        }
    }

    pub fn object(target_object: &str) -> Self {
        Self {
            target_object: target_object.to_string(),
            ..Self::default()
        }
    }

    pub fn renames_field(&self) -> bool {
        !self.source_field.trim().is_empty() && !self.target_field.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationObjectSpec {
    pub name: String,
    #[serde(default)]
    pub selected_fields: Vec<String>,
    #[serde(default)]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_mapping: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polymorphic_fields: Vec<PolymorphicAssignment>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl MigrationObjectSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.selected_fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    pub fn with_external_id(mut self, external_id: &str) -> Self {
        self.external_id = external_id.to_string();
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        io_utils::read_structured(path)
            .with_context(|| format!("Loading object settings from {path:?}"))
    }

    /// Builds settings from a stored query string. Polymorphic tokens stay
    /// in `selected_fields` and are also recorded as assignments.
    pub fn from_query(text: &str, external_id: &str) -> Result<Self, QueryError> {
        let parsed = query::parse_query(text)?;
        let extracted = polymorphic::extract_all(&parsed.fields);
        Ok(Self {
            name: parsed.object_name,
            selected_fields: parsed.fields,
            external_id: external_id.to_string(),
            polymorphic_fields: extracted.polymorphic_assignments,
            where_clause: parsed.where_clause,
            order_by: parsed.order_by,
            limit: parsed.limit,
            offset: parsed.offset,
            ..Self::default()
        })
    }

    pub fn has_field_mapping(&self) -> bool {
        self.field_mapping
            .iter()
            .any(|mapping| mapping.renames_field() || self.maps_object(mapping))
    }

    fn maps_object(&self, mapping: &FieldMapping) -> bool {
        let target = mapping.target_object.trim();
        !target.is_empty() && target != self.name
    }

    /// Object name on the target side.
    pub fn target_object_name(&self) -> &str {
        self.field_mapping
            .iter()
            .map(|mapping| mapping.target_object.trim())
            .find(|target| !target.is_empty())
            .unwrap_or(self.name.as_str())
    }

    pub fn polymorphic_assignment(&self, field_name: &str) -> Option<&str> {
        self.polymorphic_fields
            .iter()
            .find(|assignment| assignment.name == field_name)
            .map(|assignment| assignment.object_name.as_str())
    }

    pub fn is_excluded(&self, field_name: &str) -> bool {
        self.excluded_fields
            .iter()
            .any(|excluded| excluded.trim() == field_name)
    }

    /// A single-section external id can be queried as-is.
    pub fn has_simple_external_id(&self, separator: &str) -> bool {
        let external_id = self.external_id.trim();
        !external_id.is_empty() && !external_id.contains(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_object_defaults_to_own_name() {
        let mut spec = MigrationObjectSpec::new("Account");
        assert_eq!(spec.target_object_name(), "Account");
        assert!(!spec.has_field_mapping());

        spec.field_mapping.push(FieldMapping::object("Account"));
        assert!(!spec.has_field_mapping());

        spec.field_mapping.push(FieldMapping::field("Rating", "Tier__c"));
        assert!(spec.has_field_mapping());
        assert_eq!(spec.target_object_name(), "Account");
    }

    #[test]
    fn deserializes_camel_case_settings() {
        let yaml = r#"
name: Contact
selectedFields: [Name, "OwnerId$User"]
externalId: Email
where: "LastName != null"
limit: 50
fieldMapping:
  - targetObject: Person__c
  - sourceField: Email
    targetField: Email__c
"#;
        let spec: MigrationObjectSpec = serde_yaml::from_str(yaml).expect("parse spec");
        assert_eq!(spec.where_clause.as_deref(), Some("LastName != null"));
        assert_eq!(spec.limit, Some(50));
        assert_eq!(spec.target_object_name(), "Person__c");
        assert!(spec.field_mapping[1].renames_field());
        assert_eq!(spec.field_mapping[1].target_field, "Email__c");
    }
}
