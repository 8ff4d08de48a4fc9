use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{io_utils, polymorphic::POLYMORPHIC_SEPARATOR};

pub const DEFAULT_COMPLEX_FIELD_SEPARATOR: &str = ";";
pub const DEFAULT_FUZZY_MATCH_THRESHOLD: f32 = 0.6;

const DEFAULT_POLYMORPHIC_IGNORE_LIST: &[&str] = &["ConnectionReceivedId", "ConnectionSentId"];

const DEFAULT_MULTISELECT_DENIED_OBJECTS: &[&str] = &[
    "BusinessHours",
    "BusinessProcess",
    "CallCenter",
    "Organization",
    "Profile",
    "UserLicense",
    "UserRole",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundFieldDef {
    pub object: String,
    pub field: String,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Separates the sections of a composite external id.
    pub complex_field_separator: String,
    /// Name-pointing fields that are never treated as polymorphic.
    pub polymorphic_ignore_list: Vec<String>,
    /// Multi-select keywords never pull in lookups to these objects.
    pub multiselect_denied_objects: Vec<String>,
    /// Minimum similarity (0..=1) for a repaired external-id segment.
    pub fuzzy_match_threshold: f32,
    /// Compound fields in addition to the built-in table.
    pub compound_fields: Vec<CompoundFieldDef>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            complex_field_separator: DEFAULT_COMPLEX_FIELD_SEPARATOR.to_string(),
            polymorphic_ignore_list: to_owned_list(DEFAULT_POLYMORPHIC_IGNORE_LIST),
            multiselect_denied_objects: to_owned_list(DEFAULT_MULTISELECT_DENIED_OBJECTS),
            fuzzy_match_threshold: DEFAULT_FUZZY_MATCH_THRESHOLD,
            compound_fields: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: EngineConfig = io_utils::read_structured(path)
            .with_context(|| format!("Loading engine configuration from {path:?}"))?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn ensure_valid(&self) -> Result<()> {
        let separator = self.complex_field_separator.as_str();
        ensure!(
            !separator.trim().is_empty(),
            "complex_field_separator cannot be empty"
        );
        ensure!(
            !separator.contains('.') && !separator.contains(POLYMORPHIC_SEPARATOR),
            "complex_field_separator '{separator}' collides with the segment or polymorphic separator"
        );
        ensure!(
            self.fuzzy_match_threshold > 0.0 && self.fuzzy_match_threshold <= 1.0,
            "fuzzy_match_threshold must be within (0, 1], got {}",
            self.fuzzy_match_threshold
        );
        for def in &self.compound_fields {
            ensure!(
                !def.components.is_empty(),
                "Compound field {}.{} declares no components",
                def.object,
                def.field
            );
        }
        Ok(())
    }

    pub fn is_denied_for_multiselect(&self, object_name: &str) -> bool {
        self.multiselect_denied_objects
            .iter()
            .any(|name| name == object_name)
    }
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn partial_yaml_keeps_remaining_defaults() {
        let mut file = Builder::new().suffix(".yml").tempfile().expect("temp file");
        writeln!(file, "fuzzy_match_threshold: 0.8").unwrap();
        writeln!(file, "multiselect_denied_objects: [Group]").unwrap();

        let config = EngineConfig::load(file.path()).expect("load config");
        assert_eq!(config.fuzzy_match_threshold, 0.8);
        assert!(config.is_denied_for_multiselect("Group"));
        assert!(!config.is_denied_for_multiselect("Profile"));
        assert_eq!(config.complex_field_separator, ";");
        assert!(
            config
                .polymorphic_ignore_list
                .contains(&"ConnectionSentId".to_string())
        );
    }

    #[test]
    fn rejects_separator_that_collides_with_segments() {
        let config = EngineConfig {
            complex_field_separator: ".".to_string(),
            ..EngineConfig::default()
        };
        let err = config.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = EngineConfig {
            fuzzy_match_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.ensure_valid().is_err());
    }
}
