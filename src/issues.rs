//! Inline issues returned next to partial results instead of failing.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    MissingInSource,
    MissingInTarget,
    MissingInBoth,
    UnresolvedPolymorphicField,
    ExternalIdSegmentNotLookup,
    ExternalIdSegmentMissing,
    /// Repair found several equally good candidates, or the two sides disagree.
    AmbiguousRepair,
    FieldMappingTargetObjectMissing,
    FieldMappingSourceFieldMissing,
    FieldMappingTargetFieldMissing,
    MalformedQuery,
    /// The object exists but has not been described yet.
    NotDescribed,
}

impl IssueKind {
    pub fn code(self) -> &'static str {
        match self {
            IssueKind::MissingInSource => "missing-in-source",
            IssueKind::MissingInTarget => "missing-in-target",
            IssueKind::MissingInBoth => "missing-in-both",
            IssueKind::UnresolvedPolymorphicField => "unresolved-polymorphic-field",
            IssueKind::ExternalIdSegmentNotLookup => "external-id-segment-not-lookup",
            IssueKind::ExternalIdSegmentMissing => "external-id-segment-missing",
            IssueKind::AmbiguousRepair => "ambiguous-repair",
            IssueKind::FieldMappingTargetObjectMissing => "field-mapping-target-object-missing",
            IssueKind::FieldMappingSourceFieldMissing => "field-mapping-source-field-missing",
            IssueKind::FieldMappingTargetFieldMissing => "field-mapping-target-field-missing",
            IssueKind::MalformedQuery => "malformed-query",
            IssueKind::NotDescribed => "not-described",
        }
    }

    /// Transient conditions clear once the missing describe arrives.
    pub fn is_transient(self) -> bool {
        matches!(self, IssueKind::NotDescribed)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{object}{}: {message}", field_suffix(.field))]
pub struct Issue {
    pub kind: IssueKind,
    pub object: String,
    pub field: Option<String>,
    pub message: String,
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|name| format!(".{name}"))
        .unwrap_or_default()
}

impl Issue {
    pub fn new(kind: IssueKind, object: &str, field: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            object: object.to_string(),
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Presence issue for an object (`field == None`) or a field, or `None`
    /// when it was seen on both sides.
    pub fn presence(
        object: &str,
        field: Option<&str>,
        in_source: bool,
        in_target: bool,
    ) -> Option<Self> {
        let subject = match field {
            Some(name) => format!("field {name}"),
            None => "object".to_string(),
        };
        let (kind, where_missing) = match (in_source, in_target) {
            (true, true) => return None,
            (true, false) => (IssueKind::MissingInTarget, "target"),
            (false, true) => (IssueKind::MissingInSource, "source"),
            (false, false) => (IssueKind::MissingInBoth, "source and target"),
        };
        Some(Self::new(
            kind,
            object,
            field,
            format!("{subject} is missing in {where_missing} metadata of {object}"),
        ))
    }

    pub fn object_missing(object: &str) -> Self {
        Self::new(
            IssueKind::MissingInBoth,
            object,
            None,
            format!("object is missing in source and target metadata of {object}"),
        )
    }

    pub fn not_described(object: &str) -> Self {
        Self::new(
            IssueKind::NotDescribed,
            object,
            None,
            format!("{object} has not been described yet"),
        )
    }
}

/// Joins issue messages the way they are shown next to the offending entry.
pub fn join_messages<'a, I>(issues: I) -> String
where
    I: IntoIterator<Item = &'a Issue>,
{
    issues
        .into_iter()
        .map(|issue| issue.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_names_the_missing_side() {
        assert!(Issue::presence("Account", None, true, true).is_none());

        let issue = Issue::presence("Account", Some("Rating"), true, false).expect("issue");
        assert_eq!(issue.kind, IssueKind::MissingInTarget);
        assert_eq!(
            issue.message,
            "field Rating is missing in target metadata of Account"
        );
        assert_eq!(
            issue.to_string(),
            "Account.Rating: field Rating is missing in target metadata of Account"
        );

        let both = Issue::presence("Invoice__c", None, false, false).expect("issue");
        assert_eq!(both.kind, IssueKind::MissingInBoth);
        assert_eq!(both.to_string(), "Invoice__c: object is missing in source and target metadata of Invoice__c");
        assert_eq!(Issue::object_missing("Invoice__c"), both);
    }
}
