use std::{collections::BTreeMap, fmt};

use heck::ToTitleCase;
use serde::{Deserialize, Serialize};

/// Which side(s) of a reconciliation an object or field was observed on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Source,
    Target,
    Both,
    #[default]
    Unknown,
    /// A dotted cross-object expression rather than a concrete field.
    Composite,
}

impl Provenance {
    pub fn in_source(self) -> bool {
        matches!(self, Provenance::Source | Provenance::Both)
    }

    pub fn in_target(self) -> bool {
        matches!(self, Provenance::Target | Provenance::Both)
    }

    pub fn visible_on(self, side: Side) -> bool {
        match side {
            Side::Source => self.in_source(),
            Side::Target => self.in_target(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Source => "source",
            Provenance::Target => "target",
            Provenance::Both => "both",
            Provenance::Unknown => "unknown",
            Provenance::Composite => "composite",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of the reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn provenance(self) -> Provenance {
        match self {
            Side::Source => Provenance::Source,
            Side::Target => Provenance::Target,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

/// How a reference field picks the object it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind<'a> {
    None,
    Simple(&'a str),
    Polymorphic(&'a [String]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(default)]
    pub object_name: String,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "FieldDescriptor::default_field_type")]
    pub field_type: String,
    #[serde(default, alias = "createable")]
    pub creatable: bool,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub auto_number: bool,
    #[serde(default, alias = "calculated")]
    pub is_formula: bool,
    #[serde(default)]
    pub cascade_delete: bool,
    #[serde(default)]
    pub name_field: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub name_pointing: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_to: Vec<String>,
    #[serde(default)]
    pub is_multi_select: bool,
    #[serde(default, skip_deserializing)]
    pub provenance: Provenance,
}

pub(crate) static UNKNOWN_FIELD: FieldDescriptor = FieldDescriptor {
    object_name: String::new(),
    name: String::new(),
    label: String::new(),
    field_type: String::new(),
    creatable: false,
    updateable: false,
    custom: false,
    auto_number: false,
    is_formula: false,
    cascade_delete: false,
    name_field: false,
    unique: false,
    name_pointing: false,
    reference_to: Vec::new(),
    is_multi_select: false,
    provenance: Provenance::Unknown,
};

impl FieldDescriptor {
    /// Creates a writable field; `custom` follows the `__c` suffix.
    pub fn new(object_name: &str, name: &str, field_type: &str) -> Self {
        Self {
            object_name: object_name.to_string(),
            name: name.to_string(),
            label: label_from_api_name(name),
            field_type: field_type.to_string(),
            creatable: true,
            updateable: true,
            custom: name.ends_with("__c"),
            auto_number: false,
            is_formula: false,
            cascade_delete: false,
            name_field: false,
            unique: false,
            name_pointing: false,
            reference_to: Vec::new(),
            is_multi_select: false,
            provenance: Provenance::Unknown,
        }
    }

    pub fn with_reference(mut self, object_name: &str) -> Self {
        self.field_type = "reference".to_string();
        self.reference_to.push(object_name.to_string());
        self
    }

    /// Marks the field as a name-pointing reference to any of `targets`.
    pub fn polymorphic(mut self, targets: &[&str]) -> Self {
        self.field_type = "reference".to_string();
        self.name_pointing = true;
        self.reference_to = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.creatable = false;
        self.updateable = false;
        self
    }

    pub fn formula(mut self) -> Self {
        self.is_formula = true;
        self.creatable = false;
        self.updateable = false;
        self
    }

    pub fn auto_number(mut self) -> Self {
        self.auto_number = true;
        self.creatable = false;
        self.updateable = false;
        self
    }

    pub fn name_field(mut self) -> Self {
        self.name_field = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn cascade_delete(mut self) -> Self {
        self.cascade_delete = true;
        self
    }

    pub fn multi_select(mut self) -> Self {
        self.is_multi_select = true;
        self
    }

    fn default_field_type() -> String {
        "string".to_string()
    }

    /// True for the sentinel returned by failed lookups.
    pub fn is_unknown(&self) -> bool {
        self.provenance == Provenance::Unknown && self.name.is_empty()
    }

    pub fn is_master_detail(&self) -> bool {
        self.name_pointing && (!self.updateable || self.cascade_delete)
    }

    pub fn readonly(&self) -> bool {
        !(self.creatable && !self.is_formula && !self.auto_number)
    }

    pub fn is_reference(&self) -> bool {
        self.name_pointing || !self.reference_to.is_empty()
    }

    pub fn is_polymorphic(&self, ignore_list: &[String]) -> bool {
        self.name_pointing
            && !self.reference_to.is_empty()
            && !ignore_list.iter().any(|ignored| ignored == &self.name)
    }

    pub fn can_be_external_id(&self) -> bool {
        self.is_formula
            || self.name_field
            || self.name == "Id"
            || (!self.readonly() && !self.name_pointing)
    }

    pub fn is_compound_type(&self) -> bool {
        matches!(self.field_type.as_str(), "address" | "location")
    }

    pub fn reference_kind(&self, ignore_list: &[String]) -> ReferenceKind<'_> {
        if self.is_polymorphic(ignore_list) {
            ReferenceKind::Polymorphic(&self.reference_to)
        } else if let Some(first) = self.reference_to.first() {
            ReferenceKind::Simple(first)
        } else {
            ReferenceKind::None
        }
    }

    /// Name used when the field is traversed as a relationship
    /// (`Account__c` -> `Account__r`, `OwnerId` -> `Owner`).
    pub fn relationship_name(&self) -> String {
        relationship_name(&self.name)
    }
}

pub fn relationship_name(field_name: &str) -> String {
    if let Some(base) = field_name.strip_suffix("__c") {
        format!("{base}__r")
    } else if let Some(base) = field_name
        .strip_suffix("Id")
        .filter(|base| !base.is_empty())
    {
        base.to_string()
    } else {
        field_name.to_string()
    }
}

/// Builds a readable label from an API name: `Billing_Code__c` -> `Billing Code`.
pub fn label_from_api_name(name: &str) -> String {
    let base = name
        .strip_suffix("__c")
        .or_else(|| name.strip_suffix("__r"))
        .unwrap_or(name);
    base.to_title_case()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, alias = "createable")]
    pub creatable: bool,
    #[serde(default)]
    pub updateable: bool,
    #[serde(default)]
    pub deleteable: bool,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub key_prefix: String,
    #[serde(default, with = "field_list")]
    pub fields: BTreeMap<String, FieldDescriptor>,
    #[serde(default, skip_deserializing)]
    pub provenance: Provenance,
    /// Sides that returned the object without any fields.
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub undescribed_on: Vec<Side>,
}

pub(crate) static UNKNOWN_OBJECT: ObjectDescriptor = ObjectDescriptor {
    name: String::new(),
    label: String::new(),
    creatable: false,
    updateable: false,
    deleteable: false,
    custom: false,
    key_prefix: String::new(),
    fields: BTreeMap::new(),
    provenance: Provenance::Unknown,
    undescribed_on: Vec::new(),
};

impl ObjectDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label_from_api_name(name),
            creatable: true,
            updateable: true,
            deleteable: true,
            custom: name.ends_with("__c"),
            key_prefix: String::new(),
            fields: BTreeMap::new(),
            provenance: Provenance::Unknown,
            undescribed_on: Vec::new(),
        }
    }

    /// Adds a field, re-parenting it to this object.
    pub fn with_field(mut self, mut field: FieldDescriptor) -> Self {
        field.object_name = self.name.clone();
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn is_described(&self) -> bool {
        !self.fields.is_empty() && self.undescribed_on.is_empty()
    }

    /// True when the object exists on `side` and its describe came back there.
    pub fn is_described_on(&self, side: Side) -> bool {
        self.provenance.visible_on(side) && !self.is_pending_on(side)
    }

    pub fn is_pending_on(&self, side: Side) -> bool {
        self.undescribed_on.contains(&side)
    }

    pub fn is_unknown(&self) -> bool {
        self.provenance == Provenance::Unknown && self.name.is_empty()
    }

    /// Returns the named field or the `unknown` sentinel.
    pub fn field(&self, name: &str) -> &FieldDescriptor {
        self.fields.get(name).unwrap_or(&UNKNOWN_FIELD)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fills values a raw describe payload may omit.
    pub(crate) fn normalize(&mut self) {
        if self.label.trim().is_empty() {
            self.label = label_from_api_name(&self.name);
        }
        for field in self.fields.values_mut() {
            field.object_name = self.name.clone();
            if field.label.trim().is_empty() {
                field.label = label_from_api_name(&field.name);
            }
        }
    }
}

/// Describe payloads carry fields as a list; descriptors index them by name.
mod field_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::FieldDescriptor;

    pub fn serialize<S>(
        fields: &BTreeMap<String, FieldDescriptor>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(fields.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, FieldDescriptor>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list = Vec::<FieldDescriptor>::deserialize(deserializer)?;
        let mut fields = BTreeMap::new();
        for field in list {
            fields.entry(field.name.clone()).or_insert(field);
        }
        Ok(fields)
    }
}
