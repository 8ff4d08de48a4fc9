use std::collections::HashSet;

use log::debug;

use crate::{
    catalog::SchemaCatalog,
    config::EngineConfig,
    describe::{FieldDescriptor, Provenance},
    object_spec::MigrationObjectSpec,
    polymorphic::{self, clean_name},
};

pub const MULTISELECT_ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAttribute {
    All,
    Readonly,
    Custom,
    Standard,
    Updateable,
    Createable,
    Lookup,
    AutoNumber,
    Formula,
    Unique,
    NameField,
    MultiSelect,
    Polymorphic,
}

impl FieldAttribute {
    fn parse(value: &str) -> Option<Self> {
        let attribute = match value {
            "all" => FieldAttribute::All,
            "readonly" => FieldAttribute::Readonly,
            "custom" => FieldAttribute::Custom,
            "standard" => FieldAttribute::Standard,
            "updateable" => FieldAttribute::Updateable,
            "createable" => FieldAttribute::Createable,
            "lookup" => FieldAttribute::Lookup,
            "autonumber" => FieldAttribute::AutoNumber,
            "formula" => FieldAttribute::Formula,
            "unique" => FieldAttribute::Unique,
            "namefield" => FieldAttribute::NameField,
            "multiselect" => FieldAttribute::MultiSelect,
            "polymorphic" => FieldAttribute::Polymorphic,
            _ => return None,
        };
        Some(attribute)
    }

    fn value_of(self, field: &FieldDescriptor, config: &EngineConfig) -> bool {
        match self {
            FieldAttribute::All => true,
            FieldAttribute::Readonly => field.readonly(),
            FieldAttribute::Custom => field.custom,
            FieldAttribute::Standard => !field.custom,
            FieldAttribute::Updateable => field.updateable,
            FieldAttribute::Createable => field.creatable,
            FieldAttribute::Lookup => field.is_reference(),
            FieldAttribute::AutoNumber => field.auto_number,
            FieldAttribute::Formula => field.is_formula,
            FieldAttribute::Unique => field.unique,
            FieldAttribute::NameField => field.name_field,
            FieldAttribute::MultiSelect => field.is_multi_select,
            FieldAttribute::Polymorphic => field.is_polymorphic(&config.polymorphic_ignore_list),
        }
    }
}

/// Parses `all` or `<attribute>_true` / `<attribute>_false`.
pub fn parse_multiselect_keyword(token: &str) -> Option<(FieldAttribute, bool)> {
    let lowered = token.trim().to_ascii_lowercase();
    if lowered == MULTISELECT_ALL {
        return Some((FieldAttribute::All, true));
    }
    let (attribute, expected) = lowered
        .strip_suffix("_true")
        .map(|attribute| (attribute, true))
        .or_else(|| lowered.strip_suffix("_false").map(|attribute| (attribute, false)))?;
    FieldAttribute::parse(attribute).map(|attribute| (attribute, expected))
}

pub fn is_multiselect_keyword(token: &str) -> bool {
    parse_multiselect_keyword(token).is_some()
}

/// Conjunction of every multi-select keyword present in a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSelectPredicate {
    terms: Vec<(FieldAttribute, bool)>,
}

impl MultiSelectPredicate {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Option<Self> {
        let terms: Vec<_> = tokens
            .iter()
            .filter_map(|token| parse_multiselect_keyword(token.as_ref()))
            .collect();
        (!terms.is_empty()).then_some(Self { terms })
    }

    pub fn matches(&self, field: &FieldDescriptor, config: &EngineConfig) -> bool {
        self.terms
            .iter()
            .all(|(attribute, expected)| attribute.value_of(field, config) == *expected)
    }
}

struct CompoundField {
    object: &'static str,
    field: &'static str,
    components: &'static [&'static str],
}

macro_rules! address {
    ($object:literal, $field:literal, $prefix:literal) => {
        CompoundField {
            object: $object,
            field: $field,
            components: &[
                concat!($prefix, "Street"),
                concat!($prefix, "City"),
                concat!($prefix, "State"),
                concat!($prefix, "PostalCode"),
                concat!($prefix, "Country"),
                concat!($prefix, "Latitude"),
                concat!($prefix, "Longitude"),
                concat!($prefix, "GeocodeAccuracy"),
            ],
        }
    };
}

static COMPOUND_FIELDS: &[CompoundField] = &[
    address!("Account", "BillingAddress", "Billing"),
    address!("Account", "ShippingAddress", "Shipping"),
    address!("Contact", "MailingAddress", "Mailing"),
    address!("Contact", "OtherAddress", "Other"),
    address!("Contract", "BillingAddress", "Billing"),
    address!("Contract", "ShippingAddress", "Shipping"),
    address!("Lead", "Address", ""),
    address!("Order", "BillingAddress", "Billing"),
    address!("Order", "ShippingAddress", "Shipping"),
    address!("User", "Address", ""),
];

/// Constituent field names of a compound token, built-in table first.
pub fn compound_components(
    object_name: &str,
    token: &str,
    config: &EngineConfig,
) -> Option<Vec<String>> {
    if let Some(compound) = COMPOUND_FIELDS
        .iter()
        .find(|compound| compound.object == object_name && compound.field == token)
    {
        return Some(compound.components.iter().map(|c| c.to_string()).collect());
    }
    config
        .compound_fields
        .iter()
        .find(|def| def.object == object_name && def.field == token)
        .map(|def| def.components.clone())
}

pub fn is_compound_field(object_name: &str, token: &str, config: &EngineConfig) -> bool {
    compound_components(object_name, token, config).is_some()
}

/// Fields contributed by multi-select keywords and compound tokens.
pub fn compute_special_fields<S: AsRef<str>>(
    selected_fields: &[S],
    catalog: &SchemaCatalog,
    object_name: &str,
    config: &EngineConfig,
) -> Vec<FieldDescriptor> {
    let object = catalog.lookup(object_name);
    let mut special = Vec::new();

    if let Some(predicate) = MultiSelectPredicate::from_tokens(selected_fields) {
        special.extend(
            object
                .fields
                .values()
                .filter(|field| field.provenance != Provenance::Composite)
                .filter(|field| !field.is_compound_type())
                .filter(|field| !references_denied_object(field, config))
                .filter(|field| predicate.matches(field, config))
                .cloned(),
        );
    }

    for token in selected_fields {
        let token = clean_name(token.as_ref());
        let Some(components) = compound_components(object_name, token, config) else {
            continue;
        };
        special.extend(
            components
                .iter()
                .map(|component| object.field(component))
                .filter(|field| !field.is_unknown())
                .cloned(),
        );
    }

    debug!(
        "Expanded {} special field(s) for {}",
        special.len(),
        object_name
    );
    special
}

fn references_denied_object(field: &FieldDescriptor, config: &EngineConfig) -> bool {
    field.is_reference()
        && field
            .reference_to
            .iter()
            .any(|target| config.is_denied_for_multiselect(target))
}

/// Final, duplicate-free field list: expanded fields, then the explicit
/// selection, then a simple external id. The first occurrence of a field
/// name wins; assigned polymorphic fields are emitted `$`-encoded.
pub fn compute_full_query_fields(
    spec: &MigrationObjectSpec,
    catalog: &SchemaCatalog,
    config: &EngineConfig,
) -> Vec<String> {
    let special = compute_special_fields(&spec.selected_fields, catalog, &spec.name, config);
    let separator = config.complex_field_separator.as_str();
    let external_id = spec
        .has_simple_external_id(separator)
        .then(|| spec.external_id.trim());

    let selected = spec
        .selected_fields
        .iter()
        .map(|token| clean_name(token))
        .filter(|token| !token.is_empty())
        .filter(|token| !is_multiselect_keyword(token))
        .filter(|token| !is_compound_field(&spec.name, token, config));

    let candidates = special
        .iter()
        .map(|field| field.name.as_str())
        .chain(selected)
        .chain(external_id);

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for token in candidates {
        let decoded = polymorphic::decode(token);
        let name = decoded.field_name;
        if spec.is_excluded(name) && Some(token) != external_id {
            continue;
        }
        if !seen.insert(name.to_string()) {
            continue;
        }
        let rendered = match (decoded.object_name, spec.polymorphic_assignment(name)) {
            (None, Some(object_name)) => polymorphic::encode(name, object_name),
            _ => token.to_string(),
        };
        fields.push(rendered);
    }
    fields
}
