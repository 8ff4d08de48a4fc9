mod common;

use std::collections::HashSet;

use common::{field, id_field, sample_catalog};
use sobject_reconcile::{
    catalog::{SchemaCatalog, SchemaSnapshot},
    config::{CompoundFieldDef, EngineConfig},
    describe::ObjectDescriptor,
    field_set::{compute_full_query_fields, compute_special_fields},
    object_spec::MigrationObjectSpec,
    polymorphic::PolymorphicAssignment,
};

fn project_catalog() -> SchemaCatalog {
    let project = ObjectDescriptor::new("Project__c")
        .with_field(field("Project__c", "Name", "string").name_field())
        .with_field(field("Project__c", "Active__c", "boolean"))
        .with_field(field("Project__c", "Billable__c", "boolean"))
        .with_field(field("Project__c", "Approver__c", "reference").with_reference("Profile"));
    let snapshot = SchemaSnapshot::new(vec![project]);
    SchemaCatalog::merge(&snapshot, &snapshot)
}

#[test]
fn all_true_skips_lookups_to_denied_objects() {
    let catalog = project_catalog();
    let spec = MigrationObjectSpec::new("Project__c").with_fields(&["Name", "all_true"]);
    let fields = compute_full_query_fields(&spec, &catalog, &EngineConfig::default());
    assert_eq!(fields, vec!["Active__c", "Billable__c", "Name"]);
}

#[test]
fn keywords_combine_as_a_conjunction() {
    let catalog = sample_catalog();
    let spec = MigrationObjectSpec::new("Contact").with_fields(&["custom_true", "lookup_false"]);
    let fields = compute_full_query_fields(&spec, &catalog, &EngineConfig::default());
    assert_eq!(fields, vec!["Rating__c", "Tier__c"]);
}

#[test]
fn full_field_list_is_deterministic_and_duplicate_free() {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let spec = MigrationObjectSpec::new("Contact")
        .with_fields(&["Email", "readonly_false", "Email", "LastName\\name.Contact", "Name"])
        .with_external_id("Email");

    let first = compute_full_query_fields(&spec, &catalog, &config);
    let second = compute_full_query_fields(&spec, &catalog, &config);
    assert_eq!(first, second);
    let unique: HashSet<&String> = first.iter().collect();
    assert_eq!(unique.len(), first.len());
    assert!(first.contains(&"Name".to_string()));
    assert!(!first.iter().any(|field| field.contains("readonly")));
    assert!(!first.iter().any(|field| field.contains('\\')));
}

#[test]
fn compound_tokens_expand_to_their_components() {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let special = compute_special_fields(&["BillingAddress"], &catalog, "Account", &config);
    assert_eq!(special.len(), 1);
    assert_eq!(special[0].name, "BillingCity");
    assert!(special[0].provenance.in_source());

    let spec = MigrationObjectSpec::new("Account").with_fields(&["Name", "BillingAddress"]);
    let fields = compute_full_query_fields(&spec, &catalog, &config);
    assert_eq!(fields, vec!["BillingCity", "Name"]);
}

#[test]
fn configured_compound_fields_extend_the_table() {
    let config = EngineConfig {
        compound_fields: vec![CompoundFieldDef {
            object: "Invoice__c".to_string(),
            field: "Total__c".to_string(),
            components: vec!["Amount__c".to_string(), "Currency__c".to_string()],
        }],
        ..EngineConfig::default()
    };
    let spec = MigrationObjectSpec::new("Invoice__c").with_fields(&["Total__c", "Name"]);
    let fields = compute_full_query_fields(&spec, &sample_catalog(), &config);
    assert_eq!(fields, vec!["Amount__c", "Name"]);
}

#[test]
fn assigned_polymorphic_fields_are_encoded() {
    let catalog = sample_catalog();
    let mut spec = MigrationObjectSpec::new("Case").with_fields(&["Subject", "OwnerId"]);
    spec.polymorphic_fields = vec![PolymorphicAssignment::new("OwnerId", "Group")];
    let fields = compute_full_query_fields(&spec, &catalog, &EngineConfig::default());
    assert_eq!(fields, vec!["Subject", "OwnerId$Group"]);

    let spec = MigrationObjectSpec::new("Case").with_fields(&["OwnerId$User", "OwnerId"]);
    let fields = compute_full_query_fields(&spec, &catalog, &EngineConfig::default());
    assert_eq!(fields, vec!["OwnerId$User"]);
}

#[test]
fn excluded_fields_are_dropped_except_the_external_id() {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let mut spec = MigrationObjectSpec::new("Contact")
        .with_fields(&["LastName", "Email", "Rating__c"])
        .with_external_id("Email");
    spec.excluded_fields = vec!["Email".to_string(), "Rating__c".to_string()];
    let fields = compute_full_query_fields(&spec, &catalog, &config);
    assert_eq!(fields, vec!["LastName", "Email"]);
}

#[test]
fn only_simple_external_ids_are_appended() {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let spec = MigrationObjectSpec::new("Contact")
        .with_fields(&["LastName"])
        .with_external_id("Email");
    assert_eq!(
        compute_full_query_fields(&spec, &catalog, &config),
        vec!["LastName", "Email"]
    );

    let spec = spec.with_external_id("LastName;Email");
    assert_eq!(
        compute_full_query_fields(&spec, &catalog, &config),
        vec!["LastName"]
    );
}

#[test]
fn dotted_fields_never_come_from_keywords() {
    let account = ObjectDescriptor::new("Account")
        .with_field(id_field("Account"))
        .with_field(field("Account", "Parent.Name", "string"));
    let snapshot = SchemaSnapshot::new(vec![account]);
    let catalog = SchemaCatalog::merge(&snapshot, &snapshot);
    let spec = MigrationObjectSpec::new("Account").with_fields(&["all"]);
    let fields = compute_full_query_fields(&spec, &catalog, &EngineConfig::default());
    assert_eq!(fields, vec!["Id"]);
}
