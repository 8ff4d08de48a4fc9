use log::debug;

use crate::{
    catalog::SchemaCatalog,
    config::EngineConfig,
    describe::Side,
    external_id::{self, ResolveMode},
    field_set::{is_compound_field, is_multiselect_keyword},
    issues::{Issue, IssueKind},
    object_spec::MigrationObjectSpec,
    polymorphic::{self, clean_name},
    query::{self, ParsedQuery},
};

pub fn validate_object_spec(
    spec: &MigrationObjectSpec,
    catalog: &SchemaCatalog,
    config: &EngineConfig,
) -> Vec<Issue> {
    let object = catalog.lookup(&spec.name);
    let mut issues = Vec::new();

    if object.is_unknown() {
        issues.push(Issue::object_missing(&spec.name));
        return issues;
    }
    let in_source = object.provenance.in_source();
    let in_target = object.provenance.in_target();
    issues.extend(Issue::presence(&spec.name, None, in_source, in_target));

    if !object.is_described() {
        issues.push(Issue::not_described(&spec.name));
    }
    if object.is_described_on(Side::Source) || object.is_described_on(Side::Target) {
        check_selected_fields(spec, catalog, config, &mut issues);
    }

    if !spec.external_id.trim().is_empty() {
        let resolved = external_id::resolve(
            &spec.external_id,
            catalog,
            &spec.name,
            ResolveMode::Validate,
            config,
        );
        issues.extend(resolved.errors().cloned());
    }

    check_field_mapping(spec, catalog, &mut issues);

    debug!("Validated {}: {} issue(s)", spec.name, issues.len());
    issues
}

fn check_selected_fields(
    spec: &MigrationObjectSpec,
    catalog: &SchemaCatalog,
    config: &EngineConfig,
    issues: &mut Vec<Issue>,
) {
    let object = catalog.lookup(&spec.name);
    for token in &spec.selected_fields {
        let token = clean_name(token);
        if token.is_empty()
            || is_multiselect_keyword(token)
            || is_compound_field(&spec.name, token, config)
        {
            continue;
        }
        let decoded = polymorphic::decode(token);
        let name = decoded.field_name;
        if name.contains('.') {
            continue;
        }

        // Only sides that hold a describe of the object can miss a field.
        let field = object.field(name);
        let in_source = !object.is_described_on(Side::Source) || field.provenance.in_source();
        let in_target = !object.is_described_on(Side::Target) || field.provenance.in_target();
        issues.extend(Issue::presence(&spec.name, Some(name), in_source, in_target));
        if field.is_unknown() {
            continue;
        }

        if field.is_polymorphic(&config.polymorphic_ignore_list) {
            let assigned = decoded
                .object_name
                .or_else(|| spec.polymorphic_assignment(name));
            match assigned {
                None => issues.push(Issue::new(
                    IssueKind::UnresolvedPolymorphicField,
                    &spec.name,
                    Some(name),
                    format!(
                        "polymorphic field {name} needs a target object (one of {})",
                        field.reference_to.join(", ")
                    ),
                )),
                Some(target) if !field.reference_to.iter().any(|t| t == target) => {
                    issues.push(Issue::new(
                        IssueKind::UnresolvedPolymorphicField,
                        &spec.name,
                        Some(name),
                        format!("{target} is not a valid target of polymorphic field {name}"),
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

fn check_field_mapping(spec: &MigrationObjectSpec, catalog: &SchemaCatalog, issues: &mut Vec<Issue>) {
    if !spec.has_field_mapping() {
        return;
    }
    let source = catalog.view(Side::Source);
    let target = catalog.view(Side::Target);
    let target_object = spec.target_object_name();

    let target_object_known = !target.lookup(target_object).is_unknown();
    if !target_object_known {
        issues.push(Issue::new(
            IssueKind::FieldMappingTargetObjectMissing,
            &spec.name,
            None,
            format!("mapped target object {target_object} is missing in target metadata"),
        ));
    }

    let source_pending = catalog.lookup(&spec.name).is_pending_on(Side::Source);
    let check_target_fields =
        target_object_known && !catalog.lookup(target_object).is_pending_on(Side::Target);

    for mapping in spec.field_mapping.iter().filter(|m| m.renames_field()) {
        let source_field = mapping.source_field.trim();
        let target_field = mapping.target_field.trim();
        if !source_pending && source.field(&spec.name, source_field).is_unknown() {
            issues.push(Issue::new(
                IssueKind::FieldMappingSourceFieldMissing,
                &spec.name,
                Some(source_field),
                format!(
                    "mapped source field {source_field} is missing in source metadata of {}",
                    spec.name
                ),
            ));
        }
        if check_target_fields && target.field(target_object, target_field).is_unknown() {
            issues.push(Issue::new(
                IssueKind::FieldMappingTargetFieldMissing,
                &spec.name,
                Some(source_field),
                format!(
                    "mapped target field {target_field} is missing in target metadata of {target_object}"
                ),
            ));
        }
    }
}

/// Parses stored query text, reporting malformed text as an inline issue.
pub fn parse_query_inline(object_name: &str, text: &str) -> Result<ParsedQuery, Issue> {
    query::parse_query(text).map_err(|err| {
        Issue::new(
            IssueKind::MalformedQuery,
            object_name,
            None,
            format!("cannot read query: {err}"),
        )
    })
}
