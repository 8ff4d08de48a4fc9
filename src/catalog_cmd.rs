use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    catalog::{SchemaCatalog, SchemaSnapshot},
    cli::{CatalogArgs, SnapshotArgs},
    table::{Table, flag},
};

/// Loads both snapshots and merges them.
pub(crate) fn load_catalog(args: &SnapshotArgs) -> Result<SchemaCatalog> {
    let source = SchemaSnapshot::load(&args.source)
        .with_context(|| format!("Loading source side {:?}", args.source))?;
    let target = SchemaSnapshot::load(&args.target)
        .with_context(|| format!("Loading target side {:?}", args.target))?;
    Ok(SchemaCatalog::merge(&source, &target))
}

pub fn execute(args: &CatalogArgs) -> Result<()> {
    let catalog = load_catalog(&args.snapshots)?;
    match args.object.as_deref() {
        Some(name) => print_object(&catalog, name)?,
        None => print_objects(&catalog)?,
    }
    Ok(())
}

fn print_objects(catalog: &SchemaCatalog) -> Result<()> {
    let mut table = Table::new(&["Object", "Label", "Provenance", "Described", "Fields"]);
    for object in catalog.objects() {
        table.push_row([
            object.name.clone(),
            object.label.clone(),
            object.provenance.to_string(),
            flag(object.is_described()).to_string(),
            object.fields.len().to_string(),
        ]);
    }
    print!("{table}");

    let summary = catalog.summary();
    info!(
        "Catalog {}: {} object(s), {} in both, {} source-only, {} target-only, {} undescribed",
        short_fingerprint(catalog)?,
        catalog.len(),
        summary.both,
        summary.source_only,
        summary.target_only,
        summary.undescribed
    );
    Ok(())
}

fn print_object(catalog: &SchemaCatalog, name: &str) -> Result<()> {
    let object = catalog.lookup(name);
    if object.is_unknown() {
        bail!("Object {name} is missing in source and target metadata");
    }
    let mut table = Table::new(&["Field", "Type", "Provenance", "Reference To", "Readonly", "Custom"]);
    for field in object.fields.values() {
        table.push_row([
            field.name.clone(),
            field.field_type.clone(),
            field.provenance.to_string(),
            field.reference_to.join(","),
            flag(field.readonly()).to_string(),
            flag(field.custom).to_string(),
        ]);
    }
    print!("{table}");
    info!(
        "{} ({}): {} field(s)",
        object.name,
        object.provenance,
        table.len()
    );
    Ok(())
}

fn short_fingerprint(catalog: &SchemaCatalog) -> Result<String> {
    let mut fingerprint = catalog.fingerprint()?;
    fingerprint.truncate(12);
    Ok(fingerprint)
}
