use anyhow::{Result, bail};
use log::{info, warn};

use crate::{
    catalog_cmd::load_catalog,
    cli::ExternalIdArgs,
    config::EngineConfig,
    external_id::{self, ResolveMode},
    table::{Table, flag},
};

pub fn execute(args: &ExternalIdArgs, config: &EngineConfig) -> Result<()> {
    let catalog = load_catalog(&args.snapshots)?;
    let mode = ResolveMode::from(args.repair);
    let resolved = external_id::resolve(&args.expression, &catalog, &args.object, mode, config);

    let mut table = Table::new(&["Section", "Segment", "Object", "Resolved", "Lookup", "Error"]);
    for (index, section) in resolved.sections.iter().enumerate() {
        for segment in &section.segments {
            table.push_row([
                (index + 1).to_string(),
                segment.display_name.clone(),
                segment.object_name.clone(),
                flag(segment.resolved_field.is_some()).to_string(),
                flag(segment.is_reference()).to_string(),
                segment
                    .error
                    .as_ref()
                    .map(|issue| issue.message.clone())
                    .unwrap_or_default(),
            ]);
        }
    }
    println!("{}", resolved.canonical());
    print!("{table}");

    for object in resolved.pending_describes() {
        warn!("{object} must be described before {} can be fully checked", args.object);
    }
    if !resolved.is_valid() {
        bail!(
            "External id '{}' of {} is invalid: {} error(s)",
            args.expression,
            args.object,
            resolved.errors().count()
        );
    }
    info!(
        "External id of {} resolved to '{}' ({} section(s))",
        args.object,
        resolved.canonical(),
        resolved.sections.len()
    );
    Ok(())
}
