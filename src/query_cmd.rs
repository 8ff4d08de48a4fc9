use anyhow::Result;
use log::{info, warn};

use crate::{
    catalog_cmd::load_catalog,
    cli::QueryArgs,
    config::EngineConfig,
    field_set,
    object_spec::MigrationObjectSpec,
    query,
    validate::validate_object_spec,
};

pub fn execute(args: &QueryArgs, config: &EngineConfig) -> Result<()> {
    let catalog = load_catalog(&args.snapshots)?;
    let spec = MigrationObjectSpec::load(&args.spec)?;

    let issues = validate_object_spec(&spec, &catalog, config);
    for issue in &issues {
        warn!("[{}] {issue}", issue.kind.code());
    }

    let text = if args.count {
        query::count_query(&spec)
    } else {
        let fields = field_set::compute_full_query_fields(&spec, &catalog, config);
        info!("{} field(s) selected for {}", fields.len(), spec.name);
        query::render_query(&query::build_query_template(&spec), &fields)
    };
    let text = query::rewrite_for_field_mapping(&text, &spec, args.target_connection);
    println!("{text}");

    info!(
        "Built query for {} with {} issue(s)",
        spec.name,
        issues.len()
    );
    Ok(())
}
