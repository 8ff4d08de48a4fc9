use anyhow::{Context, Result};
use log::info;

use crate::{
    catalog::SchemaSnapshot, cli::DescribeCsvArgs, csv_source::describe_csv_file, io_utils,
};

pub fn execute(args: &DescribeCsvArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Describing '{}' as {} with delimiter '{}'",
        args.input.display(),
        args.object,
        io_utils::printable_delimiter(delimiter)
    );
    let object = describe_csv_file(&args.input, &args.object, delimiter, encoding)
        .with_context(|| format!("Describing {:?}", args.input))?;
    let field_count = object.fields.len();

    let snapshot = SchemaSnapshot::new(vec![object]);
    snapshot.save(&args.output)?;
    info!(
        "Snapshot with {field_count} field(s) written to {:?}",
        args.output
    );
    Ok(())
}
