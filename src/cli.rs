use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile source and target object metadata for data migrations",
    long_about = None
)]
pub struct Cli {
    /// Engine configuration file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge two schema snapshots and report object or field provenance
    Catalog(CatalogArgs),
    /// Resolve and validate an external id expression for an object
    ExternalId(ExternalIdArgs),
    /// Build the extraction query for an object settings file
    Query(QueryArgs),
    /// Describe a CSV file's header row as an object snapshot
    DescribeCsv(DescribeCsvArgs),
}

/// Snapshot inputs shared by every command that needs a catalog.
#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Source-side schema snapshot (`-` for an empty side)
    #[arg(short, long)]
    pub source: PathBuf,
    /// Target-side schema snapshot (`-` for an empty side)
    #[arg(short, long)]
    pub target: PathBuf,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,
    /// List the fields of a single object instead of all objects
    #[arg(short, long)]
    pub object: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExternalIdArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,
    /// Object the expression belongs to
    #[arg(short, long)]
    pub object: String,
    /// External id expression such as `Account__r.Name;Email`
    #[arg(short, long)]
    pub expression: String,
    /// Repair unmatched segments with the closest existing field name
    #[arg(long)]
    pub repair: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,
    /// Object settings file (YAML or JSON)
    #[arg(long)]
    pub spec: PathBuf,
    /// Rewrite the query for the target connection using the field mapping
    #[arg(long = "target-connection")]
    pub target_connection: bool,
    /// Emit a record count query instead of the field query
    #[arg(long)]
    pub count: bool,
}

#[derive(Debug, Args)]
pub struct DescribeCsvArgs {
    /// Input CSV file whose header row is described (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Object name the file stands in for
    #[arg(long)]
    pub object: String,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Destination snapshot file (YAML or JSON by extension)
    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
