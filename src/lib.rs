pub mod catalog;
mod catalog_cmd;
pub mod cli;
pub mod config;
pub mod csv_source;
pub mod describe;
mod describe_csv_cmd;
pub mod external_id;
mod external_id_cmd;
pub mod field_set;
pub mod io_utils;
pub mod issues;
pub mod object_spec;
pub mod polymorphic;
pub mod query;
mod query_cmd;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands},
    config::EngineConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sobject_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(cli.config.as_deref())?;
    debug!("Engine configuration: {config:?}");
    match cli.command {
        Commands::Catalog(args) => catalog_cmd::execute(&args),
        Commands::ExternalId(args) => external_id_cmd::execute(&args, &config),
        Commands::Query(args) => query_cmd::execute(&args, &config),
        Commands::DescribeCsv(args) => describe_csv_cmd::execute(&args),
    }
}
