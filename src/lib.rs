pub mod cli;
pub mod column_class;
pub mod columns;
pub mod dialect;
pub mod error;
pub mod filetype;
pub mod header;
pub mod histogram;
pub mod io_utils;
pub mod metadata;
pub mod pedigree;
pub mod preview;
pub mod raw_type;
pub mod reader;
pub mod store;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    metadata::{InferOptions, Metadata, MetadataBuilder},
    reader::TableReader,
};

pub use crate::{
    column_class::{ColumnClass, ColumnDefinition, ValueType},
    dialect::Dialect,
    error::PhenoError,
    header::HeaderSource,
    raw_type::RawType,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("pheno_meta", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Extract(args) => handle_extract(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Filetype(args) => handle_filetype(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    ensure_text(&args.input)?;
    let options = args.infer.to_options()?;
    info!(
        "Probing '{}' with delimiter '{}'",
        args.input.display(),
        options
            .dialect
            .as_ref()
            .map_or_else(|| "auto".to_string(), Dialect::describe_delimiter)
    );
    let metadata = MetadataBuilder::new(&args.input)
        .options(options)
        .build()
        .with_context(|| format!("Inferring metadata from {:?}", args.input))?;
    match &args.output {
        Some(path) => {
            metadata
                .save(path)
                .with_context(|| format!("Writing metadata to {path:?}"))?;
            info!(
                "Metadata for {} column(s) written to {:?}",
                metadata.columns.len(),
                path
            );
        }
        None => println!("{}", metadata.to_json_string()?),
    }
    Ok(())
}

fn handle_extract(args: &cli::ExtractArgs) -> Result<()> {
    let reader = open_reader(&args.input, args.meta.as_deref(), args.infer.to_options()?)?;
    let columns = args
        .columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();
    debug!("Extract columns: {:?}", columns);
    let rows = reader
        .extract(&columns)
        .with_context(|| format!("Resolving columns in {:?}", args.input))?;

    let layout = &reader.metadata().layout;
    let delimiter = args.output_delimiter.unwrap_or(if layout.dialect.collapse_whitespace {
        b'\t'
    } else {
        layout.dialect.delimiter
    });
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)
        .with_context(|| format!("Opening output {:?}", args.output))?;
    writer.write_record(&columns)?;
    let mut written = 0usize;
    for row in rows {
        let row = row.with_context(|| format!("Reading data row {} of {:?}", written + 1, args.input))?;
        writer.write_record(&row)?;
        written += 1;
    }
    writer.flush()?;
    info!(
        "Extracted {} row(s) across {} column(s) from {:?}",
        written,
        columns.len(),
        args.input
    );
    Ok(())
}

fn handle_filetype(args: &cli::FiletypeArgs) -> Result<()> {
    let kind = filetype::sniff_file_type(&args.input)
        .with_context(|| format!("Inspecting {:?}", args.input))?;
    println!("{}: {}", args.input.display(), kind.description);
    println!("mime: {}", kind.mime);
    if !kind.is_text {
        bail!("{:?} is not a text file", args.input);
    }
    Ok(())
}

fn ensure_text(path: &Path) -> Result<()> {
    if !filetype::is_text_file(path).with_context(|| format!("Inspecting {path:?}"))? {
        bail!("{path:?} is not a text table");
    }
    Ok(())
}

/// Loads `meta` when given, otherwise infers metadata for `input`.
pub(crate) fn open_reader(
    input: &Path,
    meta: Option<&Path>,
    options: InferOptions,
) -> Result<TableReader> {
    match meta {
        Some(path) => {
            let metadata =
                Metadata::load(path).with_context(|| format!("Loading metadata from {path:?}"))?;
            Ok(TableReader::new(input, metadata).with_encoding(options.encoding))
        }
        None => {
            ensure_text(input)?;
            TableReader::infer_with(input, options)
                .with_context(|| format!("Inferring metadata from {input:?}"))
        }
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        b' ' => "space".to_string(),
        other => (other as char).to_string(),
    }
}
