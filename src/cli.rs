use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    dialect::{Dialect, SNIFF_SAMPLE_LINES},
    error::Result,
    io_utils::{self, DEFAULT_COMMENT},
    metadata::InferOptions,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer and use metadata for phenotype tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer layout and column classes of a phenotype file
    Probe(ProbeArgs),
    /// Stream selected columns of a phenotype file as CSV
    Extract(ExtractArgs),
    /// List the column definitions of a metadata document or phenotype file
    Columns(ColumnsArgs),
    /// Preview the first rows of a phenotype file under their inferred names
    Preview(PreviewArgs),
    /// Report whether a file is text and what kind
    Filetype(FiletypeArgs),
}

/// Flags that steer inference of a phenotype file.
#[derive(Debug, Clone, Args)]
pub struct InferFlags {
    /// Token that starts a comment line
    #[arg(long, default_value = DEFAULT_COMMENT)]
    pub comment: String,
    /// Field delimiter; skips sniffing (supports 'tab', 'comma', 'pipe', 'semicolon', 'whitespace' or one character)
    #[arg(long, value_parser = parse_dialect)]
    pub delimiter: Option<Dialect>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of data lines sampled for dialect sniffing
    #[arg(long = "sniff-lines", default_value_t = SNIFF_SAMPLE_LINES)]
    pub sniff_lines: usize,
}

impl InferFlags {
    pub fn to_options(&self) -> Result<InferOptions> {
        Ok(InferOptions {
            comment: self.comment.clone(),
            dialect: self.delimiter.clone(),
            encoding: io_utils::resolve_encoding(self.input_encoding.as_deref())?,
            sniff_lines: self.sniff_lines,
        })
    }
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Phenotype file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination metadata file (.json, .yml or .yaml); stdout when omitted
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub infer: InferFlags,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Phenotype file to read
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Metadata document produced by `probe`; inferred when omitted
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
    /// Columns to extract, in output order
    #[arg(short = 'C', long = "columns", value_delimiter = ',', required = true)]
    pub columns: Vec<String>,
    /// Output CSV file (stdout if omitted or '-')
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter for output (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    #[command(flatten)]
    pub infer: InferFlags,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Metadata document to list
    #[arg(short, long, conflicts_with = "input", required_unless_present = "input")]
    pub meta: Option<PathBuf>,
    /// Phenotype file to infer and list
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    #[command(flatten)]
    pub infer: InferFlags,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Phenotype file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Metadata document produced by `probe`; inferred when omitted
    #[arg(short, long)]
    pub meta: Option<PathBuf>,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    #[command(flatten)]
    pub infer: InferFlags,
}

#[derive(Debug, Args)]
pub struct FiletypeArgs {
    /// File to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        "space" => Ok(b' '),
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

/// Input delimiters additionally accept runs of whitespace.
pub fn parse_dialect(value: &str) -> Result<Dialect, String> {
    match value {
        "whitespace" | "ws" => Ok(Dialect::whitespace()),
        other => {
            let dialect = Dialect::with_delimiter(parse_delimiter(other)?);
            dialect.validate().map_err(|err| err.to_string())?;
            Ok(dialect)
        }
    }
}
