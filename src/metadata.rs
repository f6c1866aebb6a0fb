//! The persisted metadata document and the builder that infers it.
//!
//! [`MetadataBuilder`] runs three sequential passes over the input, each
//! with its own file handle:
//!
//! 1. dialect sniffing over the first non-comment lines (skipped when a
//!    dialect is supplied),
//! 2. measuring the leading comment block,
//! 3. a full body scan that builds per-column histograms and keeps the
//!    first row aside until header detection decides what it is.
//!
//! Column classes, header names, `skip` and pedigree roles are then derived
//! from the histograms alone. The resulting [`Metadata`] is treated as
//! immutable configuration by [`crate::reader::TableReader`].

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    column_class::{ColumnDefinition, InferredColumn, infer_column_class},
    dialect::{self, Dialect, SNIFF_SAMPLE_LINES},
    error::{PhenoError, Result},
    header::{HeaderDecision, HeaderSource, detect_header},
    histogram::TableHistogram,
    io_utils::{self, DEFAULT_COMMENT, DataLines, LeadingBlock},
    pedigree::apply_pedigree_roles,
    raw_type::{RawType, classify},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(flatten)]
    pub dialect: Dialect,
    #[serde(default = "default_comment")]
    pub comment: String,
    #[serde(default)]
    pub header: HeaderSource,
    pub skip: usize,
}

fn default_comment() -> String {
    DEFAULT_COMMENT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub layout: Layout,
    pub columns: Vec<ColumnDefinition>,
}

impl Metadata {
    /// Infers metadata for `path` with default options.
    pub fn infer(path: &Path) -> Result<Self> {
        MetadataBuilder::new(path).build()
    }

    /// Position of the first column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) && !duplicates.contains(&column.name) {
                duplicates.push(column.name.clone());
            }
        }
        duplicates
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.dialect.validate()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let metadata: Metadata = serde_json::from_str(raw)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Writes YAML for `.yml`/`.yaml` paths and pretty JSON otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        if is_yaml_path(path) {
            serde_yaml::to_writer(writer, self)?;
        } else {
            serde_json::to_writer_pretty(writer, self)?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let metadata: Metadata = if is_yaml_path(path) {
            serde_yaml::from_reader(reader)?
        } else {
            serde_json::from_reader(reader)?
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

/// A lone row with any string token is read as a header over no data.
fn looks_like_header_only(row: &[String]) -> bool {
    row.iter().any(|token| classify(token) == RawType::Str)
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml")
    )
}

#[derive(Debug, Clone)]
pub struct InferOptions {
    pub comment: String,
    /// Skips sniffing when set.
    pub dialect: Option<Dialect>,
    pub encoding: &'static Encoding,
    pub sniff_lines: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            comment: DEFAULT_COMMENT.to_string(),
            dialect: None,
            encoding: UTF_8,
            sniff_lines: SNIFF_SAMPLE_LINES,
        }
    }
}

struct BodyScan {
    first_row: Option<Vec<String>>,
    histogram: TableHistogram,
}

pub struct MetadataBuilder<'a> {
    path: &'a Path,
    options: InferOptions,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self {
            path,
            options: InferOptions::default(),
        }
    }

    pub fn options(mut self, options: InferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn comment(mut self, token: impl Into<String>) -> Self {
        self.options.comment = token.into();
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.options.dialect = Some(dialect);
        self
    }

    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    pub fn build(&self) -> Result<Metadata> {
        let dialect = self.resolve_dialect()?;
        dialect.validate()?;
        let leading = self.scan_leading_block()?;
        let scan = self.scan_body(&dialect)?;
        self.assemble(dialect, leading, scan)
    }

    fn resolve_dialect(&self) -> Result<Dialect> {
        if let Some(dialect) = &self.options.dialect {
            return Ok(dialect.clone());
        }
        let reader = io_utils::open_decoded(self.path, self.options.encoding)?;
        let sample =
            io_utils::sample_data_lines(reader, &self.options.comment, self.options.sniff_lines)?;
        match dialect::sniff(&sample) {
            Some(dialect) => {
                debug!(
                    "Sniffed delimiter '{}' for {:?}",
                    dialect.describe_delimiter(),
                    self.path
                );
                Ok(dialect)
            }
            None => {
                let fallback = io_utils::fallback_dialect(self.path);
                warn!(
                    "Could not determine dialect of {:?}; falling back to delimiter '{}'",
                    self.path,
                    fallback.describe_delimiter()
                );
                Ok(fallback)
            }
        }
    }

    fn scan_leading_block(&self) -> Result<LeadingBlock> {
        let reader = io_utils::open_decoded(self.path, self.options.encoding)?;
        io_utils::read_leading_block(reader, &self.options.comment)
    }

    fn scan_body(&self, dialect: &Dialect) -> Result<BodyScan> {
        let source = io_utils::open_decoded(self.path, self.options.encoding)?;
        let lines = DataLines::new(source, &self.options.comment, dialect);
        let mut reader = dialect.reader_builder().from_reader(lines);
        let mut record = csv::StringRecord::new();
        let mut first_row: Option<Vec<String>> = None;
        let mut histogram = TableHistogram::default();
        let mut row = 0usize;

        while reader.read_record(&mut record)? {
            row += 1;
            match &first_row {
                None => {
                    histogram = TableHistogram::with_width(record.len());
                    first_row = Some(record.iter().map(str::to_string).collect());
                }
                Some(first) => {
                    if record.len() != first.len() {
                        return Err(PhenoError::RaggedRow {
                            row,
                            expected: first.len(),
                            found: record.len(),
                        });
                    }
                    histogram.record_row(&record);
                }
            }
        }
        Ok(BodyScan {
            first_row,
            histogram,
        })
    }

    fn assemble(&self, dialect: Dialect, leading: LeadingBlock, scan: BodyScan) -> Result<Metadata> {
        let BodyScan {
            first_row,
            mut histogram,
        } = scan;
        let Some(first_row) = first_row else {
            warn!("No data rows found in {:?}; metadata has no columns", self.path);
            return Ok(Metadata {
                layout: Layout {
                    dialect,
                    comment: self.options.comment.clone(),
                    header: HeaderSource::Position,
                    skip: leading.lines,
                },
                columns: Vec::new(),
            });
        };

        let provisional = histogram
            .columns()
            .iter()
            .map(|column| infer_column_class(column).unwrap_or_else(InferredColumn::undecidable))
            .collect::<Vec<_>>();
        let last_comment = leading
            .comments
            .last()
            .map(|line| dialect.split_line(line))
            .transpose()?;
        let decision = if histogram.rows() == 0 && looks_like_header_only(&first_row) {
            warn!(
                "{:?} has a header line but no data rows; every column is fixed",
                self.path
            );
            HeaderDecision {
                names: first_row.iter().map(|name| name.trim().to_string()).collect(),
                source: HeaderSource::FirstRow,
            }
        } else {
            detect_header(&first_row, last_comment.as_deref(), &provisional)
        };

        let inferred = if decision.source == HeaderSource::FirstRow {
            provisional
        } else {
            histogram.record_row(&first_row);
            histogram
                .columns()
                .iter()
                .enumerate()
                .map(|(idx, column)| {
                    infer_column_class(column).unwrap_or_else(|| {
                        warn!(
                            "Column {} ('{}') mixes incompatible value kinds; treating it as free text",
                            idx, decision.names[idx]
                        );
                        InferredColumn::undecidable()
                    })
                })
                .collect::<Vec<_>>()
        };

        let mut columns = decision
            .names
            .iter()
            .zip(inferred)
            .map(|(name, inferred)| ColumnDefinition::new(name.clone(), inferred))
            .collect::<Vec<_>>();
        for column in &columns {
            debug!(
                "Column '{}' inferred as {} ({})",
                column.name, column.class, column.value_type
            );
        }
        if apply_pedigree_roles(&mut columns) {
            info!("{:?} has a pedigree layout", self.path);
        }

        let metadata = Metadata {
            layout: Layout {
                dialect,
                comment: self.options.comment.clone(),
                header: decision.source,
                skip: decision.source.skip(leading.lines),
            },
            columns,
        };
        let duplicates = metadata.duplicate_names();
        if !duplicates.is_empty() {
            warn!(
                "Duplicate column names in {:?}: {}; lookups resolve to the first occurrence",
                self.path,
                duplicates.join(", ")
            );
        }
        info!(
            "Inferred {} column(s) from {} data row(s) in {:?} (header: {})",
            metadata.columns.len(),
            histogram.rows(),
            self.path,
            metadata.layout.header
        );
        Ok(metadata)
    }
}
