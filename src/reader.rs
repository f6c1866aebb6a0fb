//! Column extraction driven by a metadata document.
//!
//! A [`TableReader`] never re-infers or mutates its metadata. Each call to
//! [`TableReader::extract`] opens a fresh handle, discards `layout.skip`
//! physical lines and streams the remaining data rows as tuples aligned to
//! the requested column names.

use std::{
    collections::HashMap,
    iter::FusedIterator,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::{PhenoError, Result},
    io_utils::{self, DataLines, DecodedReader},
    metadata::{InferOptions, Metadata, MetadataBuilder},
};

#[derive(Debug, Clone)]
pub struct TableReader {
    path: PathBuf,
    metadata: Metadata,
    encoding: &'static Encoding,
}

impl TableReader {
    pub fn new(path: impl Into<PathBuf>, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            metadata,
            encoding: UTF_8,
        }
    }

    /// Builds metadata for `path` with default options.
    pub fn infer(path: impl Into<PathBuf>) -> Result<Self> {
        Self::infer_with(path, InferOptions::default())
    }

    pub fn infer_with(path: impl Into<PathBuf>, options: InferOptions) -> Result<Self> {
        let path = path.into();
        let encoding = options.encoding;
        let metadata = MetadataBuilder::new(&path).options(options).build()?;
        Ok(Self::new(path, metadata).with_encoding(encoding))
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Name to position mapping; the first occurrence of a name wins.
    pub fn column_indexes(&self) -> HashMap<&str, usize> {
        let mut indexes = HashMap::with_capacity(self.metadata.columns.len());
        for (idx, column) in self.metadata.columns.iter().enumerate() {
            indexes.entry(column.name.as_str()).or_insert(idx);
        }
        indexes
    }

    /// Resolves every requested name, reporting all absent ones together.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let indexes = self.column_indexes();
        let mut positions = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match indexes.get(name.as_ref()) {
                Some(idx) => positions.push(*idx),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(positions)
        } else {
            Err(PhenoError::MissingColumns(missing))
        }
    }

    pub fn extract<S: AsRef<str>>(&self, names: &[S]) -> Result<Extract> {
        let positions = self.resolve(names)?;
        self.open(positions)
    }

    /// Streams every column in physical order.
    pub fn rows(&self) -> Result<Extract> {
        self.open((0..self.metadata.columns.len()).collect())
    }

    fn open(&self, positions: Vec<usize>) -> Result<Extract> {
        let layout = &self.metadata.layout;
        let mut source = io_utils::open_decoded(&self.path, self.encoding)?;
        let skipped = io_utils::skip_lines(&mut source, layout.skip)?;
        debug!(
            "Skipped {} of {} leading line(s) in {:?}",
            skipped, layout.skip, self.path
        );
        let lines = DataLines::new(source, &layout.comment, &layout.dialect);
        let reader = layout.dialect.reader_builder().from_reader(lines);
        Ok(Extract {
            reader,
            positions,
            width: self.metadata.columns.len(),
            record: csv::StringRecord::new(),
            row: 0,
            finished: false,
        })
    }
}

/// Single-pass stream of extracted rows. Stops after the first error.
pub struct Extract {
    reader: csv::Reader<DataLines<DecodedReader>>,
    positions: Vec<usize>,
    width: usize,
    record: csv::StringRecord,
    row: usize,
    finished: bool,
}

impl Extract {
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }
}

impl Iterator for Extract {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                self.row += 1;
                if self.record.len() != self.width {
                    self.finished = true;
                    return Some(Err(PhenoError::RaggedRow {
                        row: self.row,
                        expected: self.width,
                        found: self.record.len(),
                    }));
                }
                Some(Ok(self
                    .positions
                    .iter()
                    .map(|&idx| self.record[idx].to_string())
                    .collect()))
            }
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err.into()))
            }
        }
    }
}

impl FusedIterator for Extract {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    fn collect(extract: Extract) -> Vec<Vec<String>> {
        extract.map(|row| row.expect("row")).collect()
    }

    #[test]
    fn extracts_requested_columns_in_request_order() {
        let file = write_temp("id,age,sex\n1,34,M\n2,51,F\n3,34,F\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        let rows = collect(reader.extract(&["sex", "id"]).expect("extract"));
        assert_eq!(
            rows,
            vec![vec!["M", "1"], vec!["F", "2"], vec!["F", "3"]]
        );
    }

    #[test]
    fn headerless_file_yields_first_row() {
        let file = write_temp("# comment\n1\t5\n2\t6\n3\t7\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        let rows = collect(reader.extract(&["COL1"]).expect("extract"));
        assert_eq!(rows, vec![vec!["5"], vec!["6"], vec!["7"]]);
    }

    #[test]
    fn interleaved_comments_are_not_data() {
        let file = write_temp("id,v\n1,a\n# halfway\n2,b\n\n3,a\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        let rows = collect(reader.rows().expect("rows"));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["2", "b"]);
    }

    #[test]
    fn quoted_multiline_values_survive_extraction() {
        let file = write_temp("id,note\n1,\"a\n\nb\"\n2,\"x\n# y\"\n3,d\n4,e\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        assert_eq!(reader.metadata().column_names(), vec!["id", "note"]);
        let rows = collect(reader.rows().expect("rows"));
        assert_eq!(
            rows,
            vec![
                vec!["1", "a\n\nb"],
                vec!["2", "x\n# y"],
                vec!["3", "d"],
                vec!["4", "e"],
            ]
        );
    }

    #[test]
    fn header_only_file_yields_no_rows() {
        let file = write_temp("id,age,sex\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        assert_eq!(reader.metadata().layout.skip, 1);
        assert!(collect(reader.extract(&["id", "sex"]).expect("extract")).is_empty());
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let file = write_temp("id,age\n1,2\n3,4\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        let err = reader.extract(&["age", "bmi", "height"]).err().expect("error");
        match err {
            PhenoError::MissingColumns(names) => assert_eq!(names, vec!["bmi", "height"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_names_resolve_to_first_column() {
        let file = write_temp("x,x\n1,2\n3,4\n");
        let reader = TableReader::infer(file.path()).expect("reader");
        let extract = reader.extract(&["x"]).expect("extract");
        assert_eq!(extract.positions(), &[0]);
        assert_eq!(collect(extract), vec![vec!["1"], vec!["3"]]);
    }

    #[test]
    fn ragged_row_stops_the_stream() {
        let file = write_temp("id,age\n1,2\n3,4\n");
        let metadata = Metadata::infer(file.path()).expect("infer");
        let changed = write_temp("id,age\n1,2\n3\n5,6\n");
        let reader = TableReader::new(changed.path(), metadata);
        let mut rows = reader.extract(&["id"]).expect("extract");
        assert_eq!(rows.next().expect("first").expect("ok"), vec!["1"]);
        assert!(matches!(
            rows.next(),
            Some(Err(PhenoError::RaggedRow { row: 2, .. }))
        ));
        assert!(rows.next().is_none());
    }
}
