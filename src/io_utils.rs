//! I/O utilities for phenotype table reading and writing.
//!
//! Every pass over an input file opens its own handle through this module
//! and drops it when the pass ends. It provides:
//!
//! - **Decoding**: input is transcoded to UTF-8 via `encoding_rs_io`,
//!   defaulting to UTF-8 (with BOM sniffing).
//! - **Comment handling**: the leading comment block is measured and
//!   collected, and [`DataLines`] strips comment and blank lines from the
//!   body before it reaches the CSV parser.
//! - **Fallback dialects**: extension-based defaults used when sniffing
//!   cannot decide (`.tsv` → tab, `.ped`/`.fam` → whitespace, else comma).
//! - **Output**: CSV writers on a file or stdout (`-`).

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};

use crate::{
    dialect::Dialect,
    error::{PhenoError, Result},
};

pub const DEFAULT_COMMENT: &str = "#";

pub type DecodedReader = BufReader<DecodeReaderBytes<File, Vec<u8>>>;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| PhenoError::UnknownEncoding(value.to_string())),
        None => Ok(UTF_8),
    }
}

pub fn fallback_dialect(path: &Path) -> Dialect {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => {
            Dialect::with_delimiter(b'\t')
        }
        Some(ext) if ext.eq_ignore_ascii_case("ped") || ext.eq_ignore_ascii_case("fam") => {
            Dialect::whitespace()
        }
        _ => Dialect::default(),
    }
}

/// Opens `path` for one pass, transcoding from `encoding` to UTF-8.
pub fn open_decoded(path: &Path, encoding: &'static Encoding) -> Result<DecodedReader> {
    let file = File::open(path)?;
    let decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(file);
    Ok(BufReader::new(decoder))
}

pub fn is_comment_line(line: &str, comment: &str) -> bool {
    !comment.is_empty() && line.trim_start().starts_with(comment)
}

fn is_blank_line(line: &str) -> bool {
    line.trim().is_empty()
}

/// The comment/blank lines preceding the first data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadingBlock {
    /// Physical lines in the block, blank ones included.
    pub lines: usize,
    /// Comment lines with the comment token removed and whitespace trimmed.
    pub comments: Vec<String>,
}

pub fn read_leading_block<R: BufRead>(reader: R, comment: &str) -> Result<LeadingBlock> {
    let mut block = LeadingBlock::default();
    for line in reader.lines() {
        let line = line?;
        if is_comment_line(&line, comment) {
            let text = line.trim_start()[comment.len()..].trim();
            block.comments.push(text.to_string());
        } else if !is_blank_line(&line) {
            break;
        }
        block.lines += 1;
    }
    Ok(block)
}

/// Collects up to `limit` data lines (comments and blanks removed),
/// newline-joined for the sniffer.
pub fn sample_data_lines<R: BufRead>(reader: R, comment: &str, limit: usize) -> Result<String> {
    let mut sample = Vec::with_capacity(limit);
    for line in reader.lines() {
        if sample.len() >= limit {
            break;
        }
        let line = line?;
        if is_comment_line(&line, comment) || is_blank_line(&line) {
            continue;
        }
        sample.push(line);
    }
    Ok(sample.join("\n"))
}

/// Discards `count` physical lines; returns how many were actually present.
pub fn skip_lines<R: BufRead>(reader: &mut R, count: usize) -> Result<usize> {
    let mut buffer = Vec::new();
    for skipped in 0..count {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(skipped);
        }
    }
    Ok(count)
}

/// A `Read` adapter yielding only data lines, each normalized by the
/// dialect and terminated by `\n`. Lines inside an open quoted field are
/// passed through with their original line ending.
pub struct DataLines<R> {
    inner: R,
    comment: String,
    dialect: Dialect,
    line: String,
    pending: Vec<u8>,
    pos: usize,
    in_quotes: bool,
}

impl<R: BufRead> DataLines<R> {
    pub fn new(inner: R, comment: &str, dialect: &Dialect) -> Self {
        Self {
            inner,
            comment: comment.to_string(),
            dialect: dialect.clone(),
            line: String::new(),
            pending: Vec::new(),
            pos: 0,
            in_quotes: false,
        }
    }

    fn fill(&mut self) -> io::Result<bool> {
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Ok(false);
            }
            let text = self.line.trim_end_matches(['\r', '\n']);
            if !self.in_quotes && (is_blank_line(text) || is_comment_line(text, &self.comment)) {
                continue;
            }
            let ending = &self.line[text.len()..];
            let prepared = self.dialect.prepare_line(text, self.in_quotes);
            self.in_quotes = self.dialect.quote_open_after(text, self.in_quotes);
            self.pending.clear();
            self.pos = 0;
            self.pending.extend_from_slice(prepared.as_bytes());
            if self.in_quotes {
                self.pending.extend_from_slice(ending.as_bytes());
            } else {
                self.pending.push(b'\n');
            }
            return Ok(true);
        }
    }
}

impl<R: BufRead> Read for DataLines<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            if !self.fill()? {
                return Ok(0);
            }
        }
        let available = &self.pending[self.pos..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.pos += count;
        Ok(count)
    }
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(File::create(p)?)),
        _ => Box::new(io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn leading_block_counts_comments_and_blanks() {
        let text = "# generated\n\n  # id age\n1 34\n# trailing\n";
        let block = read_leading_block(Cursor::new(text), "#").expect("block");
        assert_eq!(block.lines, 3);
        assert_eq!(block.comments, vec!["generated", "id age"]);
    }

    #[test]
    fn leading_block_is_empty_without_comments() {
        let block = read_leading_block(Cursor::new("a,b\n1,2\n"), "#").expect("block");
        assert_eq!(block, LeadingBlock::default());
    }

    #[test]
    fn sample_skips_comments_anywhere() {
        let text = "#c\na,b\n\n#mid\n1,2\n3,4\n";
        let sample = sample_data_lines(Cursor::new(text), "#", 2).expect("sample");
        assert_eq!(sample, "a,b\n1,2");
    }

    #[test]
    fn data_lines_strip_comments_and_crlf() {
        let text = "# header\r\n1,2\r\n\r\n# note\r\n3,4\r\n";
        let mut out = String::new();
        DataLines::new(Cursor::new(text), "#", &Dialect::default())
            .read_to_string(&mut out)
            .expect("read");
        assert_eq!(out, "1,2\n3,4\n");
    }

    #[test]
    fn data_lines_keep_quoted_blank_and_comment_lines() {
        let text = "1,\"a\r\n\r\nb\"\r\n\r\n2,\"x\n# y\"\n# note\n";
        let mut out = String::new();
        DataLines::new(Cursor::new(text), "#", &Dialect::default())
            .read_to_string(&mut out)
            .expect("read");
        assert_eq!(out, "1,\"a\r\n\r\nb\"\n2,\"x\n# y\"\n");
    }

    #[test]
    fn data_lines_collapse_whitespace_runs() {
        let text = "a   b\tc\n";
        let mut out = String::new();
        DataLines::new(Cursor::new(text), "#", &Dialect::whitespace())
            .read_to_string(&mut out)
            .expect("read");
        assert_eq!(out, "a b c\n");
    }

    #[test]
    fn skip_lines_stops_at_end_of_input() {
        let mut reader = Cursor::new("one\ntwo\n");
        assert_eq!(skip_lines(&mut reader, 5).expect("skip"), 2);
    }

    #[test]
    fn fallback_dialect_follows_extension() {
        assert_eq!(fallback_dialect(Path::new("x.tsv")).delimiter, b'\t');
        assert!(fallback_dialect(Path::new("x.ped")).collapse_whitespace);
        assert_eq!(fallback_dialect(Path::new("x.txt")).delimiter, b',');
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert!(resolve_encoding(Some("latin1")).is_ok());
        assert!(matches!(
            resolve_encoding(Some("klingon")),
            Err(PhenoError::UnknownEncoding(_))
        ));
    }
}
