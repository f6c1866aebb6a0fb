//! Content-based file type sniffing for uploaded tables.
//!
//! Only text files are worth inferring. The check looks at the first block
//! of the file: a byte-order mark, NUL bytes, UTF-8 validity and the share
//! of control characters decide between text and binary data.

use std::{fs::File, io::Read, path::Path};

use encoding_rs::Encoding;

use crate::error::Result;

const SNIFF_BYTES: u64 = 8192;
/// Control characters tolerated in a legacy 8-bit text file, per mille.
const CONTROL_PER_MILLE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    /// Human readable description, e.g. `ASCII text`.
    pub description: String,
    pub mime: String,
    pub is_text: bool,
}

impl FileType {
    fn text(description: &str, charset: &str, crlf: bool) -> Self {
        let mut description = description.to_string();
        if crlf {
            description.push_str(", with CRLF line terminators");
        }
        Self {
            description,
            mime: format!("text/plain; charset={charset}"),
            is_text: true,
        }
    }

    fn binary(description: &str, mime: &str) -> Self {
        Self {
            description: description.to_string(),
            mime: mime.to_string(),
            is_text: false,
        }
    }
}

pub fn sniff_file_type(path: &Path) -> Result<FileType> {
    let mut head = Vec::new();
    File::open(path)?.take(SNIFF_BYTES).read_to_end(&mut head)?;
    Ok(sniff_bytes(&head))
}

pub fn is_text_file(path: &Path) -> Result<bool> {
    Ok(sniff_file_type(path)?.is_text)
}

pub fn sniff_bytes(head: &[u8]) -> FileType {
    if head.is_empty() {
        return FileType::binary("empty", "inode/x-empty; charset=binary");
    }
    let crlf = head.windows(2).any(|pair| pair == b"\r\n");

    if let Some((encoding, _)) = Encoding::for_bom(head) {
        let charset = encoding.name().to_ascii_lowercase();
        let description = format!("{} Unicode text", encoding.name());
        return FileType::text(&description, &charset, crlf);
    }
    if head.contains(&0) {
        return FileType::binary("data", "application/octet-stream; charset=binary");
    }

    let utf8_ok = match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text.
        Err(err) => err.error_len().is_none(),
    };
    if utf8_ok {
        return if head.is_ascii() {
            FileType::text("ASCII text", "us-ascii", crlf)
        } else {
            FileType::text("UTF-8 Unicode text", "utf-8", crlf)
        };
    }

    let controls = head
        .iter()
        .filter(|&&byte| byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b))
        .count();
    if controls * 1000 <= head.len() * CONTROL_PER_MILLE_LIMIT {
        FileType::text("ISO-8859 text", "iso-8859-1", crlf)
    } else {
        FileType::binary("data", "application/octet-stream; charset=binary")
    }
}
