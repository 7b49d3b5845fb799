use crate::error::{IngestError, Result};
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings seen in exports from the accounting system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8, with the byte-order mark stripped when present.
    #[serde(rename = "utf-8-sig", alias = "utf-8")]
    Utf8Sig,
    /// Windows code page 932 (the Shift_JIS family).
    #[serde(rename = "cp932", alias = "shift_jis")]
    Cp932,
}

impl TextEncoding {
    pub const DEFAULT_ORDER: [TextEncoding; 2] = [TextEncoding::Utf8Sig, TextEncoding::Cp932];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Cp932 => "cp932",
        }
    }

    fn encoding(&self) -> &'static Encoding {
        match self {
            TextEncoding::Utf8Sig => UTF_8,
            TextEncoding::Cp932 => SHIFT_JIS,
        }
    }

    fn strip_bom<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        match self {
            TextEncoding::Utf8Sig => bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes),
            TextEncoding::Cp932 => bytes,
        }
    }

    /// Decodes `bytes`, returning `None` on the first malformed sequence.
    pub fn decode_strict(&self, bytes: &[u8]) -> Option<String> {
        self.encoding()
            .decode_without_bom_handling_and_without_replacement(self.strip_bom(bytes))
            .map(|text| text.into_owned())
    }

    /// Decodes `bytes`, substituting U+FFFD for malformed sequences.
    pub fn decode_lossy(&self, bytes: &[u8]) -> String {
        let (text, had_errors) = self
            .encoding()
            .decode_without_bom_handling(self.strip_bom(bytes));
        if had_errors {
            debug!("Lossy {} decode replaced malformed sequences", self.label());
        }
        text.into_owned()
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Tries each candidate in order and returns the first clean decode.
pub fn decode_first(bytes: &[u8], candidates: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    candidates.iter().find_map(|encoding| {
        let decoded = encoding.decode_strict(bytes);
        if decoded.is_none() {
            debug!("{} decode failed, trying next candidate", encoding);
        }
        decoded.map(|text| (text, *encoding))
    })
}

pub(crate) fn decode_or_error(
    path: &Path,
    bytes: &[u8],
    candidates: &[TextEncoding],
) -> Result<(String, TextEncoding)> {
    decode_first(bytes, candidates).ok_or_else(|| IngestError::Decode {
        path: path.to_path_buf(),
        tried: candidates.iter().map(|e| e.label().to_string()).collect(),
    })
}

pub fn read_file_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| IngestError::from_io(path, e))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|e| IngestError::from_io(path, e))?;
    Ok(buffer)
}

/// Reads up to `line_count` lines from the start of `path`.
///
/// The raw bytes of the window are decoded with the first candidate that
/// accepts all of them; the winning encoding is returned so the tabular body
/// can be decoded the same way. Line terminators are removed. Files shorter
/// than the window yield fewer lines.
pub fn read_header_window(
    path: &Path,
    line_count: usize,
    candidates: &[TextEncoding],
) -> Result<(Vec<String>, TextEncoding)> {
    let file = File::open(path).map_err(|e| IngestError::from_io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut window = Vec::new();
    for _ in 0..line_count {
        let read = reader
            .read_until(b'\n', &mut window)
            .map_err(|e| IngestError::from_io(path, e))?;
        if read == 0 {
            break;
        }
    }

    let (text, encoding) = decode_or_error(path, &window, candidates)?;
    info!(
        "Read header window of {} from {} as {}",
        line_count,
        path.display(),
        encoding
    );

    let lines = text.lines().map(str::to_string).collect();
    Ok((lines, encoding))
}
