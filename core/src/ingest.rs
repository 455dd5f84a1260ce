//! Best-effort plain-text extraction from uploaded documents.
//!
//! `.txt` is always supported. `.docx` needs the `docx` feature and `.pdf`
//! the `pdf` feature; unrecognized extensions yield an empty string.

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reading .{extension} files requires the `{feature}` feature")]
    Unsupported {
        extension: String,
        feature: &'static str,
    },
    #[error("Could not read .docx document: {0}")]
    Docx(String),
    #[error("Could not read .pdf document: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Docx,
    Pdf,
}

impl Format {
    fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()?
            .to_string_lossy()
            .to_lowercase();
        match extension.as_str() {
            "txt" => Some(Self::Text),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Extract text from `bytes`, choosing the decoder by `filename`'s extension.
pub fn read_document(bytes: &[u8], filename: &str) -> Result<String, IngestError> {
    let Some(format) = Format::from_filename(filename) else {
        log::debug!("[ingest] Unrecognized file type: {filename}");
        return Ok(String::new());
    };
    let text = match format {
        Format::Text => decode_text(bytes),
        Format::Docx => read_docx(bytes)?,
        Format::Pdf => read_pdf(bytes)?,
    };
    log::debug!("[ingest] Read {} chars from {filename}", text.chars().count());
    Ok(text)
}

/// Read a file from disk and extract its text.
pub fn read_path(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)?;
    read_document(&bytes, &path.to_string_lossy())
}

/// UTF-8 decode, dropping invalid byte sequences.
fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

#[cfg(feature = "docx")]
fn read_docx(bytes: &[u8]) -> Result<String, IngestError> {
    use std::io::{Cursor, Read};

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| IngestError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| IngestError::Docx(e.to_string()))?
        .read_to_string(&mut xml)?;
    Ok(docx_xml_to_text(&xml))
}

#[cfg(not(feature = "docx"))]
fn read_docx(_bytes: &[u8]) -> Result<String, IngestError> {
    Err(IngestError::Unsupported {
        extension: "docx".to_owned(),
        feature: "docx",
    })
}

#[cfg(feature = "pdf")]
fn read_pdf(bytes: &[u8]) -> Result<String, IngestError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestError::Pdf(e.to_string()))?;
    let pages: Vec<String> = doc
        .get_pages()
        .keys()
        .map(|&page| doc.extract_text(&[page]).unwrap_or_default())
        .collect();
    Ok(pages.join("\n"))
}

#[cfg(not(feature = "pdf"))]
fn read_pdf(_bytes: &[u8]) -> Result<String, IngestError> {
    Err(IngestError::Unsupported {
        extension: "pdf".to_owned(),
        feature: "pdf",
    })
}

/// Paragraphs of a WordprocessingML body, one per line, markup stripped.
#[cfg_attr(not(feature = "docx"), allow(dead_code, reason = "only used by the docx reader"))]
fn docx_xml_to_text(xml: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        current.push_str(&decode_entities(&rest[..open]));
        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[open + 1..open + close];
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        match name {
            "w:p" if tag.starts_with('/') || tag.ends_with('/') => {
                paragraphs.push(std::mem::take(&mut current));
            }
            "w:tab" => current.push('\t'),
            "w:br" | "w:cr" => current.push('\n'),
            _ => {}
        }
        rest = &rest[open + close + 1..];
    }
    current.push_str(&decode_entities(rest));
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs.join("\n")
}

/// Decode the predefined XML entities and numeric character references.
#[cfg_attr(not(feature = "docx"), allow(dead_code, reason = "only used by the docx reader"))]
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[1..semi];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
