//! Text extraction from uploaded policy files.
//!
//! Extraction is a collaborator of the chunking pipeline: it turns a file on
//! disk into one plain-text string and nothing more.

use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// Errors from text extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file format '{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to extract text from {}: {cause}", path.display())]
    ExtractionFailure { path: PathBuf, cause: String },
}

impl ExtractError {
    fn failure(path: &Path, cause: impl ToString) -> Self {
        Self::ExtractionFailure {
            path: path.to_path_buf(),
            cause: cause.to_string(),
        }
    }
}

/// Trait for pulling plain text out of a document file.
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the file at `path`.
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// File extractor dispatching on the file extension.
///
/// Supports plain text (`.txt`, `.md`), PDF and Word (`.docx`) documents.
/// `.doc` files are read as DOCX, which covers the common case of a DOCX
/// saved under the old extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl FileExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extensions this extractor can read.
    pub fn supported_extensions() -> &'static [&'static str] {
        &["txt", "md", "pdf", "docx", "doc"]
    }
}

impl TextExtractor for FileExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "txt" | "md" => {
                std::fs::read_to_string(path).map_err(|e| ExtractError::failure(path, e))?
            }
            "pdf" => extract_pdf(path)?,
            "docx" | "doc" => extract_docx(path)?,
            _ => {
                return Err(ExtractError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension,
                });
            }
        };

        tracing::debug!(
            target: "extract",
            "extracted {} chars from {}",
            text.chars().count(),
            path.display()
        );
        Ok(text)
    }
}

/// Text of every page, in page order.
fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::failure(path, e))?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::failure(path, e))
}

/// Read the paragraphs of a `.docx` file, one per line.
fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let file = std::fs::File::open(path).map_err(|e| ExtractError::failure(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::failure(path, e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::failure(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::failure(path, e))?;

    docx_xml_to_text(&xml).map_err(|e| ExtractError::failure(path, e))
}

/// Collect `w:t` runs, turning paragraph ends and breaks into newlines.
fn docx_xml_to_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push(' '),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}
