//! Extraction engine seam. Format decoding lives behind [`Extractor`]; the pipeline only maps its
//! outcome onto an [`ExtractionStatus`].

pub mod spewer;

pub use spewer::{FileSpewer, Spewer, StdoutSpewer};

use std::fs::File;
use std::io::{ErrorKind, Read};

use crate::concurrent::CancelToken;
use crate::document::{Document, EmbeddedDocument};
use crate::utils::config::EXTRACT_READ_CHUNK_SIZE;
use crate::{ExtractionStatus, Metadata};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("not found")]
    NotFound,
    #[error("not readable: {0}")]
    NotReadable(String),
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("extraction failed: {0}")]
    Runtime(String),
    #[error("interrupted")]
    Interrupted,
}

impl ExtractionError {
    pub fn status(&self) -> ExtractionStatus {
        match self {
            ExtractionError::NotFound => ExtractionStatus::FailureNotFound,
            ExtractionError::NotReadable(_) => ExtractionStatus::FailureNotReadable,
            ExtractionError::Unsupported(_) => ExtractionStatus::FailureUnsupported,
            ExtractionError::Runtime(_) => ExtractionStatus::FailureRuntime,
            ExtractionError::Interrupted => ExtractionStatus::FailureInterrupted,
        }
    }

    /// Classify an error raised while opening the source.
    pub fn from_open_error(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::NotFound => ExtractionError::NotFound,
            ErrorKind::Interrupted => ExtractionError::Interrupted,
            _ => ExtractionError::NotReadable(e.to_string()),
        }
    }
}

/// Text and metadata of one embedded document.
#[derive(Clone, Debug)]
pub struct EmbeddedExtraction {
    pub document: EmbeddedDocument,
    pub text: String,
}

/// Result of a successful extraction.
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub text: String,
    pub metadata: Metadata,
    pub embeds: Vec<EmbeddedExtraction>,
}

/// External extraction engine. Implementations check `cancel` at safe points and return
/// [`ExtractionError::Interrupted`] when it is set.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        document: &mut Document,
        cancel: &CancelToken,
    ) -> Result<Extraction, ExtractionError>;
}

/// Reads UTF-8 text files as-is. Anything that is not valid UTF-8 is unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(
        &self,
        document: &mut Document,
        cancel: &CancelToken,
    ) -> Result<Extraction, ExtractionError> {
        let path = document.path().to_path_buf();
        if path.is_dir() {
            return Err(ExtractionError::Unsupported("directory".to_string()));
        }
        let mut file = File::open(&path).map_err(ExtractionError::from_open_error)?;
        let mut bytes = Vec::new();
        let mut chunk = vec![0u8; EXTRACT_READ_CHUNK_SIZE];
        loop {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Interrupted);
            }
            let n = match file.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ExtractionError::Runtime(e.to_string())),
            };
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| ExtractionError::Unsupported("not UTF-8 text".to_string()))?;

        let mut metadata = Metadata::new();
        metadata.insert("Content-Type".to_string(), "text/plain; charset=UTF-8".to_string());
        metadata.insert("Content-Length".to_string(), text.len().to_string());
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            metadata.insert("Resource-Name".to_string(), name.to_string());
        }
        for (k, v) in &metadata {
            document.set_metadata(k.clone(), v.clone());
        }
        Ok(Extraction {
            text,
            metadata,
            embeds: Vec::new(),
        })
    }
}
