//! Documents and their identity.
//!
//! A [`Document`] is a path plus a metadata map. Its content digest is computed lazily and cached in
//! the metadata under the algorithm's key, so an identifier never hashes the same document twice.

pub mod digest;
pub mod identifier;

pub use digest::{DigestAlgorithm, HashingError, TextCharset, hash_bytes, hash_file};
pub use identifier::{DigestIdentifier, DocumentIdentifier, PathIdentifier, identifier_for};

use std::path::{Path, PathBuf};

use crate::Metadata;

/// A top-level document: a file on disk.
#[derive(Clone, Debug)]
pub struct Document {
    path: PathBuf,
    metadata: Metadata,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Set a metadata value, replacing any previous value for `key`.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Hex digest of the file bytes. Hashes on first call, then served from metadata.
    pub fn digest(&mut self, algorithm: DigestAlgorithm) -> Result<String, HashingError> {
        let key = algorithm.metadata_key();
        if let Some(cached) = self.metadata.get(&key) {
            return Ok(cached.clone());
        }
        let digest = hash_file(&self.path, algorithm)?;
        self.metadata.insert(key, digest.clone());
        Ok(digest)
    }
}

/// A document found inside another one (archive entry, attachment). Identified relative to its container.
#[derive(Clone, Debug)]
pub struct EmbeddedDocument {
    embed_path: String,
    metadata: Metadata,
}

impl EmbeddedDocument {
    pub fn new(embed_path: impl Into<String>) -> Self {
        Self {
            embed_path: embed_path.into(),
            metadata: Metadata::new(),
        }
    }

    /// Location of the embed inside its container, e.g. `attachments/report.txt`.
    pub fn embed_path(&self) -> &str {
        &self.embed_path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}
