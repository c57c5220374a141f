//! Content digests: algorithm choice, text encoding of digest inputs, and file hashing.

use memmap2::Mmap;
use sha2::Digest as _;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::ExtractionStatus;
use crate::utils::config::HashingConsts;

/// Failure computing a document digest. Local to one document; never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HashingError {
    /// Status recorded for a document whose identity could not be computed.
    pub fn status(&self) -> ExtractionStatus {
        match self {
            HashingError::Open { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ExtractionStatus::FailureNotFound
            }
            HashingError::Open { .. } => ExtractionStatus::FailureNotReadable,
            HashingError::Read { .. } => ExtractionStatus::FailureRuntime,
        }
    }
}

/// Digest algorithm for content identity. SHA-256 is the default so Ids stay comparable across runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
            DigestAlgorithm::Blake3 => "BLAKE3",
        }
    }

    /// Metadata key under which a document caches its digest.
    pub fn metadata_key(&self) -> String {
        format!("Content-{}", self.name())
    }

    pub fn hasher(&self) -> DigestHasher {
        match self {
            DigestAlgorithm::Sha256 => DigestHasher::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Sha384 => DigestHasher::Sha384(sha2::Sha384::new()),
            DigestAlgorithm::Sha512 => DigestHasher::Sha512(sha2::Sha512::new()),
            DigestAlgorithm::Blake3 => DigestHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA512" => Ok(DigestAlgorithm::Sha512),
            "BLAKE3" => Ok(DigestAlgorithm::Blake3),
            _ => Err(anyhow::anyhow!("unsupported digest algorithm: {s}")),
        }
    }
}

/// Incremental hasher over any supported algorithm.
pub enum DigestHasher {
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl DigestHasher {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            DigestHasher::Sha256(h) => h.update(bytes),
            DigestHasher::Sha384(h) => h.update(bytes),
            DigestHasher::Sha512(h) => h.update(bytes),
            DigestHasher::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    /// Lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            DigestHasher::Sha256(h) => hex::encode(h.finalize()),
            DigestHasher::Sha384(h) => hex::encode(h.finalize()),
            DigestHasher::Sha512(h) => hex::encode(h.finalize()),
            DigestHasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Charset used to turn text (container Ids, embed paths) into digest input bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextCharset {
    #[default]
    Ascii,
    Latin1,
    Utf8,
}

impl TextCharset {
    pub fn name(&self) -> &'static str {
        match self {
            TextCharset::Ascii => "US-ASCII",
            TextCharset::Latin1 => "ISO-8859-1",
            TextCharset::Utf8 => "UTF-8",
        }
    }

    /// Encode `text`; characters the charset cannot represent become `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextCharset::Utf8 => text.as_bytes().to_vec(),
            TextCharset::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            TextCharset::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

impl FromStr for TextCharset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASCII" | "US-ASCII" => Ok(TextCharset::Ascii),
            "LATIN1" | "LATIN-1" | "ISO-8859-1" => Ok(TextCharset::Latin1),
            "UTF8" | "UTF-8" => Ok(TextCharset::Utf8),
            _ => Err(anyhow::anyhow!("unsupported charset: {s}")),
        }
    }
}

/// Hex digest of in-memory bytes.
pub fn hash_bytes(algorithm: DigestAlgorithm, bytes: &[u8]) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(bytes);
    hasher.finalize_hex()
}

/// Hash a file. Uses memory-mapped I/O above the mmap threshold, chunked reading otherwise.
pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String, HashingError> {
    let open_err = |source| HashingError::Open {
        path: path.to_path_buf(),
        source,
    };
    let read_err = |source| HashingError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_err)?;
    let size = file.metadata().map_err(open_err)?.len();
    let mut hasher = algorithm.hasher();

    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file).map_err(read_err)? };
        hasher.update(&mmap);
    } else {
        let mut reader =
            std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buffer).map_err(read_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(hasher.finalize_hex())
}
