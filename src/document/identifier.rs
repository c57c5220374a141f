//! Document identity strategies. The strategy used to write a report must be the one used to read it back.

use std::sync::Arc;

use super::digest::{DigestAlgorithm, HashingError, TextCharset};
use super::{Document, EmbeddedDocument};
use crate::engine::tools::path_to_id_string;
use crate::{IdentityKind, Metadata};

/// Pure mapping from a document to its report Id.
pub trait DocumentIdentifier: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> String;

    fn generate(&self, document: &mut Document) -> Result<String, HashingError>;

    /// Id of `embed`, derived from the container's Id and the embed path.
    fn generate_for_embed(
        &self,
        container: &mut Document,
        embed: &EmbeddedDocument,
    ) -> Result<String, HashingError>;

    /// Digest already cached in `metadata`, if this strategy uses one.
    fn retrieve_hash(&self, metadata: &Metadata) -> Option<String>;
}

/// Identity by normalized path. No I/O, never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathIdentifier;

impl DocumentIdentifier for PathIdentifier {
    fn name(&self) -> String {
        "path".to_string()
    }

    fn generate(&self, document: &mut Document) -> Result<String, HashingError> {
        Ok(path_to_id_string(document.path()))
    }

    fn generate_for_embed(
        &self,
        container: &mut Document,
        embed: &EmbeddedDocument,
    ) -> Result<String, HashingError> {
        let container_id = self.generate(container)?;
        Ok(format!(
            "{}/{}",
            container_id.trim_end_matches('/'),
            embed.embed_path().trim_start_matches('/')
        ))
    }

    fn retrieve_hash(&self, _metadata: &Metadata) -> Option<String> {
        None
    }
}

/// Identity by content digest: same bytes, same Id, wherever the file lives.
#[derive(Clone, Copy, Debug, Default)]
pub struct DigestIdentifier {
    algorithm: DigestAlgorithm,
    charset: TextCharset,
}

impl DigestIdentifier {
    pub fn new(algorithm: DigestAlgorithm, charset: TextCharset) -> Self {
        Self { algorithm, charset }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn charset(&self) -> TextCharset {
        self.charset
    }
}

impl DocumentIdentifier for DigestIdentifier {
    fn name(&self) -> String {
        format!("digest({}, {})", self.algorithm, self.charset.name())
    }

    fn generate(&self, document: &mut Document) -> Result<String, HashingError> {
        document.digest(self.algorithm)
    }

    fn generate_for_embed(
        &self,
        container: &mut Document,
        embed: &EmbeddedDocument,
    ) -> Result<String, HashingError> {
        let container_id = self.generate(container)?;
        let mut hasher = self.algorithm.hasher();
        hasher.update(&self.charset.encode(&container_id));
        hasher.update(&self.charset.encode(embed.embed_path()));
        Ok(hasher.finalize_hex())
    }

    fn retrieve_hash(&self, metadata: &Metadata) -> Option<String> {
        metadata.get(&self.algorithm.metadata_key()).cloned()
    }
}

/// Build the identifier for a run's configuration.
pub fn identifier_for(
    kind: IdentityKind,
    algorithm: DigestAlgorithm,
    charset: TextCharset,
) -> Arc<dyn DocumentIdentifier> {
    match kind {
        IdentityKind::Path => Arc::new(PathIdentifier),
        IdentityKind::Digest => Arc::new(DigestIdentifier::new(algorithm, charset)),
    }
}
