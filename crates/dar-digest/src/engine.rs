use std::io::Read;

use dar_types::ContentDigest;

/// Read chunk size for streaming sources.
const CHUNK_SIZE: usize = 64 * 1024;

/// Domain-separated BLAKE3 content digest engine.
///
/// The engine carries a domain tag that is prepended to every hash
/// computation, so digests from different registries cannot collide even
/// over identical bytes. [`DigestEngine::ASSET`] is the canonical engine
/// for asset content; registration and verification must both use it.
pub struct DigestEngine {
    domain: &'static str,
}

impl DigestEngine {
    /// Engine for asset content digests.
    pub const ASSET: Self = Self {
        domain: "dar-asset-v1",
    };

    /// Create an engine with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Digest an in-memory byte slice.
    pub fn digest_bytes(&self, data: &[u8]) -> ContentDigest {
        let mut hasher = self.hasher();
        hasher.update(data);
        ContentDigest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Digest an arbitrary byte source, consuming it exactly once.
    ///
    /// The source is streamed through the hasher in fixed-size chunks, so
    /// arbitrarily large inputs are accepted. An I/O failure before the
    /// source is fully consumed surfaces as [`DigestError::Read`]; it is
    /// never merged into any ledger error category.
    pub fn digest_reader<R: Read>(&self, source: &mut R) -> Result<ContentDigest, DigestError> {
        let mut hasher = self.hasher();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = source.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(ContentDigest::from_hash(*hasher.finalize().as_bytes()))
    }

    /// Verify that a source's content matches an expected digest.
    pub fn verify_reader<R: Read>(
        &self,
        source: &mut R,
        expected: &ContentDigest,
    ) -> Result<bool, DigestError> {
        Ok(self.digest_reader(source)? == *expected)
    }

    /// The domain tag used by this engine.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn hasher(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

/// Errors from digest computation.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The byte source could not be fully consumed.
    #[error("failed to read byte source: {0}")]
    Read(#[from] std::io::Error),
}
