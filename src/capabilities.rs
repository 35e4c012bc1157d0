//! Capability traits: the narrow synchronous seams through which the
//! orchestrator reaches outside the input buffer — trust anchors,
//! revocation fetching, timestamp authorities, and signing. All are `Send +
//! Sync` so a caller can share one implementation across threads; none of
//! them are async — a caller that needs network I/O runs it behind a
//! blocking call or a runtime's `block_on`.

use crate::crypto::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::x509::X509Certificate;

/// Supplies the trust anchors (root/ICP-Brasil AC roots) a chain must climb
/// to. Implementations typically load these once at startup; `anchors()` is
/// called once per chain build.
pub trait TrustRootsProvider: Send + Sync {
    fn anchors(&self) -> &[X509Certificate];
}

/// A fixed in-memory set of trust anchors — the common case for tests and
/// for callers that embed a vendored AC root bundle.
#[derive(Debug, Clone, Default)]
pub struct StaticTrustRoots {
    anchors: Vec<X509Certificate>,
}

impl StaticTrustRoots {
    pub fn new(anchors: Vec<X509Certificate>) -> Self {
        Self { anchors }
    }
}

impl TrustRootsProvider for StaticTrustRoots {
    fn anchors(&self) -> &[X509Certificate] {
        &self.anchors
    }
}

/// Fetches CRLs and OCSP responses by URL. The revocation engine calls
/// this once per distribution point / AIA URI it needs to consult; it never
/// retries or caches on the caller's behalf — that policy belongs to the
/// implementation.
pub trait RevocationFetcher: Send + Sync {
    fn fetch_crl(&self, url: &str) -> Result<Vec<u8>>;
    fn fetch_ocsp(&self, url: &str, request_der: &[u8]) -> Result<Vec<u8>>;
}

/// Fetches an RFC 3161 timestamp token for a `TimeStampReq`. Only used by the
/// preparer when asked to timestamp a signature at creation time; validation
/// never calls this (embedded tokens are parsed and verified, not fetched).
pub trait TimestampAuthority: Send + Sync {
    fn fetch(&self, request_der: &[u8]) -> Result<Vec<u8>>;
}

/// Produces a raw signature over a digest. The preparer never signs on its
/// own — `prepare_for_external_signing` hands the caller a digest to sign
/// out of band (HSM, smart card, remote KMS) and `embed_pkcs7` splices the
/// resulting PKCS#7 back in — but a `Signer` is provided for callers who hold
/// key material in-process and want a single call to go from digest to
/// embedded signature.
pub trait Signer: Send + Sync {
    fn sign(&self, digest: &[u8], digest_alg: DigestAlgorithm) -> Result<Vec<u8>>;
}

/// A `RevocationFetcher` that always fails, for non-revocation-aware
/// validation runs (e.g. document-intact-only checks).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRevocation;

impl RevocationFetcher for NoRevocation {
    fn fetch_crl(&self, url: &str) -> Result<Vec<u8>> {
        Err(Error::IoFetchFailed(format!("revocation fetching disabled (requested {url})")))
    }

    fn fetch_ocsp(&self, url: &str, _request_der: &[u8]) -> Result<Vec<u8>> {
        Err(Error::IoFetchFailed(format!("revocation fetching disabled (requested {url})")))
    }
}
