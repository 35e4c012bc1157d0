//! Per-call configuration (C1-C10 glue, spec.md §4.13): no crate-global
//! state. Every entry point takes an explicit options struct, so two callers
//! in the same process can validate against different trust roots, clock
//! skew, or policy catalogues without interfering with each other.

use crate::capabilities::{RevocationFetcher, TimestampAuthority, TrustRootsProvider};
use crate::geometry::Rect;
use crate::pdf::slot::LocatorStrategy;
use crate::policy::PolicyConstraints;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Options governing [`crate::validate_all_signatures`].
///
/// `is_cancelled`, when set, is polled between per-slot validation phases
/// (spec.md §5) — never mid-phase — so a cancelled run still returns a
/// partial, internally consistent report rather than a half-built one.
#[derive(Clone)]
pub struct ValidationOptions {
    /// Instant validation is evaluated at, when a signature carries neither
    /// a trusted `signing-time` attribute nor a valid embedded timestamp.
    /// `None` means "use the wall clock" at the moment validation runs.
    pub now: Option<DateTime<Utc>>,
    /// Strict mode upgrades several policy warnings (missing digest, missing
    /// mandated timestamp) to hard errors; see spec.md §4.9.
    pub strict: bool,
    pub clock_skew: Duration,
    pub locator_strategy: LocatorStrategy,
    pub trust_roots: Arc<dyn TrustRootsProvider>,
    /// LPA policy constraints, keyed by dotted-decimal policy OID.
    pub policy_xml_by_oid: HashMap<String, PolicyConstraints>,
    pub revocation_fetcher: Option<Arc<dyn RevocationFetcher>>,
    pub timestamp_authority: Option<Arc<dyn TimestampAuthority>>,
    pub is_cancelled: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl ValidationOptions {
    pub fn new(trust_roots: Arc<dyn TrustRootsProvider>) -> Self {
        Self {
            now: None,
            strict: false,
            clock_skew: Duration::minutes(5),
            locator_strategy: LocatorStrategy::default(),
            trust_roots,
            policy_xml_by_oid: HashMap::new(),
            revocation_fetcher: None,
            timestamp_authority: None,
            is_cancelled: None,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn with_locator_strategy(mut self, strategy: LocatorStrategy) -> Self {
        self.locator_strategy = strategy;
        self
    }

    pub fn with_revocation_fetcher(mut self, fetcher: Arc<dyn RevocationFetcher>) -> Self {
        self.revocation_fetcher = Some(fetcher);
        self
    }

    pub fn with_timestamp_authority(mut self, tsa: Arc<dyn TimestampAuthority>) -> Self {
        self.timestamp_authority = Some(tsa);
        self
    }

    pub fn with_policy(mut self, policy_oid: impl Into<String>, constraints: PolicyConstraints) -> Self {
        self.policy_xml_by_oid.insert(policy_oid.into(), constraints);
        self
    }

    pub fn with_cancellation(mut self, is_cancelled: Arc<dyn Fn() -> bool + Send + Sync>) -> Self {
        self.is_cancelled = Some(is_cancelled);
        self
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.is_cancelled.as_ref().is_some_and(|f| f())
    }
}

impl std::fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("now", &self.now)
            .field("strict", &self.strict)
            .field("clock_skew", &self.clock_skew)
            .field("locator_strategy", &self.locator_strategy)
            .field("policy_oids", &self.policy_xml_by_oid.keys().collect::<Vec<_>>())
            .field("revocation_fetcher", &self.revocation_fetcher.is_some())
            .field("timestamp_authority", &self.timestamp_authority.is_some())
            .field("is_cancelled", &self.is_cancelled.is_some())
            .finish()
    }
}

/// A caller-supplied hook that draws the visible signature appearance stream
/// into the widget annotation's form XObject. Given the signer's metadata and
/// the rectangle it is placed in, it returns the raw PDF content stream bytes
/// (operators only, no dictionary). `None` produces an invisible signature
/// field (no `/AP`), which is a valid and common ICP-Brasil signature shape.
pub type AppearanceCallback = Arc<dyn Fn(&PreparationMetadata, &Rect) -> Vec<u8> + Send + Sync>;

/// Free-text fields written into the signature dictionary (spec.md §4.6):
/// `/Name`, `/Reason`, `/Location`, `/ContactInfo`.
#[derive(Debug, Clone, Default)]
pub struct PreparationMetadata {
    pub name: Option<String>,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
}

/// Options governing [`crate::prepare_for_external_signing`].
#[derive(Clone)]
pub struct PreparationOptions {
    /// 0-indexed page the visible signature widget is placed on. `None`
    /// produces an invisible signature with no widget rectangle.
    pub page: Option<u32>,
    pub rect: Rect,
    pub field_name: String,
    pub metadata: PreparationMetadata,
    pub appearance: Option<AppearanceCallback>,
    /// Bytes reserved for the PKCS#7 DER blob once hex-encoded; `None`
    /// selects a default sized to cover a typical chain + timestamp +
    /// embedded OCSP/CRL response (see `pdf::preparer::DEFAULT_RESERVE_BYTES`).
    pub reserve_bytes: Option<usize>,
    pub digest_alg: crate::crypto::DigestAlgorithm,
    pub sub_filter: SignatureSubFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureSubFilter {
    #[default]
    Pkcs7Detached,
    CadesDetached,
}

impl SignatureSubFilter {
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::Pkcs7Detached => "adbe.pkcs7.detached",
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
        }
    }
}

impl PreparationOptions {
    pub fn new(field_name: impl Into<String>, rect: Rect) -> Self {
        Self {
            page: Some(0),
            rect,
            field_name: field_name.into(),
            metadata: PreparationMetadata::default(),
            appearance: None,
            reserve_bytes: None,
            digest_alg: crate::crypto::DigestAlgorithm::Sha256,
            sub_filter: SignatureSubFilter::default(),
        }
    }

    pub fn invisible(field_name: impl Into<String>) -> Self {
        Self { page: None, ..Self::new(field_name, Rect::new(0.0, 0.0, 0.0, 0.0)) }
    }

    pub fn with_metadata(mut self, metadata: PreparationMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_reserve_bytes(mut self, reserve_bytes: usize) -> Self {
        self.reserve_bytes = Some(reserve_bytes);
        self
    }

    pub fn with_digest_alg(mut self, alg: crate::crypto::DigestAlgorithm) -> Self {
        self.digest_alg = alg;
        self
    }

    pub fn with_sub_filter(mut self, sub_filter: SignatureSubFilter) -> Self {
        self.sub_filter = sub_filter;
        self
    }

    pub fn with_appearance(mut self, cb: AppearanceCallback) -> Self {
        self.appearance = Some(cb);
        self
    }
}

impl std::fmt::Debug for PreparationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparationOptions")
            .field("page", &self.page)
            .field("rect", &self.rect)
            .field("field_name", &self.field_name)
            .field("metadata", &self.metadata)
            .field("appearance", &self.appearance.is_some())
            .field("reserve_bytes", &self.reserve_bytes)
            .field("digest_alg", &self.digest_alg)
            .field("sub_filter", &self.sub_filter)
            .finish()
    }
}
