//! Crate-wide error taxonomy.
//!
//! Every public operation returns `Result<T, Error>`. Variants are grouped
//! into the buckets this crate's validation report uses to classify issues:
//! structure, ASN.1, CMS, chain, revocation, policy, timestamp, I/O, and
//! preparation. Each variant's `code()` is a stable, machine-readable
//! snake_case string a caller can match on without depending on `Display`.

use thiserror::Error as ThisError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError, Clone, PartialEq)]
pub enum Error {
    // ---- Structure (PDF slot locating) ----
    #[error("no /ByteRange found for signature field")]
    PdfByteRangeNotFound,
    #[error("no /Contents found for signature field")]
    PdfContentsNotFound,
    #[error("/ByteRange is malformed: {0}")]
    PdfByteRangeMalformed(String),
    #[error("/Contents hex region falls outside the /ByteRange gap")]
    PdfContentsOutsideGap,
    #[error("requested field is not a signature field")]
    PdfFieldNotSigned,
    #[error("page {requested} out of range (document has {available} pages)")]
    PageOutOfRange { requested: u32, available: u32 },

    // ---- ASN.1 ----
    #[error("ASN.1 input truncated at offset {offset}")]
    Asn1Truncated { offset: usize },
    #[error("ASN.1 tag mismatch: expected {expected}, found {found}")]
    Asn1TagMismatch { expected: String, found: String },
    #[error("ASN.1 value at offset {offset} is not DER-canonical: {reason}")]
    Asn1NonCanonical { offset: usize, reason: String },
    #[error("ASN.1 length overflow at offset {offset}")]
    Asn1LengthOverflow { offset: usize },

    // ---- CMS ----
    #[error("CMS signer certificate not found (identifier: {0})")]
    CmsSignerNotFound(String),
    #[error("CMS signed attributes missing message-digest")]
    CmsNoMessageDigest,
    #[error("CMS message-digest does not match computed content digest")]
    CmsDigestMismatch,
    #[error("CMS signature verification failed")]
    CmsSignatureInvalid,
    #[error("CMS signature/digest algorithm not supported: {0}")]
    CmsUnsupportedAlgorithm(String),

    // ---- Chain ----
    #[error("issuer not found for AKI {aki:?}; checked {anchor_count} anchors, {chain_count} chain certs, {pool_count} pool certs")]
    IssuerNotFound {
        aki: Option<String>,
        anchor_count: usize,
        chain_count: usize,
        pool_count: usize,
    },
    #[error("certificate not yet valid at validation time")]
    CertificateNotYetValid,
    #[error("certificate expired at validation time")]
    CertificateExpired,
    #[error("certificate signature failed to verify against its issuer")]
    CertificateSignatureInvalid,
    #[error("cycle detected while building certificate chain")]
    LoopInChain,

    // ---- Revocation ----
    #[error("revocation status could not be determined")]
    RevocationUnknown,
    #[error("certificate is revoked")]
    RevocationRevoked,
    #[error("OCSP responder is not trusted for this certificate")]
    OcspResponderUntrusted,
    #[error("OCSP response is outside its validity window")]
    OcspOutOfWindow,
    #[error("CRL signature failed to verify against its issuer")]
    CrlSignatureInvalid,

    // ---- Policy ----
    #[error("signature policy OID {0} not found in LPA")]
    PolicyOidNotFound(String),
    #[error("signing time precedes policy SigningPeriod.notBefore")]
    PolicyTimeBeforeValidity,
    #[error("signing time is after policy SigningPeriod.notAfter")]
    PolicyTimeAfterValidity,
    #[error("policy was revoked before the signing time")]
    PolicyRevokedBeforeSignatureTime,
    #[error("signature-policy-identifier attribute is missing the policy digest")]
    PolicyDigestMissing,
    #[error("policy digest algorithm does not match LPA entry")]
    PolicyDigestAlgorithmMismatch,
    #[error("policy digest length does not match LPA entry")]
    PolicyDigestLengthMismatch,
    #[error("policy digest value does not match LPA entry")]
    PolicyDigestMismatch,
    #[error("signature/digest algorithm {0} not allowed by policy")]
    PolicyAlgorithmNotAllowed(String),
    #[error("signer public key ({bits} bits) shorter than policy minimum ({min} bits)")]
    PolicyKeyTooShort { bits: usize, min: usize },
    #[error("LPA nextUpdate has passed; policy data may be outdated")]
    LpaOutdated,

    // ---- Timestamp ----
    #[error("mandated RFC 3161 timestamp is missing")]
    TimestampMissing,
    #[error("RFC 3161 timestamp token failed to verify")]
    TimestampInvalid,
    #[error("RFC 3161 messageImprint does not match the signature value")]
    TimestampImprintMismatch,

    // ---- I/O ----
    #[error("revocation/timestamp fetch failed: {0}")]
    IoFetchFailed(String),
    #[error("operation cancelled")]
    IoCancelled,
    #[error("operation timed out")]
    IoTimeout,

    // ---- Preparation ----
    #[error("PKCS#7 DER ({actual} bytes) does not fit in the reserved placeholder ({reserve} bytes)")]
    Pkcs7TooLarge { actual: usize, reserve: usize },
    #[error("reserve_bytes too small to hold a typical signature")]
    ReserveBytesTooSmall,

    // ---- Generic I/O passthrough ----
    #[error("I/O error: {0}")]
    Io(String),

    // ---- Low-level PDF tokenizing/structure (reused from the object/lexer/
    // parser/xref layer that backs the authoritative locator tier) ----
    #[error("invalid PDF: {0}")]
    InvalidPdf(String),
    #[error("invalid or unreadable cross-reference table")]
    InvalidXref,
    #[error("expected object type {expected}, found {found}")]
    InvalidObjectType { expected: String, found: String },
    #[error("parse error at offset {offset}: {reason}")]
    ParseError { offset: usize, reason: String },
}

impl Error {
    /// Stable, machine-readable snake_case error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::PdfByteRangeNotFound => "pdf_byterange_not_found",
            Error::PdfContentsNotFound => "pdf_contents_not_found",
            Error::PdfByteRangeMalformed(_) => "pdf_byterange_malformed",
            Error::PdfContentsOutsideGap => "pdf_contents_outside_gap",
            Error::PdfFieldNotSigned => "pdf_field_not_signed",
            Error::PageOutOfRange { .. } => "page_out_of_range",
            Error::Asn1Truncated { .. } => "asn1_truncated",
            Error::Asn1TagMismatch { .. } => "asn1_tag_mismatch",
            Error::Asn1NonCanonical { .. } => "asn1_non_canonical",
            Error::Asn1LengthOverflow { .. } => "asn1_length_overflow",
            Error::CmsSignerNotFound(_) => "cms_signer_not_found",
            Error::CmsNoMessageDigest => "cms_no_message_digest",
            Error::CmsDigestMismatch => "cms_digest_mismatch",
            Error::CmsSignatureInvalid => "cms_signature_invalid",
            Error::CmsUnsupportedAlgorithm(_) => "cms_unsupported_algorithm",
            Error::IssuerNotFound { .. } => "issuer_not_found",
            Error::CertificateNotYetValid => "certificate_not_yet_valid",
            Error::CertificateExpired => "certificate_expired",
            Error::CertificateSignatureInvalid => "certificate_signature_invalid",
            Error::LoopInChain => "loop_in_chain",
            Error::RevocationUnknown => "revocation_unknown",
            Error::RevocationRevoked => "revocation_revoked",
            Error::OcspResponderUntrusted => "ocsp_responder_untrusted",
            Error::OcspOutOfWindow => "ocsp_out_of_window",
            Error::CrlSignatureInvalid => "crl_signature_invalid",
            Error::PolicyOidNotFound(_) => "policy_oid_not_found",
            Error::PolicyTimeBeforeValidity => "policy_time_before_validity",
            Error::PolicyTimeAfterValidity => "policy_time_after_validity",
            Error::PolicyRevokedBeforeSignatureTime => "policy_revoked_before_signature_time",
            Error::PolicyDigestMissing => "policy_digest_missing",
            Error::PolicyDigestAlgorithmMismatch => "policy_digest_algorithm_mismatch",
            Error::PolicyDigestLengthMismatch => "policy_digest_length_mismatch",
            Error::PolicyDigestMismatch => "policy_digest_mismatch",
            Error::PolicyAlgorithmNotAllowed(_) => "policy_algorithm_not_allowed",
            Error::PolicyKeyTooShort { .. } => "policy_key_too_short",
            Error::LpaOutdated => "lpa_outdated",
            Error::TimestampMissing => "timestamp_missing",
            Error::TimestampInvalid => "timestamp_invalid",
            Error::TimestampImprintMismatch => "timestamp_imprint_mismatch",
            Error::IoFetchFailed(_) => "io_fetch_failed",
            Error::IoCancelled => "io_cancelled",
            Error::IoTimeout => "io_timeout",
            Error::Pkcs7TooLarge { .. } => "pkcs7_too_large",
            Error::ReserveBytesTooSmall => "reserve_bytes_too_small",
            Error::Io(_) => "io_error",
            Error::InvalidPdf(_) => "invalid_pdf",
            Error::InvalidXref => "invalid_xref",
            Error::InvalidObjectType { .. } => "invalid_object_type",
            Error::ParseError { .. } => "parse_error",
        }
    }

    /// Human-readable message (same text as `Display`).
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_spec_taxonomy() {
        assert_eq!(Error::PdfByteRangeNotFound.code(), "pdf_byterange_not_found");
        assert_eq!(Error::CmsDigestMismatch.code(), "cms_digest_mismatch");
        assert_eq!(
            Error::PolicyRevokedBeforeSignatureTime.code(),
            "policy_revoked_before_signature_time"
        );
    }

    #[test]
    fn issuer_not_found_carries_diagnostics() {
        let e = Error::IssuerNotFound {
            aki: Some("abcd".into()),
            anchor_count: 2,
            chain_count: 0,
            pool_count: 3,
        };
        assert!(e.message().contains("abcd"));
    }
}
