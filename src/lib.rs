#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! # icp_sign_core
//!
//! A PDF digital-signature validator and external-signing preparer for the
//! ICP-Brasil / Gov.br trust ecosystem.
//!
//! Given an opaque byte buffer presumed to be a PDF, this crate locates every
//! signature slot and its byte-exact `/ByteRange`/`/Contents` placeholder,
//! parses the embedded CMS/PKCS#7 `SignedData`, verifies the byte-range
//! digest and the signer's cryptographic signature, builds and validates the
//! X.509 chain against supplied trust anchors, evaluates ICP-Brasil
//! signature-policy constraints, and checks CRL/OCSP revocation. On the
//! signing side it prepares a PDF for external signing (reserve a
//! `/Contents` placeholder, fix the `/ByteRange`) and later embeds a
//! caller-supplied PKCS#7 into that placeholder without re-hashing.
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`asn1`] | DER decode/encode, typed ASN.1 views |
//! | [`x509`] | Certificate/CRL model, distinguished names, extensions |
//! | [`crypto`] | Digest dispatch, RSA/ECDSA signature verification |
//! | [`cms`] | CMS `SignedData` (PKCS#7) parsing and verification |
//! | [`pdf::slot`] | Byte-exact signature slot locator |
//! | [`pdf::preparer`] | External-signing placeholder prepare/embed |
//! | [`revocation`] | CRL and OCSP checking |
//! | [`chain`] | Certificate chain building/validation |
//! | [`policy`] | ICP-Brasil LPA + ETSI policy-XML constraint engine |
//! | [`orchestrator`] | Per-signature validation report pipeline |
//! | [`capabilities`] | `TrustRootsProvider`/`RevocationFetcher`/`TimestampAuthority`/`Signer` traits |
//!
//! Validation and preparation are single-threaded and cooperative: no task
//! is spawned internally. Network-shaped collaborators (revocation fetch,
//! timestamp fetch, external signer) are passed in as trait objects.
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license, at
//! your option.

pub mod error;

// Low-level PDF structural parsing, reused from the document-parsing layer
// to back the authoritative tier of the signature slot locator.
pub mod lexer;
pub mod object;
pub mod parser;
pub mod xref;
pub mod xref_codec;

pub mod geometry;

pub mod config;

pub mod asn1;
pub mod capabilities;
pub mod chain;
pub mod cms;
pub mod crypto;
pub mod pdf;
pub mod policy;
pub mod report;
pub mod revocation;
pub mod x509;

pub mod orchestrator;

pub use config::{PreparationOptions, ValidationOptions};
pub use error::{Error, Result};
pub use orchestrator::validate_all_signatures;
pub use pdf::preparer::{embed_pkcs7, prepare_for_external_signing};
pub use pdf::slot::{extract_byte_range, find_contents_range};
pub use report::ValidationReport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with('0'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "icp_sign_core");
    }
}
