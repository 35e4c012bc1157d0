//! OCSP revocation (spec.md §8, scenario 4): given a leaf whose OCSP
//! response indicates `revoked(2024-05-01T00:00:00Z, reason=keyCompromise)`
//! and a valid chain, `revocation::ocsp::check` must report
//! `RevocationStatus::Revoked` with that reason; a `good` response over the
//! same chain must report `RevocationStatus::Good`.

mod common;

use chrono::{Duration, Utc};
use icp_sign_core::revocation::ocsp;
use icp_sign_core::revocation::RevocationStatus;
use icp_sign_core::x509::X509Certificate;

fn build_chain() -> (X509Certificate, X509Certificate, common::TestKey) {
    let issuer_key = common::rsa_key(2048);
    let issuer_der = common::build_certificate("ICP Test CA", "ICP Test CA", 1, &issuer_key, &issuer_key, "200101000000Z", "340101000000Z", None, None);
    let leaf_key = common::rsa_key(2048);
    let leaf_der = common::build_certificate("Leaf Signer", "ICP Test CA", 42, &leaf_key, &issuer_key, "240101000000Z", "300101000000Z", None, None);

    let issuer = X509Certificate::parse(&issuer_der).unwrap();
    let leaf = X509Certificate::parse(&leaf_der).unwrap();
    (leaf, issuer, issuer_key)
}

#[test]
fn good_response_reports_good_status() {
    let (leaf, issuer, issuer_key) = build_chain();
    let response = common::build_ocsp_response(&leaf.der, &issuer.der, &issuer_key, "20240501000000Z", None);
    let status = ocsp::check(&leaf, &issuer, &response, "2024-05-01T00:00:00Z".parse().unwrap(), Duration::hours(1)).unwrap();
    assert_eq!(status, RevocationStatus::Good);
}

#[test]
fn revoked_response_reports_revoked_with_reason() {
    let (leaf, issuer, issuer_key) = build_chain();
    let response = common::build_ocsp_response(&leaf.der, &issuer.der, &issuer_key, "20240501000000Z", Some("20240501000000Z"));
    let status = ocsp::check(&leaf, &issuer, &response, "2024-06-01T00:00:00Z".parse().unwrap(), Duration::hours(1)).unwrap();

    match status {
        RevocationStatus::Revoked { at, reason } => {
            assert_eq!(at, Some("2024-05-01T00:00:00Z".parse::<chrono::DateTime<Utc>>().unwrap()));
            assert_eq!(reason.as_deref(), Some("keyCompromise"));
        },
        other => panic!("expected Revoked, got {other:?}"),
    }
}

#[test]
fn response_signed_by_unrelated_key_is_rejected() {
    let (leaf, issuer, _issuer_key) = build_chain();
    let impostor_key = common::rsa_key(2048);
    let response = common::build_ocsp_response(&leaf.der, &issuer.der, &impostor_key, "20240501000000Z", None);
    let err = ocsp::check(&leaf, &issuer, &response, "2024-06-01T00:00:00Z".parse().unwrap(), Duration::hours(1)).unwrap_err();
    assert_eq!(err.code(), "ocsp_responder_untrusted");
}
