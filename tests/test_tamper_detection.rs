//! Byte-for-byte tamper detection (spec.md §8, scenario 2): flipping a byte
//! inside the first `ByteRange` half must surface `cms_digest_mismatch` and
//! `byte_range_digest_ok = false`, without crashing the CMS signature check.

mod common;

use common::minimal_pdf;
use icp_sign_core::capabilities::StaticTrustRoots;
use icp_sign_core::config::PreparationOptions;
use icp_sign_core::{embed_pkcs7, extract_byte_range, prepare_for_external_signing, validate_all_signatures, ValidationOptions};
use std::sync::Arc;

fn prepare_and_sign() -> Vec<u8> {
    let pdf = minimal_pdf();
    let options = PreparationOptions::invisible("S").with_reserve_bytes(4096);
    let prepared = prepare_for_external_signing(&pdf, &options).unwrap();
    let byte_range = extract_byte_range(&prepared.prepared_bytes).unwrap();

    let cert = common::self_signed("Tamper Test Signer", 2);
    let (o1, l1, o2, l2) = (byte_range[0] as usize, byte_range[1] as usize, byte_range[2] as usize, byte_range[3] as usize);
    let mut signed_bytes = prepared.prepared_bytes[o1..o1 + l1].to_vec();
    signed_bytes.extend_from_slice(&prepared.prepared_bytes[o2..o2 + l2]);
    let pkcs7 = common::build_signed_cms(&signed_bytes, &cert.key, &cert.der, Some("240601000000Z"), None);
    embed_pkcs7(&prepared.prepared_bytes, &pkcs7).unwrap()
}

fn no_trust_options() -> ValidationOptions {
    ValidationOptions::new(Arc::new(StaticTrustRoots::new(vec![])))
}

#[test]
fn untampered_file_is_intact() {
    let signed = prepare_and_sign();
    let report = validate_all_signatures(&signed, &no_trust_options());
    assert!(report.signatures[0].document_intact);
}

#[test]
fn flipping_a_byte_inside_first_range_breaks_digest() {
    let mut signed = prepare_and_sign();
    // Byte 10 sits well inside the first ByteRange half (the PDF header),
    // outside the /Contents hex placeholder.
    signed[10] ^= 0xFF;

    let report = validate_all_signatures(&signed, &no_trust_options());
    let sig = &report.signatures[0];
    assert!(!sig.byte_range_digest_ok);
    assert!(!sig.document_intact);
    assert!(sig.issues.iter().any(|i| i.code == "cms_digest_mismatch"));
}
