//! End-to-end prepare → sign → embed → validate (spec.md §8, scenario 1).

mod common;

use common::minimal_pdf;
use icp_sign_core::config::PreparationOptions;
use icp_sign_core::geometry::Rect;
use icp_sign_core::{embed_pkcs7, extract_byte_range, prepare_for_external_signing, validate_all_signatures};

#[test]
fn prepare_then_embed_produces_intact_signature() {
    let pdf = minimal_pdf();
    let l0 = pdf.len();

    let options = PreparationOptions::new("S", Rect::new(100.0, 120.0, 220.0, 60.0)).with_reserve_bytes(8192);
    let prepared = prepare_for_external_signing(&pdf, &options).unwrap();
    assert!(prepared.prepared_bytes.len() > l0);

    let byte_range = extract_byte_range(&prepared.prepared_bytes).unwrap();
    assert_eq!(byte_range[0], 0);
    let gap = byte_range[2] - (byte_range[0] + byte_range[1]);
    assert_eq!(gap, 2 * 8192 + 2);

    let cert = common::self_signed("Test Signer", 1);
    let signed_bytes = {
        let (o1, l1, o2, l2) = (byte_range[0] as usize, byte_range[1] as usize, byte_range[2] as usize, byte_range[3] as usize);
        let mut out = prepared.prepared_bytes[o1..o1 + l1].to_vec();
        out.extend_from_slice(&prepared.prepared_bytes[o2..o2 + l2]);
        out
    };
    let pkcs7 = common::build_signed_cms(&signed_bytes, &cert.key, &cert.der, Some("240601000000Z"), None);

    let signed = embed_pkcs7(&prepared.prepared_bytes, &pkcs7).unwrap();
    assert_eq!(signed.len(), prepared.prepared_bytes.len());

    let report = validate_all_signatures(&signed, &icp_sign_core::ValidationOptions::new(std::sync::Arc::new(icp_sign_core::capabilities::StaticTrustRoots::new(vec![]))));
    assert_eq!(report.signatures.len(), 1);
    let sig = &report.signatures[0];
    assert!(sig.covers_current_file);
    assert!(sig.byte_range_digest_ok, "issues: {:?}", sig.issues);
    assert!(sig.cms_valid, "issues: {:?}", sig.issues);
    assert!(sig.document_intact);
}

#[test]
fn embed_rejects_oversized_pkcs7() {
    let pdf = minimal_pdf();
    let options = PreparationOptions::invisible("S").with_reserve_bytes(16);
    let prepared = prepare_for_external_signing(&pdf, &options).unwrap();
    let too_big = vec![0x11u8; 64];
    let err = embed_pkcs7(&prepared.prepared_bytes, &too_big).unwrap_err();
    assert_eq!(err.code(), "pkcs7_too_large");
}
