//! Shared fixtures for the integration suite: hand-built DER for a minimal
//! self-signed RSA certificate, a CMS `SignedData` wrapping it, and a
//! `BasicOCSPResponse` signed by the same key. None of this goes through a
//! certificate/CMS authoring library — it uses the crate's own low-level
//! `asn1` encoders, the same way the crate's own unit tests build fixtures
//! too small to justify a full ASN.1 authoring dependency.

#![allow(dead_code)]

use icp_sign_core::asn1::oid::well_known;
use icp_sign_core::asn1::{self, Integer, Oid};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

pub struct TestKey {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

pub fn rsa_key(bits: usize) -> TestKey {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, bits).expect("key generation");
    let public = private.to_public_key();
    TestKey { private, public }
}

fn rsa_spki_key_bytes(pk: &RsaPublicKey) -> Vec<u8> {
    asn1::encode_sequence(&[
        Integer::from_unsigned_be(&pk.n().to_bytes_be()).encode_der(),
        Integer::from_unsigned_be(&pk.e().to_bytes_be()).encode_der(),
    ])
}

fn rdn_sequence(cn: &str) -> Vec<u8> {
    let attr = asn1::encode_sequence(&[
        well_known::at_common_name().encode_der(),
        asn1::encode_tlv(asn1::Class::Universal, false, asn1::TAG_UTF8_STRING, cn.as_bytes()),
    ]);
    let rdn = asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &attr);
    asn1::encode_sequence(&[rdn])
}

fn utc_time(s: &str) -> Vec<u8> {
    asn1::encode_tlv(asn1::Class::Universal, false, asn1::TAG_UTC_TIME, s.as_bytes())
}

fn sha256_with_rsa_alg_id() -> Vec<u8> {
    asn1::encode_sequence(&[well_known::sha256_with_rsa().encode_der(), asn1::encode_null()])
}

/// A minimal extensions block: just Subject/Authority Key Identifier, the
/// only two the chain builder's AKI/SKI tie-break reads.
fn ski_aki_extensions(ski: Option<&[u8]>, aki: Option<&[u8]>) -> Option<Vec<u8>> {
    let mut exts = Vec::new();
    if let Some(ski) = ski {
        exts.push(asn1::encode_sequence(&[
            well_known::ext_subject_key_identifier().encode_der(),
            asn1::encode_octet_string(&asn1::encode_tlv(asn1::Class::Universal, false, asn1::TAG_OCTET_STRING, ski)),
        ]));
    }
    if let Some(aki) = aki {
        // AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] IMPLICIT OCTET STRING }
        let aki_seq = asn1::encode_sequence(&[asn1::encode_context_implicit(0, aki)]);
        exts.push(asn1::encode_sequence(&[well_known::ext_authority_key_identifier().encode_der(), asn1::encode_octet_string(&aki_seq)]));
    }
    if exts.is_empty() {
        return None;
    }
    let ext_seq = asn1::encode_sequence(&exts);
    Some(asn1::encode_context_explicit(3, &ext_seq))
}

/// Build and self-sign a certificate's `tbsCertificate`/`Certificate` DER.
/// `issuer_key` signs; when `issuer_key` is `subject_key`, the certificate
/// is self-signed (the common case used as both leaf and trust anchor in
/// these tests).
pub fn build_certificate(
    subject_cn: &str,
    issuer_cn: &str,
    serial: i64,
    subject_key: &TestKey,
    issuer_key: &TestKey,
    not_before: &str,
    not_after: &str,
    ski: Option<&[u8]>,
    aki: Option<&[u8]>,
) -> Vec<u8> {
    let spki = asn1::encode_sequence(&[
        sha256_with_rsa_alg_id_for_spki(),
        asn1::encode_bit_string(0, &rsa_spki_key_bytes(&subject_key.public)),
    ]);

    let validity = asn1::encode_sequence(&[utc_time(not_before), utc_time(not_after)]);

    let mut tbs_fields = vec![
        Integer::from_i64(serial).encode_der(),
        sha256_with_rsa_alg_id(),
        rdn_sequence(issuer_cn),
        validity,
        rdn_sequence(subject_cn),
        spki,
    ];
    if let Some(ext) = ski_aki_extensions(ski, aki) {
        tbs_fields.push(ext);
    }
    let tbs_der = asn1::encode_sequence(&tbs_fields);

    let signing_key = SigningKey::<Sha256>::new(issuer_key.private.clone());
    let mut rng = rand::thread_rng();
    let signature = signing_key.sign_with_rng(&mut rng, &tbs_der).to_bytes().to_vec();

    asn1::encode_sequence(&[tbs_der, sha256_with_rsa_alg_id(), asn1::encode_bit_string(0, &signature)])
}

/// `AlgorithmIdentifier` for an RSA `SubjectPublicKeyInfo` (rsaEncryption +
/// NULL params) — distinct from the signature `AlgorithmIdentifier` above
/// only in which OID it carries.
fn sha256_with_rsa_alg_id_for_spki() -> Vec<u8> {
    asn1::encode_sequence(&[well_known::rsa_encryption().encode_der(), asn1::encode_null()])
}

/// A ready-to-use self-signed leaf/anchor certificate plus the key that
/// signed it, valid for a wide default window.
pub struct SelfSignedCert {
    pub der: Vec<u8>,
    pub key: TestKey,
}

pub fn self_signed(cn: &str, serial: i64) -> SelfSignedCert {
    let key = rsa_key(2048);
    let der = build_certificate(cn, cn, serial, &key, &key, "240101000000Z", "340101000000Z", None, None);
    SelfSignedCert { der, key }
}

/// Content-type + message-digest (+ optional signing-time / policy-id)
/// signed attributes, DER-encoded both as the `[0] IMPLICIT` SignerInfo
/// field and, separately, retagged as `SET OF` (the bytes actually signed —
/// see `icp_sign_core::cms` module docs).
struct SignedAttrs {
    implicit_der: Vec<u8>,
    retagged_der: Vec<u8>,
}

fn build_signed_attrs(content_digest: &[u8], signing_time: Option<&str>, policy_oid: Option<&str>) -> SignedAttrs {
    let mut attrs = vec![
        asn1::encode_sequence(&[
            well_known::content_type().encode_der(),
            asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &well_known::id_data().encode_der()),
        ]),
        asn1::encode_sequence(&[
            well_known::message_digest().encode_der(),
            asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &asn1::encode_octet_string(content_digest)),
        ]),
    ];
    if let Some(t) = signing_time {
        attrs.push(asn1::encode_sequence(&[
            well_known::signing_time().encode_der(),
            asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &utc_time(t)),
        ]));
    }
    if let Some(oid) = policy_oid {
        let policy_id = asn1::encode_sequence(&[Oid::from_str_dotted(oid).unwrap().encode_der()]);
        attrs.push(asn1::encode_sequence(&[
            well_known::signature_policy_identifier().encode_der(),
            asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &policy_id),
        ]));
    }
    let attrs_seq_content = attrs.concat();
    let implicit_der = asn1::encode_context_implicit(0, &attrs_seq_content);
    let retagged_der = asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &attrs_seq_content);
    SignedAttrs { implicit_der, retagged_der }
}

/// Build a detached CMS `SignedData` (PKCS#7) over `content`, signed with
/// `signer_key`/`signer_cert_der`, carrying `signer_cert_der` in the
/// `certificates` set so a pool-free validator call can resolve it.
pub fn build_signed_cms(content: &[u8], signer_key: &TestKey, signer_cert_der: &[u8], signing_time: Option<&str>, policy_oid: Option<&str>) -> Vec<u8> {
    let digest = Sha256::digest(content).to_vec();
    let attrs = build_signed_attrs(&digest, signing_time, policy_oid);

    let signing_key = SigningKey::<Sha256>::new(signer_key.private.clone());
    let mut rng = rand::thread_rng();
    let signature = signing_key.sign_with_rng(&mut rng, &attrs.retagged_der).to_bytes().to_vec();

    let (cert_node, _) = asn1::decode_tlv(signer_cert_der, 0).unwrap();
    let issuer_and_serial = {
        let fields = cert_node.as_sequence().unwrap();
        let tbs = fields[0].as_sequence().unwrap();
        let serial = tbs[0].clone();
        let issuer = tbs[2].clone();
        asn1::encode_sequence(&[
            asn1::encode_tlv(issuer.tag.class, issuer.tag.constructed, issuer.tag.number, issuer.content),
            asn1::encode_tlv(serial.tag.class, serial.tag.constructed, serial.tag.number, serial.content),
        ])
    };

    let signer_info = asn1::encode_sequence(&[
        Integer::from_i64(1).encode_der(),
        issuer_and_serial,
        asn1::encode_sequence(&[well_known::sha256().encode_der(), asn1::encode_null()]),
        attrs.implicit_der,
        sha256_with_rsa_alg_id(),
        asn1::encode_octet_string(&signature),
    ]);

    let signed_data = asn1::encode_sequence(&[
        Integer::from_i64(1).encode_der(),
        asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, &asn1::encode_sequence(&[well_known::sha256().encode_der(), asn1::encode_null()])),
        asn1::encode_sequence(&[well_known::id_data().encode_der()]),
        asn1::encode_context_explicit(0, &cert_node_der(signer_cert_der)),
        signer_info_set(&signer_info),
    ]);

    asn1::encode_sequence(&[well_known::id_signed_data().encode_der(), asn1::encode_context_explicit(0, &signed_data)])
}

fn cert_node_der(cert_der: &[u8]) -> Vec<u8> {
    cert_der.to_vec()
}

fn signer_info_set(signer_info_der: &[u8]) -> Vec<u8> {
    asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SET, signer_info_der)
}

/// A `CertID` matching the `CertID` RFC 6960 structure
/// (`icp_sign_core::revocation::ocsp::CertId`, not exposed publicly), built
/// directly from the same two certs the crate itself would hash.
fn ocsp_cert_id_der(leaf_der: &[u8], issuer_der: &[u8]) -> Vec<u8> {
    use sha1::{Digest, Sha1};

    let (leaf_node, _) = asn1::decode_tlv(leaf_der, 0).unwrap();
    let leaf_fields = leaf_node.as_sequence().unwrap();
    let leaf_tbs = leaf_fields[0].as_sequence().unwrap();
    let leaf_issuer_name = &leaf_tbs[2];
    let leaf_serial = &leaf_tbs[0];

    let (issuer_node, _) = asn1::decode_tlv(issuer_der, 0).unwrap();
    let issuer_fields = issuer_node.as_sequence().unwrap();
    let issuer_tbs = issuer_fields[0].as_sequence().unwrap();
    let issuer_spki = &issuer_tbs[5];
    let issuer_key_bytes = {
        let spki_fields = issuer_spki.as_sequence().unwrap();
        let (_, bits) = spki_fields[1].as_bit_string().unwrap();
        bits.to_vec()
    };

    let issuer_name_der = asn1::encode_tlv(asn1::Class::Universal, true, asn1::TAG_SEQUENCE, leaf_issuer_name.content);
    let issuer_name_hash = Sha1::digest(&issuer_name_der).to_vec();
    let issuer_key_hash = Sha1::digest(&issuer_key_bytes).to_vec();

    let alg = asn1::encode_sequence(&[well_known::sha1().encode_der(), asn1::encode_null()]);
    asn1::encode_sequence(&[
        alg,
        asn1::encode_octet_string(&issuer_name_hash),
        asn1::encode_octet_string(&issuer_key_hash),
        asn1::encode_tlv(leaf_serial.tag.class, leaf_serial.tag.constructed, leaf_serial.tag.number, leaf_serial.content),
    ])
}

/// Build a DER `OCSPResponse` with `responseStatus = successful` wrapping a
/// single-entry `BasicOCSPResponse`, signed by `responder_key` (the same key
/// as `issuer_der`'s subject key, i.e. the issuer answering for its own
/// leaf). `revoked` selects between `CertStatus.good` and
/// `CertStatus.revoked` (with `reason = keyCompromise`).
pub fn build_ocsp_response(leaf_der: &[u8], issuer_der: &[u8], responder_key: &TestKey, this_update: &str, revoked_at: Option<&str>) -> Vec<u8> {
    use sha1::{Digest, Sha1};

    let cert_id = ocsp_cert_id_der(leaf_der, issuer_der);

    let cert_status = match revoked_at {
        None => asn1::encode_context_implicit(0, &[]),
        Some(at) => {
            let reason = asn1::encode_context_explicit(0, &[1]); // CRLReason keyCompromise = 1
            let revoked_info_content = [utc_time_generalized(at), reason].concat();
            asn1::encode_context_implicit(1, &revoked_info_content)
        },
    };

    let single_response = asn1::encode_sequence(&[cert_id, cert_status, utc_time_generalized(this_update)]);
    let responses = asn1::encode_sequence(&[single_response]);

    let issuer_key_hash = Sha1::digest(&rsa_spki_key_bytes(&responder_key.public)).to_vec();
    let responder_id = asn1::encode_context_explicit(2, &asn1::encode_octet_string(&issuer_key_hash));

    let tbs_response_data = asn1::encode_sequence(&[responder_id, utc_time_generalized(this_update), responses]);

    let signing_key = SigningKey::<Sha256>::new(responder_key.private.clone());
    let mut rng = rand::thread_rng();
    let signature = signing_key.sign_with_rng(&mut rng, &tbs_response_data).to_bytes().to_vec();

    let basic_response = asn1::encode_sequence(&[tbs_response_data, sha256_with_rsa_alg_id(), asn1::encode_bit_string(0, &signature)]);

    let response_bytes = asn1::encode_sequence(&[well_known::id_pkix_ocsp_basic().encode_der(), asn1::encode_octet_string(&basic_response)]);

    let successful = asn1::encode_tlv(asn1::Class::Universal, false, 10, &[0]); // ENUMERATED successful = 0
    asn1::encode_sequence(&[successful, asn1::encode_context_explicit(0, &response_bytes)])
}

fn utc_time_generalized(s: &str) -> Vec<u8> {
    asn1::encode_tlv(asn1::Class::Universal, false, asn1::TAG_GENERALIZED_TIME, s.as_bytes())
}

/// Build a minimal one-page PDF with a classic xref table, mirroring
/// `pdf::preparer`'s own test fixture so byte offsets line up exactly.
pub fn minimal_pdf() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.7\n");
    let off1 = buf.len();
    buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    let off2 = buf.len();
    buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
    let off3 = buf.len();
    buf.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n");
    let xref_offset = buf.len();
    buf.extend_from_slice(b"xref\n0 4\n");
    buf.extend_from_slice(b"0000000000 65535 f \n");
    buf.extend_from_slice(format!("{off1:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(format!("{off2:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(format!("{off3:010} 00000 n \n").as_bytes());
    buf.extend_from_slice(b"trailer\n<< /Size 4 /Root 1 0 R >>\n");
    buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
    buf
}
