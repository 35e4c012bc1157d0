//! OCSP (RFC 6960) request building and `BasicOCSPResponse` parsing/verification.
//!
//! The OCSP ASN.1 module is defined `DEFINITIONS EXPLICIT TAGS`, so every
//! `[n]`-tagged field here (responder ID, `CertStatus.revoked`'s reason,
//! `nextUpdate`) is unwrapped with [`crate::asn1::Node::explicit_inner`] —
//! the one exception is `CertStatus` itself, whose three branches the RFC
//! text overrides to IMPLICIT, so `good`/`revoked`/`unknown` are read
//! straight off the context tag without an extra unwrap.

use crate::asn1::oid::well_known;
use crate::asn1::{self, Class, Integer, Node, Oid, TAG_SEQUENCE};
use crate::crypto;
use crate::error::{Error, Result};
use crate::x509::{self, Name, X509Certificate};
use chrono::{DateTime, Duration, Utc};
use sha1::{Digest, Sha1};

use super::RevocationStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct CertId {
    pub hash_algorithm: Oid,
    pub issuer_name_hash: Vec<u8>,
    pub issuer_key_hash: Vec<u8>,
    pub serial: Integer,
}

impl CertId {
    fn encode_der(&self) -> Vec<u8> {
        let alg = asn1::encode_sequence(&[self.hash_algorithm.encode_der(), asn1::encode_null()]);
        asn1::encode_sequence(&[
            alg,
            asn1::encode_octet_string(&self.issuer_name_hash),
            asn1::encode_octet_string(&self.issuer_key_hash),
            self.serial.encode_der(),
        ])
    }

    fn matches(&self, other: &CertId) -> bool {
        self.issuer_name_hash == other.issuer_name_hash
            && self.issuer_key_hash == other.issuer_key_hash
            && self.serial == other.serial
    }
}

/// Build the `CertID` RFC 6960 requires: SHA-1 of the issuer's `Name` DER,
/// SHA-1 of the issuer's public key bit-string payload, and the subject
/// certificate's serial.
fn build_cert_id(cert: &X509Certificate, issuer: &X509Certificate) -> CertId {
    CertId {
        hash_algorithm: well_known::sha1(),
        issuer_name_hash: Sha1::digest(cert.issuer.der_bytes()).to_vec(),
        issuer_key_hash: Sha1::digest(&issuer.spki.key_bytes).to_vec(),
        serial: cert.serial.clone(),
    }
}

/// Build a DER `OCSPRequest` containing a single `Request` (no
/// `requestorName`, no extensions — every ICP-Brasil responder observed
/// accepts the minimal form).
pub fn build_request(cert: &X509Certificate, issuer: &X509Certificate) -> Vec<u8> {
    let cert_id = build_cert_id(cert, issuer);
    let request = asn1::encode_sequence(&[cert_id.encode_der()]);
    let request_list = asn1::encode_sequence(&[request]);
    let tbs_request = asn1::encode_sequence(&[request_list]);
    asn1::encode_sequence(&[tbs_request])
}

#[derive(Debug, Clone, PartialEq)]
enum SingleCertStatus {
    Good,
    Revoked { at: DateTime<Utc>, reason: Option<String> },
    Unknown,
}

#[derive(Debug, Clone)]
struct SingleResponse {
    cert_id: CertId,
    status: SingleCertStatus,
    this_update: DateTime<Utc>,
    next_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
enum ResponderId {
    ByName(Name),
    ByKey(Vec<u8>),
}

#[derive(Debug, Clone)]
struct BasicOcspResponse {
    tbs_der: Vec<u8>,
    responder_id: ResponderId,
    responses: Vec<SingleResponse>,
    certs: Vec<X509Certificate>,
    sig_alg: Oid,
    sig_bits: Vec<u8>,
}

enum ParsedResponse {
    Successful(BasicOcspResponse),
    Unsuccessful(u8),
}

fn parse_response(der: &[u8]) -> Result<ParsedResponse> {
    let (top, _) = asn1::decode_tlv(der, 0)?;
    let fields = top.as_sequence()?;
    let status = fields[0].content.first().copied().unwrap_or(0xff);
    if status != 0 {
        return Ok(ParsedResponse::Unsuccessful(status));
    }
    let response_bytes = fields.get(1).ok_or_else(|| Error::Asn1NonCanonical {
        offset: top.span.0,
        reason: "successful OCSPResponse is missing responseBytes".into(),
    })?;
    let rb = response_bytes.explicit_inner()?;
    let rb_fields = rb.as_sequence()?;
    let response_type = rb_fields[0].as_oid()?;
    if response_type != well_known::id_pkix_ocsp_basic() {
        return Err(Error::CmsUnsupportedAlgorithm(format!("OCSP responseType {response_type} is not id-pkix-ocsp-basic")));
    }
    let response_octets = rb_fields[1].as_octet_string()?;
    Ok(ParsedResponse::Successful(parse_basic_response(response_octets)?))
}

fn parse_basic_response(der: &[u8]) -> Result<BasicOcspResponse> {
    let (top, _) = asn1::decode_tlv(der, 0)?;
    let fields = top.as_sequence()?;
    if fields.len() < 3 {
        return Err(Error::Asn1NonCanonical { offset: top.span.0, reason: "BasicOCSPResponse requires 3 fields".into() });
    }
    let tbs_node = &fields[0];
    let tbs_der = asn1::encode_tlv(Class::Universal, true, TAG_SEQUENCE, tbs_node.content);
    let (sig_alg, _) = x509::parse_algorithm_identifier(&fields[1])?;
    let (_, sig_bits) = fields[2].as_bit_string()?;

    let mut certs = Vec::new();
    for remaining in &fields[3..] {
        if remaining.context_number() == Some(0) {
            for c in remaining.explicit_inner()?.children()? {
                let der = asn1::encode_tlv(Class::Universal, true, TAG_SEQUENCE, c.content);
                if let Ok(cert) = X509Certificate::parse(&der) {
                    certs.push(cert);
                }
            }
        }
    }

    let tbs_fields = tbs_node.as_sequence()?;
    let mut idx = 0;
    if tbs_fields[idx].context_number() == Some(0) {
        idx += 1; // version [0] EXPLICIT, defaults to v1
    }
    let responder_id = parse_responder_id(&tbs_fields[idx])?;
    idx += 1;
    idx += 1; // producedAt, not needed beyond its presence
    let responses = tbs_fields[idx].as_sequence()?.iter().map(parse_single_response).collect::<Result<Vec<_>>>()?;

    Ok(BasicOcspResponse { tbs_der, responder_id, responses, certs, sig_alg, sig_bits: sig_bits.to_vec() })
}

fn parse_responder_id(node: &Node<'_>) -> Result<ResponderId> {
    match node.context_number() {
        Some(1) => Ok(ResponderId::ByName(Name::parse(&node.explicit_inner()?)?)),
        Some(2) => Ok(ResponderId::ByKey(node.explicit_inner()?.as_octet_string()?.to_vec())),
        _ => Err(Error::Asn1TagMismatch { expected: "ResponderID [1] or [2]".into(), found: "other".into() }),
    }
}

fn parse_single_response(node: &Node<'_>) -> Result<SingleResponse> {
    let fields = node.as_sequence()?;
    let cert_id = parse_cert_id(&fields[0])?;
    let status = parse_cert_status(&fields[1])?;
    let this_update = fields[2].as_generalized_time()?;
    let mut next_update = None;
    for remaining in &fields[3..] {
        if remaining.context_number() == Some(0) {
            next_update = Some(remaining.explicit_inner()?.as_generalized_time()?);
        }
    }
    Ok(SingleResponse { cert_id, status, this_update, next_update })
}

fn parse_cert_id(node: &Node<'_>) -> Result<CertId> {
    let fields = node.as_sequence()?;
    let (hash_algorithm, _) = x509::parse_algorithm_identifier(&fields[0])?;
    Ok(CertId {
        hash_algorithm,
        issuer_name_hash: fields[1].as_octet_string()?.to_vec(),
        issuer_key_hash: fields[2].as_octet_string()?.to_vec(),
        serial: fields[3].as_integer()?,
    })
}

fn parse_cert_status(node: &Node<'_>) -> Result<SingleCertStatus> {
    match node.context_number() {
        Some(0) => Ok(SingleCertStatus::Good),
        Some(1) => {
            // RevokedInfo is IMPLICIT: node.content is the RevokedInfo
            // SEQUENCE's own content, re-tag it as a universal SEQUENCE to
            // decode normally.
            let seq_der = asn1::encode_tlv(Class::Universal, true, TAG_SEQUENCE, node.content);
            let (seq_node, _) = asn1::decode_tlv(&seq_der, 0)?;
            let fields = seq_node.as_sequence()?;
            let at = fields[0].as_generalized_time()?;
            let reason = fields
                .get(1)
                .filter(|r| r.context_number() == Some(0))
                .and_then(|r| r.explicit_inner().ok())
                .and_then(|inner| inner.content.first().copied())
                .and_then(crl_reason_label);
            Ok(SingleCertStatus::Revoked { at, reason })
        },
        Some(2) => Ok(SingleCertStatus::Unknown),
        _ => Err(Error::Asn1TagMismatch { expected: "CertStatus [0]/[1]/[2]".into(), found: "other".into() }),
    }
}

fn crl_reason_label(code: u8) -> Option<String> {
    Some(
        match code {
            0 => "unspecified",
            1 => "keyCompromise",
            2 => "cACompromise",
            3 => "affiliationChanged",
            4 => "superseded",
            5 => "cessationOfOperation",
            6 => "certificateHold",
            8 => "removeFromCRL",
            9 => "privilegeWithdrawn",
            10 => "aACompromise",
            _ => "unknown",
        }
        .to_string(),
    )
}

/// Select the certificate whose key verifies the `BasicOCSPResponse`
/// signature, per spec.md §4.7: `byKey` SHA-1 match first, then `byName`
/// equality, then any certificate embedded in the response that itself
/// verifies against `issuer`, and finally `issuer` itself.
fn select_responder<'a>(basic: &'a BasicOcspResponse, issuer: &'a X509Certificate) -> &'a X509Certificate {
    match &basic.responder_id {
        ResponderId::ByKey(hash) => {
            if Sha1::digest(&issuer.spki.key_bytes).as_slice() == hash.as_slice() {
                return issuer;
            }
            if let Some(c) = basic.certs.iter().find(|c| Sha1::digest(&c.spki.key_bytes).as_slice() == hash.as_slice()) {
                return c;
            }
        },
        ResponderId::ByName(name) => {
            if &issuer.subject == name {
                return issuer;
            }
            if let Some(c) = basic.certs.iter().find(|c| &c.subject == name) {
                return c;
            }
        },
    }
    basic
        .certs
        .iter()
        .find(|c| crypto::verify(&c.sig_alg, c.sig_params.as_deref(), None, &c.tbs_der, &c.sig_bits, &issuer.spki))
        .unwrap_or(issuer)
}

/// Verify an OCSP response for `cert`/`issuer`: parse it, pick out the
/// `SingleResponse` matching the requested `CertID`, select and verify the
/// responder's signature, confirm the `thisUpdate`/`nextUpdate` window
/// (widened by `skew`), and classify the result.
///
/// Returns `Err(Error::OcspResponderUntrusted)` only when the
/// `BasicOCSPResponse` signature fails to verify against the selected
/// responder key — a forged response is a hard failure, never downgraded to
/// "unknown". `Err(Error::OcspOutOfWindow)` for a genuine, authentic
/// response that has simply gone stale.
pub fn check(cert: &X509Certificate, issuer: &X509Certificate, response_der: &[u8], at: DateTime<Utc>, skew: Duration) -> Result<RevocationStatus> {
    let basic = match parse_response(response_der)? {
        ParsedResponse::Successful(b) => b,
        ParsedResponse::Unsuccessful(_) => return Ok(RevocationStatus::Unknown),
    };

    let requested = build_cert_id(cert, issuer);
    let Some(single) = basic.responses.iter().find(|r| r.cert_id.matches(&requested)) else {
        return Ok(RevocationStatus::Unknown);
    };

    let responder_cert = select_responder(&basic, issuer);
    let sig_ok = crypto::verify(&basic.sig_alg, None, None, &basic.tbs_der, &basic.sig_bits, &responder_cert.spki);
    if !sig_ok {
        return Err(Error::OcspResponderUntrusted);
    }

    let in_window = at + skew >= single.this_update && single.next_update.map_or(true, |nu| at <= nu + skew);
    if !in_window {
        return Err(Error::OcspOutOfWindow);
    }

    Ok(match &single.status {
        SingleCertStatus::Good => RevocationStatus::Good,
        SingleCertStatus::Revoked { at, reason } => RevocationStatus::Revoked { at: Some(*at), reason: reason.clone() },
        SingleCertStatus::Unknown => RevocationStatus::Unknown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cert_id_matches_on_hash_and_serial_only() {
        let a = CertId {
            hash_algorithm: well_known::sha1(),
            issuer_name_hash: vec![1, 2, 3],
            issuer_key_hash: vec![4, 5, 6],
            serial: Integer::from_i64(7),
        };
        let b = a.clone();
        assert!(a.matches(&b));
    }

    #[test]
    fn unsuccessful_response_status_yields_unknown() {
        // OCSPResponse ::= SEQUENCE { responseStatus ENUMERATED(tryLater=3) }
        let enumerated = asn1::encode_tlv(Class::Universal, false, 10, &[3]);
        let der = asn1::encode_sequence(&[enumerated]);
        match parse_response(&der).unwrap() {
            ParsedResponse::Unsuccessful(code) => assert_eq!(code, 3),
            ParsedResponse::Successful(_) => panic!("expected unsuccessful"),
        }
    }
}
