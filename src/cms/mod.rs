//! CMS `SignedData` (PKCS#7) parser and verifier (C4).
//!
//! Parses `ContentInfo`/`SignedData` (RFC 5652), the signed/unsigned
//! attribute sets, and verifies each `SignerInfo` against a supplied
//! certificate pool. The one load-bearing subtlety this module owns: when
//! signed attributes are present, the bytes actually covered by the
//! signature are the DER re-encoding of the signed-attrs set with its outer
//! tag rewritten to `SET OF` (0x31) — never the `[0] IMPLICIT` form as it
//! appears in the SignerInfo DER (spec.md §3, §4.4).

pub mod tstinfo;

pub use tstinfo::TstInfo;

use crate::asn1::oid::well_known;
use crate::asn1::{self, Class, Integer, Node, Oid, TAG_SEQUENCE, TAG_SET};
use crate::crypto::{self, DigestAlgorithm};
use crate::error::{Error, Result};
use crate::x509::{self, CrlFile, Name, X509Certificate};
use chrono::{DateTime, Utc};

/// A CMS `Attribute`: its type OID and the raw DER of each value in its
/// `attrValues` SET, kept as owned bytes (independent of the decode
/// lifetime) so `CmsSignedData` can outlive the buffer it was parsed from.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub oid: Oid,
    pub raw_values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn single_value(&self) -> Option<&[u8]> {
        self.raw_values.first().map(Vec::as_slice)
    }
}

fn parse_attributes(node: &Node<'_>) -> Result<Vec<Attribute>> {
    let mut out = Vec::new();
    for attr_node in node.children()? {
        let fields = attr_node.as_sequence()?;
        if fields.len() != 2 {
            return Err(Error::Asn1NonCanonical {
                offset: attr_node.span.0,
                reason: "Attribute must have exactly 2 fields".into(),
            });
        }
        let oid = fields[0].as_oid()?;
        let mut raw_values = Vec::new();
        for v in fields[1].as_set()? {
            raw_values.push(asn1::encode_tlv(v.tag.class, v.tag.constructed, v.tag.number, v.content));
        }
        out.push(Attribute { oid, raw_values });
    }
    Ok(out)
}

fn find_attr<'a>(attrs: &'a [Attribute], oid: &Oid) -> Option<&'a Attribute> {
    attrs.iter().find(|a| &a.oid == oid)
}

#[derive(Debug, Clone)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber { issuer: Name, serial: Integer },
    SubjectKeyIdentifier(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct SignaturePolicyId {
    pub policy_oid: Oid,
    pub hash: Option<(Oid, Vec<u8>)>,
}

#[derive(Debug, Clone)]
pub struct SignerInfo {
    pub version: i64,
    pub sid: SignerIdentifier,
    pub digest_algorithm: Oid,
    pub signed_attrs: Option<Vec<Attribute>>,
    /// DER of the signed-attrs set re-tagged as `SET OF` (see module docs);
    /// `None` when there are no signed attributes at all.
    pub signed_attrs_retagged_der: Option<Vec<u8>>,
    pub signature_algorithm: Oid,
    pub signature_algorithm_params: Option<Vec<u8>>,
    pub signature: Vec<u8>,
    pub unsigned_attrs: Vec<Attribute>,
}

impl SignerInfo {
    pub fn content_type(&self) -> Option<Oid> {
        let a = find_attr(self.signed_attrs.as_ref()?, &well_known::content_type())?;
        let (node, _) = asn1::decode_tlv(a.single_value()?, 0).ok()?;
        node.as_oid().ok()
    }

    pub fn message_digest(&self) -> Option<Vec<u8>> {
        let a = find_attr(self.signed_attrs.as_ref()?, &well_known::message_digest())?;
        let (node, _) = asn1::decode_tlv(a.single_value()?, 0).ok()?;
        node.as_octet_string().ok().map(<[u8]>::to_vec)
    }

    pub fn signing_time(&self) -> Option<DateTime<Utc>> {
        let a = find_attr(self.signed_attrs.as_ref()?, &well_known::signing_time())?;
        let (node, _) = asn1::decode_tlv(a.single_value()?, 0).ok()?;
        node.as_time().ok()
    }

    /// `signature-policy-identifier`, covering both `signaturePolicyId`
    /// (returned) and the NULL `signaturePolicyImplied` choice (`None`).
    pub fn policy_id(&self) -> Option<SignaturePolicyId> {
        let a = find_attr(self.signed_attrs.as_ref()?, &well_known::signature_policy_identifier())?;
        let (node, _) = asn1::decode_tlv(a.single_value()?, 0).ok()?;
        if node.tag.number == crate::asn1::TAG_NULL {
            return None;
        }
        let fields = node.as_sequence().ok()?;
        let policy_oid = fields.first()?.as_oid().ok()?;
        let hash = fields.get(1).and_then(|h| {
            let hf = h.as_sequence().ok()?;
            let (alg, _) = x509::parse_algorithm_identifier(hf.first()?).ok()?;
            let val = hf.get(1)?.as_octet_string().ok()?.to_vec();
            Some((alg, val))
        });
        Some(SignaturePolicyId { policy_oid, hash })
    }

    pub fn timestamp_token_der(&self) -> Option<Vec<u8>> {
        find_attr(&self.unsigned_attrs, &well_known::signature_time_stamp_token())
            .and_then(|a| a.single_value())
            .map(<[u8]>::to_vec)
    }
}

#[derive(Debug, Clone)]
pub struct CmsSignedData {
    /// `encapContentInfo.eContentType`.
    pub content_type: Oid,
    /// `encapContentInfo.eContent`; `None` for detached signatures (the
    /// universal PAdES/ICP-Brasil shape — the PDF ByteRange bytes are the
    /// content, supplied externally to `verify_signer`).
    pub encap_content: Option<Vec<u8>>,
    pub digest_algorithms: Vec<Oid>,
    pub certificates: Vec<X509Certificate>,
    pub crls: Vec<CrlFile>,
    pub signer_infos: Vec<SignerInfo>,
}

impl CmsSignedData {
    pub fn parse(der: &[u8]) -> Result<Self> {
        let (top, _) = asn1::decode_tlv(der, 0)?;
        let ci_fields = top.as_sequence()?;
        if ci_fields.len() != 2 {
            return Err(Error::Asn1NonCanonical { offset: top.span.0, reason: "ContentInfo must have 2 fields".into() });
        }
        let content_type = ci_fields[0].as_oid()?;
        if content_type != well_known::id_signed_data() {
            return Err(Error::CmsUnsupportedAlgorithm(format!("ContentInfo.contentType {content_type} is not id-signedData")));
        }
        let content_node = ci_fields[1].explicit_inner()?;
        let sd_fields = content_node.as_sequence()?;
        let mut idx = 0;

        let _version = sd_fields[idx].as_integer()?;
        idx += 1;
        let digest_algorithms = sd_fields[idx]
            .as_set()?
            .iter()
            .map(|n| x509::parse_algorithm_identifier(n).map(|(o, _)| o))
            .collect::<Result<Vec<_>>>()?;
        idx += 1;

        let eci_fields = sd_fields[idx].as_sequence()?;
        idx += 1;
        let e_content_type = eci_fields[0].as_oid()?;
        let encap_content = match eci_fields.get(1) {
            Some(wrapper) => Some(wrapper.explicit_inner()?.as_octet_string()?.to_vec()),
            None => None,
        };

        let mut certificates = Vec::new();
        let mut crls = Vec::new();
        let mut signer_infos_node: Option<&Node<'_>> = None;
        for field in &sd_fields[idx..] {
            match field.context_number() {
                Some(0) => {
                    for c in field.children()? {
                        if c.tag.class == crate::asn1::Class::Universal && c.tag.number == TAG_SEQUENCE {
                            let der = asn1::encode_tlv(Class::Universal, true, TAG_SEQUENCE, c.content);
                            if let Ok(cert) = X509Certificate::parse(&der) {
                                certificates.push(cert);
                            }
                        }
                        // Other CertificateChoices variants (v1/v2 attribute
                        // certificates, "other" certs) are not used by any
                        // ICP-Brasil PAdES profile and are skipped.
                    }
                },
                Some(1) => {
                    for c in field.children()? {
                        let der = asn1::encode_tlv(Class::Universal, true, TAG_SEQUENCE, c.content);
                        if let Ok(crl) = CrlFile::parse(&der) {
                            crls.push(crl);
                        }
                    }
                },
                None => signer_infos_node = Some(field),
                _ => {},
            }
        }
        let signer_infos_node = signer_infos_node.ok_or_else(|| Error::Asn1NonCanonical {
            offset: top.span.0,
            reason: "SignedData is missing signerInfos".into(),
        })?;
        let signer_infos = signer_infos_node.as_set()?.iter().map(parse_signer_info).collect::<Result<Vec<_>>>()?;

        Ok(CmsSignedData { content_type: e_content_type, encap_content, digest_algorithms, certificates, crls, signer_infos })
    }
}

fn parse_signer_info(node: &Node<'_>) -> Result<SignerInfo> {
    let fields = node.as_sequence()?;
    let mut idx = 0;
    let version = fields[idx].as_integer()?.as_i64().unwrap_or(1);
    idx += 1;

    let sid = match fields[idx].context_number() {
        Some(0) => SignerIdentifier::SubjectKeyIdentifier(fields[idx].content.to_vec()),
        None => {
            let ias = fields[idx].as_sequence()?;
            if ias.len() != 2 {
                return Err(Error::Asn1NonCanonical {
                    offset: fields[idx].span.0,
                    reason: "IssuerAndSerialNumber must have 2 fields".into(),
                });
            }
            SignerIdentifier::IssuerAndSerialNumber { issuer: Name::parse(&ias[0])?, serial: ias[1].as_integer()? }
        },
        _ => {
            return Err(Error::Asn1TagMismatch { expected: "SignerIdentifier".into(), found: "other".into() });
        },
    };
    idx += 1;

    let (digest_algorithm, _) = x509::parse_algorithm_identifier(&fields[idx])?;
    idx += 1;

    let mut signed_attrs = None;
    let mut signed_attrs_retagged_der = None;
    if idx < fields.len() && fields[idx].context_number() == Some(0) {
        signed_attrs = Some(parse_attributes(&fields[idx])?);
        signed_attrs_retagged_der = Some(asn1::retag_as_set_of(fields[idx].content));
        idx += 1;
    }

    let (signature_algorithm, signature_algorithm_params) = x509::parse_algorithm_identifier(&fields[idx])?;
    idx += 1;
    let signature = fields[idx].as_octet_string()?.to_vec();
    idx += 1;

    let mut unsigned_attrs = Vec::new();
    if idx < fields.len() && fields[idx].context_number() == Some(1) {
        unsigned_attrs = parse_attributes(&fields[idx])?;
    }

    Ok(SignerInfo {
        version,
        sid,
        digest_algorithm,
        signed_attrs,
        signed_attrs_retagged_der,
        signature_algorithm,
        signature_algorithm_params,
        signature,
        unsigned_attrs,
    })
}

fn describe_sid(sid: &SignerIdentifier) -> String {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber { issuer, serial } => format!("issuer={issuer}, serial={serial}"),
        SignerIdentifier::SubjectKeyIdentifier(ski) => format!("ski={}", ski.iter().map(|b| format!("{b:02x}")).collect::<String>()),
    }
}

pub fn find_signer_cert<'a>(signer: &SignerInfo, pool: &'a [X509Certificate]) -> Option<&'a X509Certificate> {
    match &signer.sid {
        SignerIdentifier::IssuerAndSerialNumber { issuer, serial } => {
            pool.iter().find(|c| &c.issuer == issuer && &c.serial == serial)
        },
        SignerIdentifier::SubjectKeyIdentifier(ski) => pool.iter().find(|c| c.subject_key_identifier().as_deref() == Some(ski.as_slice())),
    }
}

/// Outcome of verifying one `SignerInfo` against a resolved certificate.
#[derive(Debug, Clone)]
pub struct SignerVerification {
    pub signer_cert: X509Certificate,
    /// `message-digest` (or, absent signed attrs, the raw content digest)
    /// matches the actual content digest.
    pub byte_range_digest_ok: bool,
    pub signature_valid: bool,
}

/// Verify one `SignerInfo`: locate its certificate in `cert_pool`, check the
/// `message-digest` signed attribute (or the bare content, if there are no
/// signed attributes) against `content`, and verify the CMS signature.
///
/// `content` is the encapsulated content when present, or the externally
/// supplied detached content (the PDF's `/ByteRange` bytes) otherwise.
pub fn verify_signer(signer: &SignerInfo, content: &[u8], cert_pool: &[X509Certificate]) -> Result<SignerVerification> {
    let signer_cert = find_signer_cert(signer, cert_pool).ok_or_else(|| Error::CmsSignerNotFound(describe_sid(&signer.sid)))?.clone();

    let digest_alg = DigestAlgorithm::from_oid(&signer.digest_algorithm)
        .ok_or_else(|| Error::CmsUnsupportedAlgorithm(signer.digest_algorithm.to_string()))?;

    let (message_to_verify, byte_range_digest_ok) = match &signer.signed_attrs {
        Some(_) => {
            let message_digest = signer.message_digest().ok_or(Error::CmsNoMessageDigest)?;
            if signer.content_type().is_none() {
                return Err(Error::CmsNoMessageDigest);
            }
            let computed = digest_alg.digest(content);
            let ok = computed == message_digest;
            let retagged = signer.signed_attrs_retagged_der.clone().ok_or(Error::CmsNoMessageDigest)?;
            (retagged, ok)
        },
        None => (content.to_vec(), true),
    };

    let signature_valid = crypto::verify(
        &signer.signature_algorithm,
        signer.signature_algorithm_params.as_deref(),
        Some(&signer.digest_algorithm),
        &message_to_verify,
        &signer.signature,
        &signer_cert.spki,
    );

    Ok(SignerVerification { signer_cert, byte_range_digest_ok, signature_valid })
}

/// Parse and verify an embedded RFC 3161 timestamp token (itself a CMS
/// `SignedData` whose encapsulated content is `TSTInfo`), recursing through
/// [`verify_signer`] exactly like any other CMS signature.
pub fn verify_timestamp_token(token_der: &[u8]) -> Result<(TstInfo, SignerVerification)> {
    let cms = CmsSignedData::parse(token_der)?;
    if cms.content_type != well_known::id_ct_tst_info() {
        return Err(Error::CmsUnsupportedAlgorithm("timestamp token eContentType is not id-ct-tst-info".into()));
    }
    let content = cms.encap_content.as_deref().ok_or(Error::TimestampInvalid)?;
    let tst_info = TstInfo::parse(content)?;
    let signer = cms.signer_infos.first().ok_or_else(|| Error::CmsSignerNotFound("timestamp token has no signerInfos".into()))?;
    let verification = verify_signer(signer, content, &cms.certificates)?;
    Ok((tst_info, verification))
}
