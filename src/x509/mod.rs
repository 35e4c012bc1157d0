//! X.509 certificate model: parses the `Certificate` SEQUENCE into
//! typed subject/issuer/validity/public-key/extension views, keeping the
//! exact `tbs_der` bytes needed to verify this certificate's own signature
//! against its issuer, and to match issuer/subject relationships on
//! DER-canonical bytes rather than on any textual rendering.

pub mod crl;
pub mod extensions;
pub mod name;

pub use crl::CrlFile;
pub use extensions::{Extension, Extensions};
pub use name::Name;

use crate::asn1::oid::well_known;
use crate::asn1::{Class, Integer, Node, Oid, TAG_SEQUENCE};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: Oid,
    pub params: Option<Vec<u8>>,
    /// Raw bit-string payload (the DER-encoded key material: an RSA
    /// `RSAPublicKey` SEQUENCE, or an EC point in SEC1 uncompressed form).
    pub key_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct X509Certificate {
    /// Full Certificate DER, as seen on the wire (for re-export/embedding).
    pub der: Vec<u8>,
    /// Byte-exact `tbsCertificate` DER, required to verify this certificate's
    /// signature against its issuer's public key.
    pub tbs_der: Vec<u8>,
    pub subject: Name,
    pub issuer: Name,
    pub serial: Integer,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub spki: SubjectPublicKeyInfo,
    pub sig_alg: Oid,
    pub sig_params: Option<Vec<u8>>,
    pub sig_bits: Vec<u8>,
    pub extensions: Extensions,
}

impl X509Certificate {
    pub fn parse(der: &[u8]) -> Result<Self> {
        let (top, _) = crate::asn1::decode_tlv(der, 0)?;
        top.expect_universal(TAG_SEQUENCE)?;
        let fields = top.as_sequence()?;
        if fields.len() != 3 {
            return Err(Error::Asn1NonCanonical {
                offset: top.span.0,
                reason: "Certificate must have exactly 3 top-level fields".into(),
            });
        }
        let tbs_node = &fields[0];
        let tbs_der = crate::asn1::encode_tlv(Class::Universal, true, TAG_SEQUENCE, tbs_node.content);

        let (sig_alg, sig_params) = parse_algorithm_identifier(&fields[1])?;
        let (_, sig_bits) = fields[2].as_bit_string()?;

        let tbs_fields = tbs_node.as_sequence()?;
        let mut idx = 0;
        if tbs_fields[idx].context_number() == Some(0) {
            idx += 1; // version [0] EXPLICIT, skipped (defaults to v1)
        }
        let serial = tbs_fields[idx].as_integer()?;
        idx += 1;
        idx += 1; // signature AlgorithmIdentifier (duplicate of outer, unused)
        let issuer = Name::parse(&tbs_fields[idx])?;
        idx += 1;
        let validity = tbs_fields[idx].as_sequence()?;
        if validity.len() != 2 {
            return Err(Error::Asn1NonCanonical {
                offset: tbs_fields[idx].span.0,
                reason: "Validity must have exactly 2 fields".into(),
            });
        }
        let not_before = validity[0].as_time()?;
        let not_after = validity[1].as_time()?;
        idx += 1;
        let subject = Name::parse(&tbs_fields[idx])?;
        idx += 1;
        let spki = parse_spki(&tbs_fields[idx])?;
        idx += 1;

        let mut extensions = Extensions::new();
        for remaining in &tbs_fields[idx..] {
            if remaining.context_number() == Some(3) {
                let inner = remaining.explicit_inner()?;
                extensions = extensions::parse_extensions(&inner)?;
            }
            // [1] issuerUniqueID / [2] subjectUniqueID are ignored: not used
            // by this crate's chain/policy/report logic.
        }

        Ok(X509Certificate {
            der: der.to_vec(),
            tbs_der,
            subject,
            issuer,
            serial,
            not_before,
            not_after,
            spki,
            sig_alg,
            sig_params,
            sig_bits,
            extensions,
        })
    }

    pub fn get_extension(&self, oid: &Oid) -> Option<&Extension> {
        self.extensions.get(oid)
    }

    pub fn subject_key_identifier(&self) -> Option<Vec<u8>> {
        let ext = self.get_extension(&well_known::ext_subject_key_identifier())?;
        extensions::subject_key_identifier(ext).ok()
    }

    pub fn authority_key_identifier(&self) -> Option<Vec<u8>> {
        let ext = self.get_extension(&well_known::ext_authority_key_identifier())?;
        extensions::authority_key_identifier(ext).ok().flatten()
    }

    pub fn basic_constraints(&self) -> extensions::BasicConstraints {
        self.get_extension(&well_known::ext_basic_constraints())
            .and_then(|e| extensions::basic_constraints(e).ok())
            .unwrap_or_default()
    }

    pub fn key_usage(&self) -> Option<extensions::KeyUsage> {
        self.get_extension(&well_known::ext_key_usage())
            .and_then(|e| extensions::key_usage(e).ok())
    }

    pub fn crl_distribution_point_uris(&self) -> Vec<String> {
        self.get_extension(&well_known::ext_crl_distribution_points())
            .and_then(|e| extensions::crl_distribution_point_uris(e).ok())
            .unwrap_or_default()
    }

    pub fn authority_info_access(&self) -> extensions::AuthorityInfoAccess {
        self.get_extension(&well_known::ext_authority_info_access())
            .and_then(|e| extensions::authority_info_access(e).ok())
            .unwrap_or_default()
    }

    pub fn icp_brasil_identity(&self) -> extensions::IcpBrasilIdentity {
        self.get_extension(&well_known::ext_subject_alt_name())
            .and_then(|e| extensions::subject_alt_name_icp_brasil(e).ok())
            .unwrap_or_default()
    }

    /// Approximate public key size in bits, used by the policy engine's
    /// minimum-key-length constraint.
    pub fn public_key_bits(&self) -> usize {
        if self.spki.algorithm == well_known::id_ec_public_key() {
            // SEC1 uncompressed point: 1 tag byte + 2*field-size.
            return ((self.spki.key_bytes.len().saturating_sub(1)) / 2) * 8;
        }
        // RSA: RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }
        if let Ok((node, _)) = crate::asn1::decode_tlv(&self.spki.key_bytes, 0) {
            if let Ok(fields) = node.as_sequence() {
                if let Some(modulus) = fields.first().and_then(|f| f.as_integer().ok()) {
                    return modulus.to_unsigned_bytes_be().len() * 8;
                }
            }
        }
        0
    }

    pub fn is_valid_at(&self, t: DateTime<Utc>) -> bool {
        self.not_before <= t && t <= self.not_after
    }
}

pub fn parse_algorithm_identifier(node: &Node<'_>) -> Result<(Oid, Option<Vec<u8>>)> {
    let fields = node.as_sequence()?;
    if fields.is_empty() {
        return Err(Error::Asn1NonCanonical {
            offset: node.span.0,
            reason: "AlgorithmIdentifier requires at least an algorithm OID".into(),
        });
    }
    let oid = fields[0].as_oid()?;
    let params = fields.get(1).map(|p| {
        crate::asn1::encode_tlv(
            match p.tag.class {
                crate::asn1::Class::Universal => Class::Universal,
                crate::asn1::Class::ContextSpecific => Class::ContextSpecific,
                crate::asn1::Class::Application => Class::Application,
                crate::asn1::Class::Private => Class::Private,
            },
            p.tag.constructed,
            p.tag.number,
            p.content,
        )
    });
    Ok((oid, params))
}

fn parse_spki(node: &Node<'_>) -> Result<SubjectPublicKeyInfo> {
    let fields = node.as_sequence()?;
    if fields.len() != 2 {
        return Err(Error::Asn1NonCanonical {
            offset: node.span.0,
            reason: "SubjectPublicKeyInfo must have exactly 2 fields".into(),
        });
    }
    let (algorithm, params) = parse_algorithm_identifier(&fields[0])?;
    let (_, key_bytes) = fields[1].as_bit_string()?;
    Ok(SubjectPublicKeyInfo { algorithm, params, key_bytes: key_bytes.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_identifier_without_params() {
        let der = crate::asn1::encode_sequence(&[well_known::sha256().encode_der()]);
        let (node, _) = crate::asn1::decode_tlv(&der, 0).unwrap();
        let (oid, params) = parse_algorithm_identifier(&node).unwrap();
        assert_eq!(oid, well_known::sha256());
        assert!(params.is_none());
    }
}
