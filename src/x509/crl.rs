//! X.509 CRL (Certificate Revocation List) model.

use super::extensions::{self, Extensions};
use super::name::Name;
use crate::asn1::{Integer, Node, Oid};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RevokedEntry {
    pub serial: Integer,
    pub revocation_date: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CrlFile {
    pub tbs_der: Vec<u8>,
    pub issuer: Name,
    pub this_update: DateTime<Utc>,
    pub next_update: Option<DateTime<Utc>>,
    pub revoked: Vec<RevokedEntry>,
    pub sig_alg: Oid,
    pub sig_bits: Vec<u8>,
}

const REASON_CODE_OID: &[u32] = &[2, 5, 29, 21];

impl CrlFile {
    pub fn parse(der: &[u8]) -> Result<Self> {
        let (top, _) = crate::asn1::decode_tlv(der, 0)?;
        let fields = top.as_sequence()?;
        if fields.len() != 3 {
            return Err(Error::Asn1NonCanonical {
                offset: top.span.0,
                reason: "CertificateList must have 3 fields".into(),
            });
        }
        let tbs_node = &fields[0];
        let tbs_der = crate::asn1::encode_tlv(
            crate::asn1::Class::Universal,
            true,
            crate::asn1::TAG_SEQUENCE,
            tbs_node.content,
        );

        let sig_alg_fields = fields[1].as_sequence()?;
        let sig_alg = sig_alg_fields[0].as_oid()?;
        let (_, sig_bits) = fields[2].as_bit_string()?;

        let tbs_fields = tbs_node.as_sequence()?;
        let mut idx = 0;
        // version is OPTIONAL INTEGER
        if tbs_fields[idx].tag.number == crate::asn1::TAG_INTEGER {
            idx += 1;
        }
        idx += 1; // signature AlgorithmIdentifier (repeated from outer)
        let issuer = Name::parse(&tbs_fields[idx])?;
        idx += 1;
        let this_update = tbs_fields[idx].as_time()?;
        idx += 1;
        let mut next_update = None;
        if idx < tbs_fields.len()
            && matches!(
                tbs_fields[idx].tag.number,
                crate::asn1::TAG_UTC_TIME | crate::asn1::TAG_GENERALIZED_TIME
            )
        {
            next_update = Some(tbs_fields[idx].as_time()?);
            idx += 1;
        }

        let mut revoked = Vec::new();
        if idx < tbs_fields.len() && tbs_fields[idx].tag.number == crate::asn1::TAG_SEQUENCE {
            for entry_node in tbs_fields[idx].as_sequence()? {
                let entry_fields = entry_node.as_sequence()?;
                let serial = entry_fields[0].as_integer()?;
                let revocation_date = entry_fields[1].as_time()?;
                let mut reason = None;
                if entry_fields.len() > 2 {
                    if let Ok(ext) = extensions::parse_extensions(&entry_fields[2]) {
                        if let Some(e) = ext.get(&Oid::from_arcs(REASON_CODE_OID.to_vec())) {
                            if let Ok((node, _)) = crate::asn1::decode_tlv(&e.octets, 0) {
                                reason = reason_label(&node);
                            }
                        }
                    }
                }
                revoked.push(RevokedEntry { serial, revocation_date, reason });
            }
            idx += 1;
        }
        let _ = idx; // crlExtensions [0] not needed beyond what's read above

        Ok(CrlFile { tbs_der, issuer, this_update, next_update, revoked, sig_alg, sig_bits })
    }

    pub fn find_serial(&self, serial: &Integer) -> Option<&RevokedEntry> {
        self.revoked.iter().find(|e| &e.serial == serial)
    }
}

fn reason_label(node: &Node<'_>) -> Option<String> {
    // CRLReason ::= ENUMERATED (tag 10)
    let code = node.content.first().copied()?;
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

/// The set of serials this CRL lists as revoked, as a fast lookup structure
/// when matching against many certificates.
pub fn serial_set(crl: &CrlFile) -> HashSet<Vec<u8>> {
    crl.revoked.iter().map(|e| e.serial.to_unsigned_bytes_be()).collect()
}
