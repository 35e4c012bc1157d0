//! RFC 3161 `TSTInfo`, the content wrapped by a CMS `SignedData` timestamp
//! token (the `signature-time-stamp-token` unsigned CMS attribute, and the
//! body of a standalone RFC 3161 timestamp reply).

use crate::asn1::{Integer, Oid};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct MessageImprint {
    pub hash_algorithm: Oid,
    pub hashed_message: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TstInfo {
    pub version: i64,
    pub policy: Oid,
    pub message_imprint: MessageImprint,
    pub serial_number: Integer,
    pub gen_time: DateTime<Utc>,
}

impl TstInfo {
    pub fn parse(der: &[u8]) -> Result<Self> {
        let (top, _) = crate::asn1::decode_tlv(der, 0)?;
        let fields = top.as_sequence()?;
        if fields.len() < 5 {
            return Err(Error::Asn1NonCanonical {
                offset: top.span.0,
                reason: "TSTInfo requires at least 5 fields".into(),
            });
        }
        let version = fields[0].as_integer()?.as_i64().unwrap_or(1);
        let policy = fields[1].as_oid()?;

        let imprint_fields = fields[2].as_sequence()?;
        let (hash_algorithm, _) = crate::x509::parse_algorithm_identifier(&imprint_fields[0])?;
        let hashed_message = imprint_fields[1].as_octet_string()?.to_vec();

        let serial_number = fields[3].as_integer()?;
        let gen_time = fields[4].as_generalized_time()?;

        Ok(TstInfo {
            version,
            policy,
            message_imprint: MessageImprint { hash_algorithm, hashed_message },
            serial_number,
            gen_time,
        })
    }

    /// Check that this token's `messageImprint` is the digest (under the
    /// imprint's own declared hash algorithm) of `data` — used to bind a
    /// timestamp token to the outer CMS `SignerInfo.signature` value it
    /// timestamps.
    pub fn imprint_matches(&self, data: &[u8]) -> bool {
        match crate::crypto::DigestAlgorithm::from_oid(&self.message_imprint.hash_algorithm) {
            Some(alg) => alg.digest(data) == self.message_imprint.hashed_message,
            None => false,
        }
    }
}
