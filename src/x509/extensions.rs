//! X.509 extension parsing: SKI, AKI, CRL-DP, AIA, BasicConstraints,
//! KeyUsage, SubjectAltName (including the ICP-Brasil otherName arcs that
//! carry CPF and date-of-birth).

use crate::asn1::oid::well_known;
use crate::asn1::{Class, Node, Oid};
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// A parsed (but not yet interpreted) certificate/CRL extension: whether it
/// was marked `critical` and its raw `extnValue` OCTET STRING content.
#[derive(Debug, Clone)]
pub struct Extension {
    pub critical: bool,
    pub octets: Vec<u8>,
}

pub type Extensions = IndexMap<Oid, Extension>;

/// Parse an X.509 `Extensions` SEQUENCE OF Extension.
pub fn parse_extensions(node: &Node<'_>) -> Result<Extensions> {
    let mut out = IndexMap::new();
    for ext_node in node.as_sequence()? {
        let fields = ext_node.as_sequence()?;
        if fields.len() < 2 || fields.len() > 3 {
            return Err(Error::Asn1NonCanonical {
                offset: ext_node.span.0,
                reason: "Extension must have 2 or 3 fields".into(),
            });
        }
        let oid = fields[0].as_oid()?;
        let (critical, octets_node) = if fields.len() == 3 {
            (fields[1].as_boolean()?, &fields[2])
        } else {
            (false, &fields[1])
        };
        let octets = octets_node.as_octet_string()?.to_vec();
        out.insert(oid, Extension { critical, octets });
    }
    Ok(out)
}

/// Authority Key Identifier, key-identifier branch only (`[0]`), which is
/// the only branch the chain builder matches against SKI.
pub fn authority_key_identifier(ext: &Extension) -> Result<Option<Vec<u8>>> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    for field in node.as_sequence()? {
        if field.context_number() == Some(0) {
            return Ok(Some(field.content.to_vec()));
        }
    }
    Ok(None)
}

pub fn subject_key_identifier(ext: &Extension) -> Result<Vec<u8>> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    Ok(node.as_octet_string()?.to_vec())
}

#[derive(Debug, Clone, Default)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub path_len: Option<u32>,
}

pub fn basic_constraints(ext: &Extension) -> Result<BasicConstraints> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    let fields = node.as_sequence()?;
    let mut bc = BasicConstraints::default();
    for f in fields {
        match f.tag.number {
            crate::asn1::TAG_BOOLEAN => bc.is_ca = f.as_boolean()?,
            crate::asn1::TAG_INTEGER => bc.path_len = f.as_integer()?.as_i64().map(|v| v as u32),
            _ => {},
        }
    }
    Ok(bc)
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeyUsage: u16 {
        const DIGITAL_SIGNATURE = 1 << 0;
        const NON_REPUDIATION   = 1 << 1;
        const KEY_ENCIPHERMENT  = 1 << 2;
        const DATA_ENCIPHERMENT = 1 << 3;
        const KEY_AGREEMENT     = 1 << 4;
        const KEY_CERT_SIGN     = 1 << 5;
        const CRL_SIGN          = 1 << 6;
        const ENCIPHER_ONLY     = 1 << 7;
        const DECIPHER_ONLY     = 1 << 8;
    }
}

pub fn key_usage(ext: &Extension) -> Result<KeyUsage> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    let (_unused, bytes) = node.as_bit_string()?;
    // BIT STRING bit numbering: bit 0 is the MSB of the first octet. Map
    // each named KeyUsage bit (0..=8) to that numbering directly.
    let bit_set = |n: u32| -> bool {
        let byte_idx = (n / 8) as usize;
        let bit_idx = 7 - (n % 8);
        bytes.get(byte_idx).is_some_and(|b| (b >> bit_idx) & 1 == 1)
    };
    let mut out = KeyUsage::empty();
    out.set(KeyUsage::DIGITAL_SIGNATURE, bit_set(0));
    out.set(KeyUsage::NON_REPUDIATION, bit_set(1));
    out.set(KeyUsage::KEY_ENCIPHERMENT, bit_set(2));
    out.set(KeyUsage::DATA_ENCIPHERMENT, bit_set(3));
    out.set(KeyUsage::KEY_AGREEMENT, bit_set(4));
    out.set(KeyUsage::KEY_CERT_SIGN, bit_set(5));
    out.set(KeyUsage::CRL_SIGN, bit_set(6));
    out.set(KeyUsage::ENCIPHER_ONLY, bit_set(7));
    out.set(KeyUsage::DECIPHER_ONLY, bit_set(8));
    Ok(out)
}

/// One URI-valued entry of a `CRLDistributionPoints` extension, as parsed
/// from `DistributionPoint.distributionPoint.fullName[GeneralName::uniformResourceIdentifier]`.
pub fn crl_distribution_point_uris(ext: &Extension) -> Result<Vec<String>> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    let mut uris = Vec::new();
    for dp in node.as_sequence()? {
        for field in dp.as_sequence()? {
            if field.context_number() == Some(0) {
                // DistributionPointName ::= CHOICE { [0] fullName GeneralNames, [1] ... }
                for name in field.children()? {
                    if name.context_number() == Some(6) {
                        if let Ok(s) = std::str::from_utf8(name.content) {
                            uris.push(s.to_string());
                        }
                    }
                }
            }
        }
    }
    Ok(uris)
}

#[derive(Debug, Clone, Default)]
pub struct AuthorityInfoAccess {
    pub ocsp_uris: Vec<String>,
    pub ca_issuer_uris: Vec<String>,
}

pub fn authority_info_access(ext: &Extension) -> Result<AuthorityInfoAccess> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    let mut out = AuthorityInfoAccess::default();
    for access_desc in node.as_sequence()? {
        let fields = access_desc.as_sequence()?;
        if fields.len() != 2 {
            continue;
        }
        let method = fields[0].as_oid()?;
        let uri = if fields[1].context_number() == Some(6) {
            std::str::from_utf8(fields[1].content).ok().map(str::to_string)
        } else {
            None
        };
        let Some(uri) = uri else { continue };
        if method == well_known::ad_ocsp() {
            out.ocsp_uris.push(uri);
        } else if method == well_known::ad_ca_issuers() {
            out.ca_issuer_uris.push(uri);
        }
    }
    Ok(out)
}

/// ICP-Brasil identity data embedded in `SubjectAltName` as an `otherName`
/// with OID 2.16.76.1.3.1 or 2.16.76.1.3.4: a `DDMMAAAA || CPF(11) || ...`
/// ASCII string, decoded from its 19-digit *prefix* — the value is longer
/// than 19 digits in practice (it goes on to concatenate NIS, RG, and
/// issuer data), so only the prefix positions are load-bearing. OID
/// 2.16.76.1.3.5 (voter ID) yields neither a date of birth nor a CPF.
#[derive(Debug, Clone, Default)]
pub struct IcpBrasilIdentity {
    pub cpf: Option<String>,
    pub date_of_birth: Option<String>,
}

pub fn subject_alt_name_icp_brasil(ext: &Extension) -> Result<IcpBrasilIdentity> {
    let (node, _) = crate::asn1::decode_tlv(&ext.octets, 0)?;
    let mut out = IcpBrasilIdentity::default();
    for name in node.as_sequence()? {
        // GeneralName ::= CHOICE { ... otherName [0] OtherName ... }
        if name.context_number() != Some(0) {
            continue;
        }
        let other_name_fields = name.children()?;
        if other_name_fields.len() != 2 {
            continue;
        }
        let type_id = other_name_fields[0].as_oid()?;
        let is_cpf_bearing = type_id == well_known::icp_brasil_cpf_1() || type_id == well_known::icp_brasil_cpf_2();
        let is_voter_id = type_id == well_known::icp_brasil_voter_id();
        if !is_cpf_bearing && !is_voter_id {
            continue;
        }
        // value is `[0] EXPLICIT ANY`, typically a PrintableString/UTF8String.
        let value_node = other_name_fields[1].explicit_inner()?;
        let text = value_node.as_any_string().unwrap_or_default();
        if text.len() < 19 || !text.as_bytes()[..19].iter().all(u8::is_ascii_digit) {
            continue;
        }
        if is_cpf_bearing {
            out.cpf = Some(text[8..19].to_string());
            let dob = &text[0..8];
            if dob != "00000000" {
                out.date_of_birth = Some(dob.to_string());
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::{encode_boolean, encode_sequence, encode_tlv, TAG_INTEGER};

    #[test]
    fn basic_constraints_defaults_to_not_ca() {
        let der = encode_sequence(&[]);
        let ext = Extension { critical: true, octets: der };
        let bc = basic_constraints(&ext).unwrap();
        assert!(!bc.is_ca);
        assert_eq!(bc.path_len, None);
    }

    #[test]
    fn basic_constraints_parses_ca_and_path_len() {
        let der = encode_sequence(&[
            encode_boolean(true),
            encode_tlv(Class::Universal, false, TAG_INTEGER, &[2]),
        ]);
        let ext = Extension { critical: true, octets: der };
        let bc = basic_constraints(&ext).unwrap();
        assert!(bc.is_ca);
        assert_eq!(bc.path_len, Some(2));
    }

    fn san_extension(type_id: Oid, value: &str) -> Extension {
        let value_tlv = encode_tlv(Class::Universal, false, crate::asn1::TAG_PRINTABLE_STRING, value.as_bytes());
        let other_name_content = [type_id.encode_der(), crate::asn1::encode_context_explicit(0, &value_tlv)].concat();
        let general_name = encode_tlv(Class::ContextSpecific, true, 0, &other_name_content);
        Extension { critical: false, octets: encode_sequence(&[general_name]) }
    }

    #[test]
    fn icp_brasil_othername_decodes_dob_and_cpf_from_prefix() {
        // Real values run on past 19 digits (NIS/RG/issuer data); only the
        // DDMMAAAA||CPF(11) prefix is meaningful.
        let ext = san_extension(well_known::icp_brasil_cpf_1(), "01021980123456789000999888777");
        let id = subject_alt_name_icp_brasil(&ext).unwrap();
        assert_eq!(id.date_of_birth.as_deref(), Some("01021980"));
        assert_eq!(id.cpf.as_deref(), Some("12345678900"));
    }

    #[test]
    fn icp_brasil_othername_all_zero_date_yields_no_dob() {
        let ext = san_extension(well_known::icp_brasil_cpf_2(), "0000000012345678900");
        let id = subject_alt_name_icp_brasil(&ext).unwrap();
        assert_eq!(id.date_of_birth, None);
        assert_eq!(id.cpf.as_deref(), Some("12345678900"));
    }

    #[test]
    fn icp_brasil_voter_id_yields_neither_dob_nor_cpf() {
        let ext = san_extension(well_known::icp_brasil_voter_id(), "0102198012345678900");
        let id = subject_alt_name_icp_brasil(&ext).unwrap();
        assert_eq!(id.date_of_birth, None);
        assert_eq!(id.cpf, None);
    }
}
