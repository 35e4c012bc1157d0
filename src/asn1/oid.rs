//! ASN.1 OBJECT IDENTIFIER: dotted-decimal arc list with DER codec.
//!
//! OID constants the rest of the crate needs (PKCS#7/CMS attribute OIDs,
//! X.509 extension OIDs, ICP-Brasil-specific otherName/policy OIDs) live
//! here as crate-local constants rather than behind a generic `const-oid`
//! dependency, so the ICP-Brasil-specific arcs (CPF otherName, AD-RB policy
//! families) read as first-class citizens rather than ad hoc strings.

/// An OBJECT IDENTIFIER, stored as its arc list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn from_arcs(arcs: Vec<u32>) -> Self {
        Oid(arcs)
    }

    /// Parse from a dotted-decimal string such as `"1.2.840.113549.1.1.1"`.
    pub fn from_str_dotted(s: &str) -> Option<Self> {
        let arcs: Option<Vec<u32>> = s.split('.').map(|p| p.parse::<u32>().ok()).collect();
        arcs.map(Oid)
    }

    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// Decode DER OID content bytes (the bytes inside the OID TLV, not
    /// including tag/length).
    pub fn from_der_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let mut arcs = Vec::new();
        let first = bytes[0] as u32;
        arcs.push(first / 40);
        arcs.push(first % 40);

        let mut value: u64 = 0;
        let mut started = false;
        for &b in &bytes[1..] {
            started = true;
            value = (value << 7) | (b & 0x7f) as u64;
            if b & 0x80 == 0 {
                arcs.push(value as u32);
                value = 0;
                started = false;
            }
        }
        if started {
            return None; // truncated multi-byte arc
        }
        Some(Oid(arcs))
    }

    pub fn to_der_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.0.len() < 2 {
            return out;
        }
        out.push((self.0[0] * 40 + self.0[1]) as u8);
        for &arc in &self.0[2..] {
            let mut chunks = Vec::new();
            let mut v = arc;
            chunks.push((v & 0x7f) as u8);
            v >>= 7;
            while v > 0 {
                chunks.push((v & 0x7f) as u8 | 0x80);
                v >>= 7;
            }
            chunks.reverse();
            out.extend_from_slice(&chunks);
        }
        out
    }

    pub fn encode_der(&self) -> Vec<u8> {
        super::encode_tlv(super::Class::Universal, false, super::TAG_OID, &self.to_der_bytes())
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|a| a.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

macro_rules! oid_const {
    ($name:ident, $($arc:expr),+ $(,)?) => {
        pub fn $name() -> Oid {
            Oid::from_arcs(vec![$($arc),+])
        }
    };
}

/// Well-known OIDs used throughout the validator/preparer.
pub mod well_known {
    use super::Oid;

    // ---- PKCS#7 / CMS (RFC 5652) content and attribute types ----
    oid_const!(id_data, 1, 2, 840, 113549, 1, 7, 1);
    oid_const!(id_signed_data, 1, 2, 840, 113549, 1, 7, 2);
    oid_const!(content_type, 1, 2, 840, 113549, 1, 9, 3);
    oid_const!(message_digest, 1, 2, 840, 113549, 1, 9, 4);
    oid_const!(signing_time, 1, 2, 840, 113549, 1, 9, 5);
    oid_const!(signing_certificate, 1, 2, 840, 113549, 1, 9, 16, 2, 12);
    oid_const!(signing_certificate_v2, 1, 2, 840, 113549, 1, 9, 16, 2, 47);
    oid_const!(signature_policy_identifier, 1, 2, 840, 113549, 1, 9, 16, 2, 15);
    oid_const!(signature_time_stamp_token, 1, 2, 840, 113549, 1, 9, 16, 2, 14);
    oid_const!(id_ct_tst_info, 1, 2, 840, 113549, 1, 9, 16, 1, 4);

    // ---- Digest algorithms ----
    oid_const!(sha1, 1, 3, 14, 3, 2, 26);
    oid_const!(sha224, 2, 16, 840, 1, 101, 3, 4, 2, 4);
    oid_const!(sha256, 2, 16, 840, 1, 101, 3, 4, 2, 1);
    oid_const!(sha384, 2, 16, 840, 1, 101, 3, 4, 2, 2);
    oid_const!(sha512, 2, 16, 840, 1, 101, 3, 4, 2, 3);

    // ---- RSA signature algorithms ----
    oid_const!(rsa_encryption, 1, 2, 840, 113549, 1, 1, 1);
    oid_const!(sha1_with_rsa, 1, 2, 840, 113549, 1, 1, 5);
    oid_const!(sha256_with_rsa, 1, 2, 840, 113549, 1, 1, 11);
    oid_const!(sha384_with_rsa, 1, 2, 840, 113549, 1, 1, 12);
    oid_const!(sha512_with_rsa, 1, 2, 840, 113549, 1, 1, 13);
    oid_const!(id_rsassa_pss, 1, 2, 840, 113549, 1, 1, 10);
    oid_const!(id_mgf1, 1, 2, 840, 113549, 1, 1, 8);

    // ---- ECDSA ----
    oid_const!(id_ec_public_key, 1, 2, 840, 10045, 2, 1);
    oid_const!(ecdsa_with_sha1, 1, 2, 840, 10045, 4, 1);
    oid_const!(ecdsa_with_sha224, 1, 2, 840, 10045, 4, 3, 1);
    oid_const!(ecdsa_with_sha256, 1, 2, 840, 10045, 4, 3, 2);
    oid_const!(ecdsa_with_sha384, 1, 2, 840, 10045, 4, 3, 3);
    oid_const!(ecdsa_with_sha512, 1, 2, 840, 10045, 4, 3, 4);
    oid_const!(prime256v1, 1, 2, 840, 10045, 3, 1, 7);
    oid_const!(secp256k1, 1, 3, 132, 0, 10);
    oid_const!(secp384r1, 1, 3, 132, 0, 34);
    oid_const!(secp521r1, 1, 3, 132, 0, 35);

    // ---- X.509 extensions ----
    oid_const!(ext_subject_key_identifier, 2, 5, 29, 14);
    oid_const!(ext_key_usage, 2, 5, 29, 15);
    oid_const!(ext_subject_alt_name, 2, 5, 29, 17);
    oid_const!(ext_basic_constraints, 2, 5, 29, 19);
    oid_const!(ext_crl_distribution_points, 2, 5, 29, 31);
    oid_const!(ext_authority_key_identifier, 2, 5, 29, 35);
    oid_const!(ext_authority_info_access, 1, 3, 6, 1, 5, 5, 7, 1, 1);
    oid_const!(ad_ocsp, 1, 3, 6, 1, 5, 5, 7, 48, 1);
    oid_const!(ad_ca_issuers, 1, 3, 6, 1, 5, 5, 7, 48, 2);

    // ---- Name attribute types ----
    oid_const!(at_common_name, 2, 5, 4, 3);
    oid_const!(at_serial_number, 2, 5, 4, 5);
    oid_const!(at_country_name, 2, 5, 4, 6);
    oid_const!(at_organization_name, 2, 5, 4, 10);

    // ---- ICP-Brasil otherName OIDs carried in SubjectAltName (CPF/DoB/voter id) ----
    oid_const!(icp_brasil_cpf_1, 2, 16, 76, 1, 3, 1);
    oid_const!(icp_brasil_cpf_2, 2, 16, 76, 1, 3, 4);
    oid_const!(icp_brasil_voter_id, 2, 16, 76, 1, 3, 5);

    // ---- OCSP (RFC 6960) ----
    oid_const!(id_pkix_ocsp_basic, 1, 3, 6, 1, 5, 5, 7, 48, 1, 1);

    /// ICP-Brasil AD-RB policy family root: `2.16.76.1.7.1`.
    pub fn icp_brasil_policy_root() -> Oid {
        Oid::from_arcs(vec![2, 16, 76, 1, 7, 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn der_roundtrip_known_oid() {
        // 1.2.840.113549.1.1.1 (rsaEncryption)
        let oid = well_known::rsa_encryption();
        let der = oid.to_der_bytes();
        let decoded = Oid::from_der_bytes(&der).unwrap();
        assert_eq!(oid, decoded);
        assert_eq!(oid.to_string(), "1.2.840.113549.1.1.1");
    }

    #[test]
    fn dotted_string_parses() {
        let oid = Oid::from_str_dotted("2.16.76.1.7.1.1.2.3").unwrap();
        assert_eq!(oid.arcs(), &[2, 16, 76, 1, 7, 1, 1, 2, 3]);
    }

    proptest! {
        #[test]
        fn arc_list_roundtrips_through_der(arcs in proptest::collection::vec(0u32..5000, 2..12)) {
            // first two arcs must satisfy the X.690 packing rule (first*40+second < 256-ish);
            // clamp to keep the encoding well-formed for this property.
            let mut arcs = arcs;
            arcs[0] %= 3;
            arcs[1] %= 40;
            let oid = Oid::from_arcs(arcs.clone());
            let der = oid.to_der_bytes();
            let decoded = Oid::from_der_bytes(&der).unwrap();
            prop_assert_eq!(decoded.arcs(), arcs.as_slice());
        }
    }
}
