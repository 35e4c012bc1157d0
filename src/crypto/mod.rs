//! Cryptographic verifier: digest dispatch, RSA PKCS#1v1.5 / RSASSA-PSS
//! and ECDSA (over four named curves) signature verification against a
//! parsed `SubjectPublicKeyInfo`.
//!
//! `verify` never raises to the caller: any parsing failure, unsupported
//! algorithm, or key-type mismatch is simply `false`. This mirrors the
//! teacher's `signatures::verifier` shape (`Result<VerificationResult>`,
//! never a panic) one layer down, at the primitive-verification seam.

use crate::asn1::oid::well_known;
use crate::asn1::Oid;
use crate::x509::SubjectPublicKeyInfo;
use rsa::{BigUint, Pkcs1v15Sign, Pss, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest as _, Sha224, Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        if *oid == well_known::sha1() {
            Some(Self::Sha1)
        } else if *oid == well_known::sha224() {
            Some(Self::Sha224)
        } else if *oid == well_known::sha256() {
            Some(Self::Sha256)
        } else if *oid == well_known::sha384() {
            Some(Self::Sha384)
        } else if *oid == well_known::sha512() {
            Some(Self::Sha512)
        } else {
            None
        }
    }

    pub fn oid(&self) -> Oid {
        match self {
            Self::Sha1 => well_known::sha1(),
            Self::Sha224 => well_known::sha224(),
            Self::Sha256 => well_known::sha256(),
            Self::Sha384 => well_known::sha384(),
            Self::Sha512 => well_known::sha512(),
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => {
                let mut h = Sha1::new();
                h.update(data);
                h.finalize().to_vec()
            },
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Short digest name as used in normalized algorithm tokens (e.g.
    /// `"rsa-sha256"`, `"ecdsa-sha384"`).
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }
}

enum ResolvedScheme {
    RsaPkcs1v15(DigestAlgorithm),
    RsaPss { digest: DigestAlgorithm, salt_len: usize },
    Ecdsa(DigestAlgorithm),
}

fn resolve_scheme(sig_alg: &Oid, sig_params: Option<&[u8]>, digest_hint: Option<&Oid>) -> Option<ResolvedScheme> {
    use well_known::*;
    if *sig_alg == rsa_encryption() {
        return Some(ResolvedScheme::RsaPkcs1v15(DigestAlgorithm::from_oid(digest_hint?)?));
    }
    if *sig_alg == sha1_with_rsa() {
        return Some(ResolvedScheme::RsaPkcs1v15(DigestAlgorithm::Sha1));
    }
    if *sig_alg == sha256_with_rsa() {
        return Some(ResolvedScheme::RsaPkcs1v15(DigestAlgorithm::Sha256));
    }
    if *sig_alg == sha384_with_rsa() {
        return Some(ResolvedScheme::RsaPkcs1v15(DigestAlgorithm::Sha384));
    }
    if *sig_alg == sha512_with_rsa() {
        return Some(ResolvedScheme::RsaPkcs1v15(DigestAlgorithm::Sha512));
    }
    if *sig_alg == id_rsassa_pss() {
        let (digest, salt_len) = parse_pss_params(sig_params).unwrap_or((DigestAlgorithm::Sha1, 20));
        return Some(ResolvedScheme::RsaPss { digest, salt_len });
    }
    if *sig_alg == ecdsa_with_sha1() {
        return Some(ResolvedScheme::Ecdsa(DigestAlgorithm::Sha1));
    }
    if *sig_alg == ecdsa_with_sha224() {
        return Some(ResolvedScheme::Ecdsa(DigestAlgorithm::Sha224));
    }
    if *sig_alg == ecdsa_with_sha256() {
        return Some(ResolvedScheme::Ecdsa(DigestAlgorithm::Sha256));
    }
    if *sig_alg == ecdsa_with_sha384() {
        return Some(ResolvedScheme::Ecdsa(DigestAlgorithm::Sha384));
    }
    if *sig_alg == ecdsa_with_sha512() {
        return Some(ResolvedScheme::Ecdsa(DigestAlgorithm::Sha512));
    }
    None
}

/// Best-effort `RSASSA-PSS-params` parse: `{ [0] hashAlgorithm DEFAULT
/// sha1, [1] maskGenAlgorithm DEFAULT mgf1SHA1, [2] saltLength DEFAULT 20,
/// [3] trailerField DEFAULT 1 }`. Only the hash and salt length are used:
/// this crate's `rsa::Pss` always derives MGF1 from the same digest as the
/// message hash, which covers every ICP-Brasil PSS profile observed.
fn parse_pss_params(params: Option<&[u8]>) -> Option<(DigestAlgorithm, usize)> {
    let params = params?;
    let (node, _) = crate::asn1::decode_tlv(params, 0).ok()?;
    let mut digest = DigestAlgorithm::Sha1;
    let mut salt_len = 20usize;
    for field in node.as_sequence().ok()? {
        match field.context_number() {
            Some(0) => {
                if let Ok(inner) = field.explicit_inner() {
                    if let Ok(fields) = inner.as_sequence() {
                        if let Ok(oid) = fields[0].as_oid() {
                            if let Some(d) = DigestAlgorithm::from_oid(&oid) {
                                digest = d;
                            }
                        }
                    }
                }
            },
            Some(2) => {
                if let Ok(inner) = field.explicit_inner() {
                    if let Ok(i) = inner.as_integer() {
                        salt_len = i.as_i64().unwrap_or(20) as usize;
                    }
                }
            },
            _ => {},
        }
    }
    Some((digest, salt_len))
}

fn rsa_public_key(spki: &SubjectPublicKeyInfo) -> Option<RsaPublicKey> {
    let (node, _) = crate::asn1::decode_tlv(&spki.key_bytes, 0).ok()?;
    let fields = node.as_sequence().ok()?;
    if fields.len() != 2 {
        return None;
    }
    let modulus = fields[0].as_integer().ok()?;
    let exponent = fields[1].as_integer().ok()?;
    let n = BigUint::from_bytes_be(&modulus.to_unsigned_bytes_be());
    let e = BigUint::from_bytes_be(&exponent.to_unsigned_bytes_be());
    RsaPublicKey::new(n, e).ok()
}

fn verify_rsa_pkcs1v15(spki: &SubjectPublicKeyInfo, digest: DigestAlgorithm, message: &[u8], signature: &[u8]) -> bool {
    let Some(pk) = rsa_public_key(spki) else { return false };
    let hashed = digest.digest(message);
    let scheme = match digest {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    };
    pk.verify(scheme, &hashed, signature).is_ok()
}

fn verify_rsa_pss(spki: &SubjectPublicKeyInfo, digest: DigestAlgorithm, salt_len: usize, message: &[u8], signature: &[u8]) -> bool {
    let Some(pk) = rsa_public_key(spki) else { return false };
    let hashed = digest.digest(message);
    let scheme = match digest {
        DigestAlgorithm::Sha1 => Pss::new_with_salt::<Sha1>(salt_len),
        DigestAlgorithm::Sha224 => Pss::new_with_salt::<Sha224>(salt_len),
        DigestAlgorithm::Sha256 => Pss::new_with_salt::<Sha256>(salt_len),
        DigestAlgorithm::Sha384 => Pss::new_with_salt::<Sha384>(salt_len),
        DigestAlgorithm::Sha512 => Pss::new_with_salt::<Sha512>(salt_len),
    };
    pk.verify(scheme, &hashed, signature).is_ok()
}

fn verify_ecdsa(spki: &SubjectPublicKeyInfo, digest: DigestAlgorithm, message: &[u8], signature: &[u8]) -> bool {
    let Some(curve) = ec_curve_oid(spki) else { return false };
    let hashed = digest.digest(message);

    if curve == well_known::prime256v1() {
        let Ok(vk) = p256::ecdsa::VerifyingKey::from_sec1_bytes(&spki.key_bytes) else { return false };
        let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else { return false };
        return vk.verify_prehash(&hashed, &sig).is_ok();
    }
    if curve == well_known::secp256k1() {
        let Ok(vk) = k256::ecdsa::VerifyingKey::from_sec1_bytes(&spki.key_bytes) else { return false };
        let Ok(sig) = k256::ecdsa::Signature::from_der(signature) else { return false };
        return vk.verify_prehash(&hashed, &sig).is_ok();
    }
    if curve == well_known::secp384r1() {
        let Ok(vk) = p384::ecdsa::VerifyingKey::from_sec1_bytes(&spki.key_bytes) else { return false };
        let Ok(sig) = p384::ecdsa::Signature::from_der(signature) else { return false };
        return vk.verify_prehash(&hashed, &sig).is_ok();
    }
    if curve == well_known::secp521r1() {
        let Ok(vk) = p521::ecdsa::VerifyingKey::from_sec1_bytes(&spki.key_bytes) else { return false };
        let Ok(sig) = p521::ecdsa::Signature::from_der(signature) else { return false };
        return vk.verify_prehash(&hashed, &sig).is_ok();
    }
    false
}

fn ec_curve_oid(spki: &SubjectPublicKeyInfo) -> Option<Oid> {
    let params = spki.params.as_ref()?;
    let (node, _) = crate::asn1::decode_tlv(params, 0).ok()?;
    node.as_oid().ok()
}

/// Verify `signature` over `message` (the verifier hashes `message` itself;
/// callers never pre-hash) using the public key in `spki`.
///
/// `digest_hint` is required only when `sig_alg` is the bare `rsaEncryption`
/// OID (CMS's "digestEncryptionAlgorithm is rsaEncryption, the digest
/// algorithm is named separately" case); it is ignored for every
/// self-describing combined algorithm (e.g. `sha256WithRSAEncryption`,
/// `ecdsa-with-SHA384`).
pub fn verify(
    sig_alg: &Oid,
    sig_params: Option<&[u8]>,
    digest_hint: Option<&Oid>,
    message: &[u8],
    signature: &[u8],
    spki: &SubjectPublicKeyInfo,
) -> bool {
    match resolve_scheme(sig_alg, sig_params, digest_hint) {
        Some(ResolvedScheme::RsaPkcs1v15(d)) => verify_rsa_pkcs1v15(spki, d, message, signature),
        Some(ResolvedScheme::RsaPss { digest, salt_len }) => verify_rsa_pss(spki, digest, salt_len, message, signature),
        Some(ResolvedScheme::Ecdsa(d)) => verify_ecdsa(spki, d, message, signature),
        None => false,
    }
}

/// Normalized `{rsa,ecdsa}-{digest}` token for policy algorithm constraints,
/// derived from a CMS signature+digest algorithm pair.
pub fn normalized_algorithm_token(sig_alg: &Oid, digest_hint: Option<&Oid>) -> Option<String> {
    use well_known::*;
    let (family, digest) = if *sig_alg == rsa_encryption() {
        ("rsa", DigestAlgorithm::from_oid(digest_hint?)?)
    } else if *sig_alg == sha1_with_rsa() {
        ("rsa", DigestAlgorithm::Sha1)
    } else if *sig_alg == sha256_with_rsa() {
        ("rsa", DigestAlgorithm::Sha256)
    } else if *sig_alg == sha384_with_rsa() {
        ("rsa", DigestAlgorithm::Sha384)
    } else if *sig_alg == sha512_with_rsa() {
        ("rsa", DigestAlgorithm::Sha512)
    } else if *sig_alg == id_rsassa_pss() {
        ("rsa-pss", DigestAlgorithm::from_oid(digest_hint.unwrap_or(&sha1())).unwrap_or(DigestAlgorithm::Sha1))
    } else if *sig_alg == ecdsa_with_sha1() {
        ("ecdsa", DigestAlgorithm::Sha1)
    } else if *sig_alg == ecdsa_with_sha224() {
        ("ecdsa", DigestAlgorithm::Sha224)
    } else if *sig_alg == ecdsa_with_sha256() {
        ("ecdsa", DigestAlgorithm::Sha256)
    } else if *sig_alg == ecdsa_with_sha384() {
        ("ecdsa", DigestAlgorithm::Sha384)
    } else if *sig_alg == ecdsa_with_sha512() {
        ("ecdsa", DigestAlgorithm::Sha512)
    } else {
        return None;
    };
    Some(format!("{family}-{}", digest.short_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{RandomizedSigner, SignatureEncoding};
    use rsa::RsaPrivateKey;

    fn test_rsa_spki(pk: &RsaPublicKey) -> SubjectPublicKeyInfo {
        let key_bytes = crate::asn1::encode_sequence(&[
            crate::asn1::Integer::from_unsigned_be(&pk.n().to_bytes_be()).encode_der(),
            crate::asn1::Integer::from_unsigned_be(&pk.e().to_bytes_be()).encode_der(),
        ]);
        SubjectPublicKeyInfo { algorithm: well_known::rsa_encryption(), params: None, key_bytes }
    }

    #[test]
    fn rsa_pkcs1v15_sha256_roundtrip() {
        let mut rng = rand::thread_rng();
        let sk = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let pk = sk.to_public_key();
        let spki = test_rsa_spki(&pk);

        let message = b"hello signature world";
        let signing_key = SigningKey::<Sha256>::new(sk);
        let sig = signing_key.sign_with_rng(&mut rng, message);

        assert!(verify(&well_known::sha256_with_rsa(), None, None, message, &sig.to_bytes(), &spki));
        assert!(!verify(&well_known::sha256_with_rsa(), None, None, b"tampered", &sig.to_bytes(), &spki));
    }

    #[test]
    fn unsupported_algorithm_returns_false_not_panic() {
        let spki = SubjectPublicKeyInfo { algorithm: well_known::rsa_encryption(), params: None, key_bytes: vec![] };
        let bogus_oid = crate::asn1::Oid::from_str_dotted("1.2.3.4.5").unwrap();
        assert!(!verify(&bogus_oid, None, None, b"x", b"y", &spki));
    }

    #[test]
    fn normalized_token_for_ecdsa_sha384() {
        assert_eq!(
            normalized_algorithm_token(&well_known::ecdsa_with_sha384(), None),
            Some("ecdsa-sha384".to_string())
        );
    }
}
