//! ICP-Brasil signature-policy constraint engine: per-policy-OID
//! validity/digest checks derived from the LPA, plus ETSI policy-XML
//! algorithm and qualifying-property constraints. [`PolicyConstraints`] is
//! the caller-supplied, per-OID catalogue entry [`crate::ValidationOptions`]
//! carries — built by merging an [`lpa::PolicyInfo`] with its corresponding
//! ETSI policy XML ahead of time, outside this crate's I/O-free core.

pub mod lpa;

use crate::asn1::Oid;
use crate::cms::SignerInfo;
use crate::error::Error;
use crate::report::{Issue, Severity};
use chrono::{DateTime, Utc};

/// One `AlgAndLength` entry from an ETSI policy XML's
/// `SignerAndVerifierRules` — a normalized algorithm token (e.g.
/// `"rsa-sha256"`, from [`crate::crypto::normalized_algorithm_token`]) and
/// the minimum public-key size it requires.
#[derive(Debug, Clone)]
pub struct AlgAndLength {
    pub token: String,
    pub min_key_length: usize,
}

/// The full per-policy-OID profile: validity window and digest pin from the
/// LPA, plus qualifying-property and algorithm constraints from the ETSI
/// policy XML. Any of the LPA-sourced fields may be absent when only the
/// ETSI XML side was loaded for a given policy, and vice versa.
#[derive(Debug, Clone, Default)]
pub struct PolicyConstraints {
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub revocation_date: Option<DateTime<Utc>>,
    /// Digest of the policy document itself, as published by the LPA.
    pub policy_digest: Option<(Oid, Vec<u8>)>,
    pub mandated_signed_qprops: Vec<String>,
    pub mandated_unsigned_qprops: Vec<String>,
    pub signer_alg_constraints: Vec<AlgAndLength>,
}

impl PolicyConstraints {
    pub fn from_lpa_entry(entry: &lpa::PolicyInfo) -> Self {
        PolicyConstraints {
            not_before: Some(entry.not_before),
            not_after: entry.not_after,
            revocation_date: entry.revocation_date,
            policy_digest: entry.digest.clone(),
            ..Default::default()
        }
    }

    pub fn with_etsi_constraints(
        mut self,
        mandated_signed_qprops: Vec<String>,
        mandated_unsigned_qprops: Vec<String>,
        signer_alg_constraints: Vec<AlgAndLength>,
    ) -> Self {
        self.mandated_signed_qprops = mandated_signed_qprops;
        self.mandated_unsigned_qprops = mandated_unsigned_qprops;
        self.signer_alg_constraints = signer_alg_constraints;
        self
    }

    /// `requires_signature_timestamp := "SignatureTimeStamp" ∈
    /// mandated_unsigned_qprops`: flips a missing embedded RFC 3161
    /// timestamp from a warning to an error.
    pub fn requires_signature_timestamp(&self) -> bool {
        self.mandated_unsigned_qprops.iter().any(|p| p == "SignatureTimeStamp")
    }
}

const ICP_BRASIL_POLICY_ROOT: &str = "2.16.76.1.7.1";
/// AD-RB v2 families additionally mandating SHA-256 and banning SHA-1
/// outright.
const AD_RB_V2_FAMILIES: &[&str] = &["2.16.76.1.7.1.1.2", "2.16.76.1.7.1.6.2"];

/// Given a dotted policy OID under the ICP-Brasil root
/// (`2.16.76.1.7.1.F.tail`), return the symmetric alias OID with family `F`
/// swapped for `F±5` (F ∈ [1,5] → F+5, F ∈ [6,10] → F−5).
fn alias_oid(oid_str: &str) -> Option<String> {
    let prefix = format!("{ICP_BRASIL_POLICY_ROOT}.");
    let rest = oid_str.strip_prefix(&prefix)?;
    let mut parts = rest.splitn(2, '.');
    let family: u32 = parts.next()?.parse().ok()?;
    let tail = parts.next();
    let alias_family = match family {
        1..=5 => family + 5,
        6..=10 => family - 5,
        _ => return None,
    };
    Some(match tail {
        Some(tail) => format!("{prefix}{alias_family}.{tail}"),
        None => format!("{prefix}{alias_family}"),
    })
}

fn lookup<'a>(oid: &Oid, table: &'a std::collections::HashMap<String, PolicyConstraints>) -> Option<(&'a PolicyConstraints, String)> {
    let key = oid.to_string();
    if let Some(c) = table.get(&key) {
        return Some((c, key));
    }
    let alias = alias_oid(&key)?;
    table.get(&alias).map(|c| (c, alias))
}

fn is_ad_rb_v2_family(oid_str: &str) -> bool {
    AD_RB_V2_FAMILIES.iter().any(|family| oid_str == *family || oid_str.starts_with(&format!("{family}.")))
}

/// Result of evaluating one signer's declared signature policy: whether an
/// embedded timestamp becomes mandatory, and every issue found (mixed
/// severities — only `Severity::Error` entries should fail the signature in
/// strict mode; in non-strict mode none of them do by themselves).
pub struct PolicyEvaluation {
    pub requires_timestamp: bool,
    /// Whether `requires_timestamp` came from an explicit ETSI XML mandate
    /// (`error` severity) rather than the AD-RB v2 family default (`warning`).
    pub timestamp_mandated: bool,
    pub issues: Vec<Issue>,
}

/// Evaluate `signer`'s `signature-policy-identifier` against the configured
/// catalogue. `signer.policy_id() == None` — the `signaturePolicyImplied`
/// NULL choice — is not an error; it simply yields no findings and
/// `requires_timestamp: false`.
///
/// AD-RB v2 policies require an embedded timestamp structurally, independent
/// of whether a catalogue entry was supplied: with no entry (or an entry
/// with no ETSI mandate) a missing timestamp is still flagged, just at
/// `warning` rather than `error` severity.
pub fn evaluate(
    signer: &SignerInfo,
    signer_public_key_bits: usize,
    signing_time: DateTime<Utc>,
    strict: bool,
    catalogue: &std::collections::HashMap<String, PolicyConstraints>,
) -> PolicyEvaluation {
    let Some(policy_id) = signer.policy_id() else {
        return PolicyEvaluation { requires_timestamp: false, timestamp_mandated: false, issues: Vec::new() };
    };

    let mut issues = Vec::new();
    let oid_str = policy_id.policy_oid.to_string();
    let ad_rb_v2 = is_ad_rb_v2_family(&oid_str);

    let Some((constraints, _matched_key)) = lookup(&policy_id.policy_oid, catalogue) else {
        issues.push(Issue::from_error(&Error::PolicyOidNotFound(oid_str)));
        return PolicyEvaluation { requires_timestamp: ad_rb_v2, timestamp_mandated: false, issues };
    };

    if let Some(not_before) = constraints.not_before {
        if signing_time < not_before {
            issues.push(Issue::from_error(&Error::PolicyTimeBeforeValidity));
        }
    }
    if let Some(not_after) = constraints.not_after {
        if signing_time > not_after {
            issues.push(Issue::from_error(&Error::PolicyTimeAfterValidity));
        }
    }
    if let Some(revocation_date) = constraints.revocation_date {
        if signing_time > revocation_date {
            issues.push(Issue::from_error(&Error::PolicyRevokedBeforeSignatureTime));
        }
    }

    check_policy_digest(&policy_id.hash, &constraints.policy_digest, strict, &mut issues);

    for constraint in &constraints.signer_alg_constraints {
        if constraint.token == crate::crypto::normalized_algorithm_token(&signer.signature_algorithm, Some(&signer.digest_algorithm)).unwrap_or_default()
            && signer_public_key_bits < constraint.min_key_length
        {
            issues.push(Issue::from_error(&Error::PolicyKeyTooShort { bits: signer_public_key_bits, min: constraint.min_key_length }));
        }
    }

    if ad_rb_v2 {
        let digest_alg = crate::crypto::DigestAlgorithm::from_oid(&signer.digest_algorithm);
        if digest_alg != Some(crate::crypto::DigestAlgorithm::Sha256) {
            let token = digest_alg.map(|d| d.short_name().to_string()).unwrap_or_else(|| signer.digest_algorithm.to_string());
            issues.push(Issue::from_error(&Error::PolicyAlgorithmNotAllowed(format!(
                "AD-RB v2 policy {oid_str} requires sha256, signer used {token}"
            ))));
        }
    }

    let timestamp_mandated = constraints.requires_signature_timestamp();
    PolicyEvaluation { requires_timestamp: ad_rb_v2 || timestamp_mandated, timestamp_mandated, issues }
}

fn check_policy_digest(signed_hash: &Option<(Oid, Vec<u8>)>, expected: &Option<(Oid, Vec<u8>)>, strict: bool, issues: &mut Vec<Issue>) {
    match (signed_hash, expected) {
        (None, _) => {
            let message = "signature-policy-identifier carries no policy digest";
            if strict {
                issues.push(Issue::error(Error::PolicyDigestMissing.code(), message));
            } else {
                issues.push(Issue::warning(Error::PolicyDigestMissing.code(), message));
            }
        },
        (Some(_), None) => {
            // Catalogue has no pinned digest for this policy — nothing to
            // compare against; the signer's own hash is accepted as-is.
        },
        (Some((signed_alg, signed_value)), Some((expected_alg, expected_value))) => {
            if signed_alg != expected_alg {
                issues.push(Issue::from_error(&Error::PolicyDigestAlgorithmMismatch));
            } else if signed_value.len() != expected_value.len() {
                issues.push(Issue::from_error(&Error::PolicyDigestLengthMismatch));
            } else if signed_value != expected_value {
                issues.push(Issue::from_error(&Error::PolicyDigestMismatch));
            }
        },
    }
}

impl PolicyEvaluation {
    /// Worst severity among `issues`, if any — `Some(Error)` only when at
    /// least one `Severity::Error` issue was found.
    pub fn status(&self) -> Option<Severity> {
        if self.issues.iter().any(|i| i.severity == Severity::Error) {
            Some(Severity::Error)
        } else if self.issues.is_empty() {
            None
        } else {
            Some(Severity::Warning)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_maps_family_symmetrically() {
        assert_eq!(alias_oid("2.16.76.1.7.1.1.2"), Some("2.16.76.1.7.1.6.2".to_string()));
        assert_eq!(alias_oid("2.16.76.1.7.1.6.2"), Some("2.16.76.1.7.1.1.2".to_string()));
        assert_eq!(alias_oid("2.16.76.1.7.1.3"), Some("2.16.76.1.7.1.8".to_string()));
        assert_eq!(alias_oid("1.2.3"), None);
    }

    #[test]
    fn ad_rb_v2_family_detection() {
        assert!(is_ad_rb_v2_family("2.16.76.1.7.1.1.2"));
        assert!(is_ad_rb_v2_family("2.16.76.1.7.1.1.2.3"));
        assert!(!is_ad_rb_v2_family("2.16.76.1.7.1.1.1"));
    }

    #[test]
    fn digest_mismatch_classified_by_stage() {
        let mut issues = Vec::new();
        let sha256 = crate::asn1::oid::well_known::sha256();
        let sha1 = crate::asn1::oid::well_known::sha1();
        check_policy_digest(&Some((sha1.clone(), vec![1, 2, 3])), &Some((sha256, vec![1, 2, 3])), true, &mut issues);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "policy_digest_algorithm_mismatch");
    }
}
