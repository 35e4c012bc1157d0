//! Per-signature validation pipeline: wires the locator, CMS
//! parser/verifier, chain builder, revocation classifier, and policy engine
//! together into the report shapes in [`crate::report`].

use crate::chain::{self, ChainResult};
use crate::cms::{self, CmsSignedData, SignerInfo as CmsSignerInfo};
use crate::config::ValidationOptions;
use crate::error::Error;
use crate::pdf::slot::{self, SignatureSlot};
use crate::policy;
use crate::report::{DocMdpPermission, Issue, RevocationReport, SignatureReport, SignerInfo, ValidationReport};
use crate::revocation;
use chrono::{DateTime, Utc};

/// Validate every signature field located in `bytes`, in the order their
/// slots appear in the file.
pub fn validate_all_signatures(bytes: &[u8], options: &ValidationOptions) -> ValidationReport {
    let slots = match slot::locate_all(bytes, options.locator_strategy) {
        Ok(s) => s,
        Err(e) => return ValidationReport::from_signatures(vec![SignatureReport::failed(None, Issue::from_error(&e))]),
    };

    let mut reports = Vec::with_capacity(slots.len());
    for s in &slots {
        if options.cancelled() {
            break;
        }
        reports.push(validate_one(bytes, s, options));
    }
    ValidationReport::from_signatures(reports)
}

fn extract_signed_bytes(bytes: &[u8], byte_range: &[i64; 4]) -> crate::error::Result<Vec<u8>> {
    let parts = [(byte_range[0], byte_range[1]), (byte_range[2], byte_range[3])];
    let mut out = Vec::with_capacity((byte_range[1] + byte_range[3]) as usize);
    for (start, len) in parts {
        if start < 0 || len < 0 {
            return Err(Error::PdfByteRangeMalformed("negative ByteRange offset or length".into()));
        }
        let (start, len) = (start as usize, len as usize);
        let end = start.checked_add(len).ok_or(Error::PdfByteRangeMalformed("ByteRange overflows".into()))?;
        let slice = bytes.get(start..end).ok_or(Error::PdfByteRangeMalformed("ByteRange falls outside the file".into()))?;
        out.extend_from_slice(slice);
    }
    Ok(out)
}

/// `/DocMDP` transform parameters are reached through the signature
/// dictionary's own `/Reference` array (`TransformMethod /DocMDP`,
/// `TransformParams << /P n >>`), not through any cross-reference indirection
/// this crate's locator resolves — a narrow textual scan anchored at the
/// signature dictionary's own offset mirrors how `pdf::slot` already finds
/// `/ByteRange` and `/T` around the same anchor.
fn extract_doc_mdp(bytes: &[u8], sig_dict_offset: usize) -> Option<DocMdpPermission> {
    let window_end = (sig_dict_offset + 4096).min(bytes.len());
    let window = &bytes[sig_dict_offset..window_end];
    let marker = b"/DocMDP";
    window.windows(marker.len()).position(|w| w == marker)?;
    let p_marker = b"/P ";
    let rel = window.windows(p_marker.len()).position(|w| w == p_marker)?;
    let mut i = sig_dict_offset + rel + p_marker.len();
    let start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let p: i64 = std::str::from_utf8(&bytes[start..i]).ok()?.parse().ok()?;
    DocMdpPermission::from_p_value(p)
}

fn covers_current_file(slot: &SignatureSlot, bytes: &[u8]) -> bool {
    let [s1, l1, s2, l2] = slot.byte_range;
    s1 == 0 && s2 + l2 == bytes.len() as i64
}

/// Which instant chain validity and policy checks are evaluated at: the
/// signer's `signing-time` attribute if present, else `options.now` or the
/// wall clock.
fn effective_time(signer: &CmsSignerInfo, options: &ValidationOptions) -> DateTime<Utc> {
    signer.signing_time().or(options.now).unwrap_or_else(Utc::now)
}

fn validate_one(bytes: &[u8], slot: &SignatureSlot, options: &ValidationOptions) -> SignatureReport {
    let covers_current_file = covers_current_file(slot, bytes);

    let pkcs7_der = match slot.contents_der(bytes) {
        Ok(d) => d,
        Err(e) => return SignatureReport::failed(slot.field_name.clone(), Issue::from_error(&e)),
    };

    let cms_data = match CmsSignedData::parse(&pkcs7_der) {
        Ok(c) => c,
        Err(e) => return SignatureReport::failed(slot.field_name.clone(), Issue::from_error(&e)),
    };

    let Some(signer) = cms_data.signer_infos.first() else {
        return SignatureReport::failed(
            slot.field_name.clone(),
            Issue::from_error(&Error::CmsSignerNotFound("SignedData carries no signerInfos".into())),
        );
    };

    let signed_bytes = match extract_signed_bytes(bytes, &slot.byte_range) {
        Ok(b) => b,
        Err(e) => return SignatureReport::failed(slot.field_name.clone(), Issue::from_error(&e)),
    };
    let content = cms_data.encap_content.as_deref().unwrap_or(&signed_bytes);

    let verification = match cms::verify_signer(signer, content, &cms_data.certificates) {
        Ok(v) => v,
        Err(e) => return SignatureReport::failed(slot.field_name.clone(), Issue::from_error(&e)),
    };

    let mut issues = Vec::new();
    let byte_range_digest_ok = verification.byte_range_digest_ok;
    let cms_valid = verification.signature_valid;
    if !byte_range_digest_ok {
        issues.push(Issue::from_error(&Error::CmsDigestMismatch));
    }
    if !cms_valid {
        issues.push(Issue::from_error(&Error::CmsSignatureInvalid));
    }

    let signing_time = signer.signing_time();
    let at = effective_time(signer, options);

    let chain_result = chain::build_chain(&verification.signer_cert, at, &cms_data.certificates, options.trust_roots.as_ref());
    let chain_trusted = match &chain_result {
        Ok(ChainResult { trusted, .. }) => Some(*trusted),
        Err(e) => {
            issues.push(Issue::from_error(e));
            None
        },
    };

    let revocation_report = chain_result.as_ref().ok().and_then(|c| {
        let issuer = c.chain.get(1)?;
        let result = revocation::evaluate(&verification.signer_cert, issuer, at, options.clock_skew, options.revocation_fetcher.as_deref());
        if matches!(result.status, revocation::RevocationStatus::Revoked { .. }) {
            issues.push(Issue::from_error(&Error::RevocationRevoked));
        }
        Some(RevocationReport::from_result(&result))
    });

    let policy_status = signer.policy_id().map(|_| {
        let evaluation = policy::evaluate(signer, verification.signer_cert.public_key_bits(), at, options.strict, &options.policy_xml_by_oid);
        issues.extend(evaluation.issues);
        evaluation
    });

    let requires_timestamp = policy_status.as_ref().is_some_and(|e| e.requires_timestamp);
    let timestamp_mandated = policy_status.as_ref().is_some_and(|e| e.timestamp_mandated);
    let mut timestamp_status = None;
    if let Some(token_der) = signer.timestamp_token_der() {
        match cms::verify_timestamp_token(&token_der) {
            Ok((tst_info, tst_verification)) => {
                if !tst_info.imprint_matches(&signer.signature) {
                    issues.push(Issue::from_error(&Error::TimestampImprintMismatch));
                    timestamp_status = Some(crate::report::Severity::Error);
                } else if !tst_verification.signature_valid {
                    issues.push(Issue::from_error(&Error::TimestampInvalid));
                    timestamp_status = Some(crate::report::Severity::Error);
                }
            },
            Err(e) => {
                issues.push(Issue::from_error(&e));
                timestamp_status = Some(crate::report::Severity::Error);
            },
        }
    } else if requires_timestamp {
        let severity = if timestamp_mandated || options.strict { crate::report::Severity::Error } else { crate::report::Severity::Warning };
        issues.push(Issue { severity, code: Error::TimestampMissing.code().to_string(), message: Error::TimestampMissing.message() });
        timestamp_status = Some(severity);
    }

    let doc_mdp = extract_doc_mdp(bytes, slot.sig_dict_offset);
    let document_intact = covers_current_file && byte_range_digest_ok && cms_valid;

    SignatureReport {
        field_name: slot.field_name.clone(),
        signer: Some(SignerInfo::from_certificate(&verification.signer_cert)),
        covers_current_file,
        byte_range_digest_ok,
        cms_valid,
        document_intact,
        chain_trusted,
        revocation: revocation_report,
        policy_status: policy_status.as_ref().and_then(|e| e.status()),
        timestamp_status,
        doc_mdp,
        signing_time,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_current_file_requires_second_range_to_reach_eof() {
        let slot = SignatureSlot { field_name: None, byte_range: [0, 10, 20, 5], contents_start: 11, contents_end: 19, sig_dict_offset: 0 };
        let bytes = vec![0u8; 25];
        assert!(covers_current_file(&slot, &bytes));
        let short = vec![0u8; 30];
        assert!(!covers_current_file(&slot, &short));
    }

    #[test]
    fn extract_signed_bytes_concatenates_both_ranges() {
        let bytes = b"0123456789".to_vec();
        let out = extract_signed_bytes(&bytes, &[0, 3, 6, 4]).unwrap();
        assert_eq!(out, b"012"[..].iter().chain(b"6789").copied().collect::<Vec<u8>>());
    }

    #[test]
    fn extract_signed_bytes_rejects_out_of_range() {
        let bytes = b"0123".to_vec();
        assert!(extract_signed_bytes(&bytes, &[0, 10, 10, 10]).is_err());
    }

    #[test]
    fn doc_mdp_p_value_maps_to_permission() {
        let bytes = b"<< /Type /Sig /Reference [ << /TransformMethod /DocMDP /TransformParams << /P 2 /Type /TransformParams >> >> ] >>".to_vec();
        assert_eq!(extract_doc_mdp(&bytes, 0), Some(DocMdpPermission::FormFillingAndSigning));
    }

    #[test]
    fn doc_mdp_absent_is_none() {
        let bytes = b"<< /Type /Sig /Filter /Adobe.PPKLite >>".to_vec();
        assert_eq!(extract_doc_mdp(&bytes, 0), None);
    }
}
