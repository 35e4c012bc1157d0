//! Validation report shapes: what [`crate::validate_all_signatures`] returns,
//! and the per-signer identity fields the orchestrator assembles from the
//! CMS signer's certificate.

use crate::asn1::oid::well_known;
use crate::revocation::{RevocationSource, RevocationStatus};
use crate::x509::X509Certificate;
use chrono::{DateTime, Utc};

/// Severity of one reported [`Issue`]. `Error` means the signature (or the
/// whole document, for document-level issues) must not be treated as valid;
/// `Warning` is informational and does not by itself fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One finding attached to a signature or to the document as a whole.
/// `code` is [`crate::Error::code`] when the issue originates from a
/// concrete `Error`, or a short ad hoc snake_case string otherwise.
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl Issue {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Issue { severity: Severity::Error, code: code.into(), message: message.into() }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Issue { severity: Severity::Warning, code: code.into(), message: message.into() }
    }

    pub fn from_error(err: &crate::Error) -> Self {
        Issue::error(err.code(), err.message())
    }
}

/// Identity fields read off the signer's certificate: subject
/// and issuer distinguished names rendered for humans, the canonical serial
/// number in both hex and decimal, and the ICP-Brasil identity attributes
/// (CPF, date of birth) extracted from `SubjectAltName` when present.
#[derive(Debug, Clone)]
pub struct SignerInfo {
    pub subject: String,
    pub issuer: String,
    pub common_name: Option<String>,
    pub serial_hex: String,
    pub serial_decimal: String,
    /// CPF, preferring the DN `serialNumber` attribute (2.5.4.5) when
    /// present, then the ICP-Brasil CPF otherName, then `None`.
    pub cpf: Option<String>,
    /// `DDMMAAAA`, from the ICP-Brasil CPF otherName only — never derived
    /// from the voter-ID otherName (2.16.76.1.3.5), which carries no DOB.
    pub date_of_birth: Option<String>,
}

impl SignerInfo {
    pub fn from_certificate(cert: &X509Certificate) -> Self {
        let icp = cert.icp_brasil_identity();
        let cpf = cert.subject.get(&well_known::at_serial_number()).map(str::to_string).or(icp.cpf);
        SignerInfo {
            subject: cert.subject.to_string(),
            issuer: cert.issuer.to_string(),
            common_name: cert.subject.common_name().map(str::to_string),
            serial_hex: cert.serial.to_hex(),
            serial_decimal: unsigned_bytes_to_decimal(&cert.serial.to_unsigned_bytes_be()),
            cpf,
            date_of_birth: icp.date_of_birth,
        }
    }
}

/// Decimal rendering of a big-endian unsigned magnitude without a bignum
/// dependency (`Integer` is deliberately raw bytes; see SPEC_FULL.md §3):
/// repeated long division by 10 over the byte vector.
fn unsigned_bytes_to_decimal(bytes: &[u8]) -> String {
    if bytes.is_empty() || bytes.iter().all(|&b| b == 0) {
        return "0".to_string();
    }
    let mut digits = bytes.to_vec();
    let mut out = Vec::new();
    while digits.iter().any(|&b| b != 0) {
        let mut remainder: u32 = 0;
        for byte in &mut digits {
            let acc = (remainder << 8) | *byte as u32;
            *byte = (acc / 10) as u8;
            remainder = acc % 10;
        }
        out.push(b'0' + remainder as u8);
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

/// Result of revocation classification as carried in the report: the status
/// plus which source(s) produced it, rendered as one of the
/// `ocsp|crl|mixed|none` strings.
#[derive(Debug, Clone)]
pub struct RevocationReport {
    pub status: RevocationStatus,
    pub source: &'static str,
}

impl RevocationReport {
    pub fn from_result(result: &crate::revocation::RevocationResult) -> Self {
        let source = match result.source {
            RevocationSource::Ocsp => "ocsp",
            RevocationSource::Crl => "crl",
            RevocationSource::Mixed => "mixed",
            RevocationSource::None => "none",
        };
        RevocationReport { status: result.status.clone(), source }
    }
}

/// Document-modification-permission level from the first certification
/// signature's `/DocMDP` transform parameters (`/P` 1, 2, or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocMdpPermission {
    NoChangesAllowed,
    FormFillingAndSigning,
    FormFillingSigningAndAnnotations,
}

impl DocMdpPermission {
    pub fn from_p_value(p: i64) -> Option<Self> {
        match p {
            1 => Some(DocMdpPermission::NoChangesAllowed),
            2 => Some(DocMdpPermission::FormFillingAndSigning),
            3 => Some(DocMdpPermission::FormFillingSigningAndAnnotations),
            _ => None,
        }
    }
}

/// Everything [`crate::validate_all_signatures`] reports for one located
/// signature field.
#[derive(Debug, Clone)]
pub struct SignatureReport {
    pub field_name: Option<String>,
    pub signer: Option<SignerInfo>,
    /// `ByteRange` reaches exactly to the end of the file being validated —
    /// a later revision's signature does not, by construction, cover a
    /// revision appended after it.
    pub covers_current_file: bool,
    pub byte_range_digest_ok: bool,
    pub cms_valid: bool,
    /// `covers_current_file && byte_range_digest_ok && cms_valid`
    /// (Open Question decision #1).
    pub document_intact: bool,
    pub chain_trusted: Option<bool>,
    pub revocation: Option<RevocationReport>,
    pub policy_status: Option<Severity>,
    pub timestamp_status: Option<Severity>,
    pub doc_mdp: Option<DocMdpPermission>,
    pub signing_time: Option<DateTime<Utc>>,
    pub issues: Vec<Issue>,
}

impl SignatureReport {
    pub(crate) fn failed(field_name: Option<String>, issue: Issue) -> Self {
        SignatureReport {
            field_name,
            signer: None,
            covers_current_file: false,
            byte_range_digest_ok: false,
            cms_valid: false,
            document_intact: false,
            chain_trusted: None,
            revocation: None,
            policy_status: None,
            timestamp_status: None,
            doc_mdp: None,
            signing_time: None,
            issues: vec![issue],
        }
    }
}

/// Top-level result of [`crate::validate_all_signatures`].
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub signatures: Vec<SignatureReport>,
    /// `true` iff every signature's `document_intact` is `true`.
    pub all_documents_intact: bool,
}

impl ValidationReport {
    pub(crate) fn from_signatures(signatures: Vec<SignatureReport>) -> Self {
        let all_documents_intact = !signatures.is_empty() && signatures.iter().all(|s| s.document_intact);
        ValidationReport { signatures, all_documents_intact }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_conversion_of_small_value() {
        assert_eq!(unsigned_bytes_to_decimal(&[0x01, 0x00]), "256");
        assert_eq!(unsigned_bytes_to_decimal(&[0x00]), "0");
        assert_eq!(unsigned_bytes_to_decimal(&[0xff]), "255");
    }

    #[test]
    fn all_documents_intact_requires_every_signature() {
        let good = SignatureReport {
            field_name: None,
            signer: None,
            covers_current_file: true,
            byte_range_digest_ok: true,
            cms_valid: true,
            document_intact: true,
            chain_trusted: None,
            revocation: None,
            policy_status: None,
            timestamp_status: None,
            doc_mdp: None,
            signing_time: None,
            issues: vec![],
        };
        let mut bad = good.clone();
        bad.document_intact = false;
        assert!(ValidationReport::from_signatures(vec![good.clone()]).all_documents_intact);
        assert!(!ValidationReport::from_signatures(vec![good, bad]).all_documents_intact);
    }
}
