//! Revocation checking (C7): CRL and OCSP, combined into one
//! [`RevocationResult`] per certificate.
//!
//! Neither sub-module retries or caches a fetch on its own behalf — that
//! policy lives in the caller's [`crate::capabilities::RevocationFetcher`]
//! implementation. This module only decides *which* sources to consult and
//! how to reconcile disagreeing answers (spec.md §4.7: OCSP is tried first
//! when an AIA URL is present and a fetcher is supplied; CRL is consulted
//! when OCSP yields nothing usable; a `revoked` verdict from either source
//! wins over `good`).

pub mod crl;
pub mod ocsp;

use crate::capabilities::RevocationFetcher;
use crate::x509::X509Certificate;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum RevocationStatus {
    Good,
    Revoked { at: Option<DateTime<Utc>>, reason: Option<String> },
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationSource {
    None,
    Ocsp,
    Crl,
    Mixed,
}

#[derive(Debug, Clone)]
pub struct RevocationResult {
    pub status: RevocationStatus,
    pub source: RevocationSource,
}

/// Classify `cert`'s revocation status as of `at`, preferring OCSP over CRL
/// and falling back to CRL only when OCSP produced nothing usable. `fetcher`
/// being `None` (no revocation awareness configured) always yields
/// `source: None, status: Unknown`.
pub fn evaluate(
    cert: &X509Certificate,
    issuer: &X509Certificate,
    at: DateTime<Utc>,
    skew: Duration,
    fetcher: Option<&dyn RevocationFetcher>,
) -> RevocationResult {
    let Some(fetcher) = fetcher else {
        return RevocationResult { status: RevocationStatus::Unknown, source: RevocationSource::None };
    };

    let mut ocsp_status = None;
    for url in issuer.authority_info_access().ocsp_uris {
        let request = ocsp::build_request(cert, issuer);
        let Ok(response_der) = fetcher.fetch_ocsp(&url, &request) else { continue };
        if let Ok(status) = ocsp::check(cert, issuer, &response_der, at, skew) {
            ocsp_status = Some(status);
            break;
        }
    }

    let mut crl_status = None;
    let ocsp_is_usable = matches!(ocsp_status, Some(RevocationStatus::Good) | Some(RevocationStatus::Revoked { .. }));
    if !ocsp_is_usable {
        for url in cert.crl_distribution_point_uris() {
            let Ok(crl_der) = fetcher.fetch_crl(&url) else { continue };
            let Ok(crl_file) = crate::x509::CrlFile::parse(&crl_der) else { continue };
            if let Ok(status) = crl::check(cert, issuer, &crl_file, at, skew) {
                crl_status = Some(status);
                break;
            }
        }
    }

    combine(ocsp_status, crl_status)
}

fn combine(ocsp: Option<RevocationStatus>, crl: Option<RevocationStatus>) -> RevocationResult {
    match (ocsp, crl) {
        (Some(o), Some(c)) => {
            let revoked = match (&o, &c) {
                (RevocationStatus::Revoked { .. }, _) => Some(o.clone()),
                (_, RevocationStatus::Revoked { .. }) => Some(c.clone()),
                _ => None,
            };
            let status = match revoked {
                Some(r) => r,
                None if o == RevocationStatus::Good || c == RevocationStatus::Good => RevocationStatus::Good,
                None => RevocationStatus::Unknown,
            };
            RevocationResult { status, source: RevocationSource::Mixed }
        },
        (Some(status), None) => RevocationResult { status, source: RevocationSource::Ocsp },
        (None, Some(status)) => RevocationResult { status, source: RevocationSource::Crl },
        (None, None) => RevocationResult { status: RevocationStatus::Unknown, source: RevocationSource::None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fetcher_yields_unknown_with_no_source() {
        let result = combine(None, None);
        assert_eq!(result.status, RevocationStatus::Unknown);
        assert_eq!(result.source, RevocationSource::None);
    }

    #[test]
    fn disagreement_between_sources_prefers_revoked() {
        let result = combine(Some(RevocationStatus::Good), Some(RevocationStatus::Revoked { at: None, reason: None }));
        assert_eq!(result.status, RevocationStatus::Revoked { at: None, reason: None });
        assert_eq!(result.source, RevocationSource::Mixed);
    }
}
