//! CRL-based revocation checking: signature verification against the
//! issuing CA, validity-window check with configurable clock skew, and
//! serial lookup.

use crate::crypto;
use crate::error::{Error, Result};
use crate::x509::{CrlFile, X509Certificate};
use chrono::{DateTime, Duration, Utc};

use super::RevocationStatus;

/// Verify `crl`'s signature against `issuer`, confirm `at` (adjusted by
/// `skew`) falls within `[thisUpdate, nextUpdate]`, and look up `cert`'s
/// serial number.
///
/// Returns `Err(Error::CrlSignatureInvalid)` only for a structurally sound
/// CRL whose signature does not verify — a forged or substituted CRL is a
/// hard failure, never silently downgraded to "unknown". A CRL that has
/// simply gone stale (outside its validity window) yields
/// `RevocationStatus::Unknown` instead, since a stale-but-authentic CRL
/// carries no information about this instant.
pub fn check(cert: &X509Certificate, issuer: &X509Certificate, crl: &CrlFile, at: DateTime<Utc>, skew: Duration) -> Result<RevocationStatus> {
    let sig_ok = crypto::verify(&crl.sig_alg, None, None, &crl.tbs_der, &crl.sig_bits, &issuer.spki);
    if !sig_ok {
        return Err(Error::CrlSignatureInvalid);
    }

    let in_window = at + skew >= crl.this_update && crl.next_update.map_or(true, |nu| at <= nu + skew);
    if !in_window {
        return Ok(RevocationStatus::Unknown);
    }

    Ok(match crl.find_serial(&cert.serial) {
        Some(entry) => RevocationStatus::Revoked { at: Some(entry.revocation_date), reason: entry.reason.clone() },
        None => RevocationStatus::Good,
    })
}
