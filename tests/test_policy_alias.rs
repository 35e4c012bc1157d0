//! ICP-Brasil policy OID family aliasing (spec.md §8, scenario 6): a
//! catalogue entry registered under one member of an AD-RB v2 alias pair
//! (`F` vs `F+5`) is found for a signature declaring the *other* member, and
//! a signing time outside the resolved entry's `SigningPeriod` is reported
//! as `policy_time_after_validity`.

mod common;

use chrono::{DateTime, Utc};
use icp_sign_core::cms::CmsSignedData;
use icp_sign_core::policy::{self, PolicyConstraints};
use std::collections::HashMap;

const CLAIMED_OID: &str = "2.16.76.1.7.1.1.2.3";
const CATALOGUE_ALIAS_OID: &str = "2.16.76.1.7.1.6.2.3";

fn signer_info_with_policy(policy_oid: &str, signing_time: &str) -> icp_sign_core::cms::SignerInfo {
    let cert = common::self_signed("Policy Alias Signer", 9);
    let content = b"the signed bytes";
    let pkcs7 = common::build_signed_cms(content, &cert.key, &cert.der, Some(signing_time), Some(policy_oid));
    let parsed = CmsSignedData::parse(&pkcs7).unwrap();
    parsed.signer_infos.into_iter().next().unwrap()
}

#[test]
fn catalogue_entry_under_alias_family_is_found() {
    let signer = signer_info_with_policy(CLAIMED_OID, "240601000000Z");

    let mut catalogue = HashMap::new();
    let constraints = PolicyConstraints {
        not_before: Some("2020-01-01T00:00:00Z".parse().unwrap()),
        not_after: Some("2030-01-01T00:00:00Z".parse().unwrap()),
        ..Default::default()
    };
    catalogue.insert(CATALOGUE_ALIAS_OID.to_string(), constraints);

    let at: DateTime<Utc> = "2024-06-01T00:00:00Z".parse().unwrap();
    let evaluation = policy::evaluate(&signer, 2048, at, true, &catalogue);

    assert!(
        !evaluation.issues.iter().any(|i| i.code == "policy_oid_not_found"),
        "alias lookup should have found the catalogue entry: {:?}",
        evaluation.issues
    );
    assert!(
        !evaluation.issues.iter().any(|i| i.code == "policy_time_after_validity" || i.code == "policy_time_before_validity"),
        "signing time is within the resolved entry's validity window: {:?}",
        evaluation.issues
    );
}

#[test]
fn signing_time_after_resolved_entrys_validity_is_an_error() {
    let signer = signer_info_with_policy(CLAIMED_OID, "320601000000Z");

    let mut catalogue = HashMap::new();
    let constraints = PolicyConstraints {
        not_before: Some("2020-01-01T00:00:00Z".parse().unwrap()),
        not_after: Some("2030-01-01T00:00:00Z".parse().unwrap()),
        ..Default::default()
    };
    catalogue.insert(CATALOGUE_ALIAS_OID.to_string(), constraints);

    // Evaluated as of a signing time past the catalogue entry's NotAfter.
    let at: DateTime<Utc> = "2032-06-01T00:00:00Z".parse().unwrap();
    let evaluation = policy::evaluate(&signer, 2048, at, true, &catalogue);

    assert!(evaluation.issues.iter().any(|i| i.code == "policy_time_after_validity"), "issues: {:?}", evaluation.issues);
}
