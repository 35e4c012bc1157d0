//! LPA (Lista de Políticas de Assinatura) parsing: the ICP-Brasil catalogue
//! of signature policies, published in both a DER encoding and an
//! equivalent ETSI-flavored XML encoding. Either form produces the same
//! normalized [`Lpa`]/[`PolicyInfo`] shape.

use crate::asn1::{self, Node, Oid, TAG_GENERALIZED_TIME, TAG_INTEGER, TAG_SEQUENCE, TAG_UTC_TIME};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One policy's validity window, revocation date, and digest-pinning entry
/// as published in the LPA.
#[derive(Debug, Clone)]
pub struct PolicyInfo {
    pub oid: Oid,
    pub not_before: DateTime<Utc>,
    pub not_after: Option<DateTime<Utc>>,
    pub revocation_date: Option<DateTime<Utc>>,
    /// `(digest algorithm, digest value)` of the policy document itself,
    /// from `PolicyDigestAndURI/PolicyDigest`.
    pub digest: Option<(Oid, Vec<u8>)>,
    pub policy_uri: Option<String>,
}

/// A parsed LPA: the full catalogue of published policies plus the
/// `nextUpdate` instant past which the catalogue itself is stale.
#[derive(Debug, Clone)]
pub struct Lpa {
    pub policies: Vec<PolicyInfo>,
    pub next_update: DateTime<Utc>,
}

impl Lpa {
    /// `SEQUENCE { version? INTEGER, policyInfos SEQUENCE OF PolicyInfo,
    /// nextUpdate GeneralizedTime }`, the LPA format v2 DER layout.
    pub fn parse_der(der: &[u8]) -> Result<Self> {
        let (top, _) = asn1::decode_tlv(der, 0)?;
        let fields = top.as_sequence()?;
        let mut idx = 0;
        if fields[idx].tag.number == TAG_INTEGER {
            idx += 1;
        }
        let policies = fields[idx].as_sequence()?.iter().map(parse_policy_info_der).collect::<Result<Vec<_>>>()?;
        idx += 1;
        let next_update = fields[idx].as_time()?;
        Ok(Lpa { policies, next_update })
    }

    /// `PolicyInfo/SigningPeriod/{NotBefore,NotAfter}`, `RevocationDate`,
    /// `Identifier = urn:oid:…`, `PolicyDigestAndURI/{PolicyURI,
    /// PolicyDigest/{DigestMethod,DigestValue}}`, the LPA XML layout.
    pub fn parse_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut policies = Vec::new();
        let mut next_update = None;

        let mut element_stack: Vec<String> = Vec::new();
        let mut current: Option<PartialPolicyInfo> = None;
        let mut digest_method: Option<String> = None;

        loop {
            match reader.read_event().map_err(|e| Error::InvalidPdf(format!("LPA XML parse error: {e}")))? {
                Event::Start(e) | Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name == "PolicyInfo" {
                        current = Some(PartialPolicyInfo::default());
                    }
                    if name == "DigestMethod" {
                        digest_method = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"Algorithm")
                            .map(|a| String::from_utf8_lossy(&a.value).to_string());
                    }
                    element_stack.push(name);
                },
                Event::Text(e) => {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    let tag = element_stack.last().cloned().unwrap_or_default();
                    match tag.as_str() {
                        "Identifier" => {
                            if let Some(p) = current.as_mut() {
                                let dotted = text.strip_prefix("urn:oid:").unwrap_or(&text);
                                p.oid = Oid::from_str_dotted(dotted);
                            }
                        },
                        "NotBefore" => {
                            if let Some(p) = current.as_mut() {
                                p.not_before = parse_xml_datetime(&text);
                            }
                        },
                        "NotAfter" => {
                            if let Some(p) = current.as_mut() {
                                p.not_after = parse_xml_datetime(&text);
                            }
                        },
                        "RevocationDate" => {
                            if let Some(p) = current.as_mut() {
                                p.revocation_date = parse_xml_datetime(&text);
                            }
                        },
                        "PolicyURI" => {
                            if let Some(p) = current.as_mut() {
                                p.policy_uri = Some(text);
                            }
                        },
                        "DigestValue" => {
                            if let Some(p) = current.as_mut() {
                                if let (Some(alg_uri), Ok(value)) = (&digest_method, base64_decode(&text)) {
                                    if let Some(alg) = xmlenc_uri_to_oid(alg_uri) {
                                        p.digest = Some((alg, value));
                                    }
                                }
                            }
                        },
                        "NextUpdate" => {
                            next_update = parse_xml_datetime(&text);
                        },
                        _ => {},
                    }
                },
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name == "PolicyInfo" {
                        if let Some(p) = current.take() {
                            if let (Some(oid), Some(not_before)) = (p.oid, p.not_before) {
                                policies.push(PolicyInfo {
                                    oid,
                                    not_before,
                                    not_after: p.not_after,
                                    revocation_date: p.revocation_date,
                                    digest: p.digest,
                                    policy_uri: p.policy_uri,
                                });
                            }
                        }
                    }
                    element_stack.pop();
                },
                Event::Eof => break,
                _ => {},
            }
        }

        let next_update = next_update.ok_or_else(|| Error::InvalidPdf("LPA XML is missing NextUpdate".into()))?;
        Ok(Lpa { policies, next_update })
    }

    pub fn is_stale(&self, at: DateTime<Utc>) -> bool {
        at > self.next_update
    }

    pub fn find(&self, oid: &Oid) -> Option<&PolicyInfo> {
        self.policies.iter().find(|p| &p.oid == oid)
    }
}

#[derive(Default)]
struct PartialPolicyInfo {
    oid: Option<Oid>,
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
    revocation_date: Option<DateTime<Utc>>,
    digest: Option<(Oid, Vec<u8>)>,
    policy_uri: Option<String>,
}

fn parse_policy_info_der(node: &Node<'_>) -> Result<PolicyInfo> {
    let fields = node.as_sequence()?;
    let oid = fields[0].as_oid()?;
    let not_before = fields[1].as_time()?;

    let mut idx = 2;
    let mut not_after = None;
    if idx < fields.len() && matches!(fields[idx].tag.number, TAG_UTC_TIME | TAG_GENERALIZED_TIME) {
        not_after = Some(fields[idx].as_time()?);
        idx += 1;
    }
    let mut revocation_date = None;
    if idx < fields.len() && matches!(fields[idx].tag.number, TAG_UTC_TIME | TAG_GENERALIZED_TIME) {
        revocation_date = Some(fields[idx].as_time()?);
        idx += 1;
    }
    let mut digest = None;
    if idx < fields.len() && fields[idx].tag.number == TAG_SEQUENCE {
        let digest_fields = fields[idx].as_sequence()?;
        if digest_fields.len() >= 2 {
            let alg_fields = digest_fields[0].as_sequence()?;
            if let Ok(alg) = alg_fields[0].as_oid() {
                if let Ok(value) = digest_fields[1].as_octet_string() {
                    digest = Some((alg, value.to_vec()));
                }
            }
        }
        idx += 1;
    }
    let policy_uri = fields.get(idx).and_then(|f| f.as_any_string().ok());

    Ok(PolicyInfo { oid, not_before, not_after, revocation_date, digest, policy_uri })
}

fn parse_xml_datetime(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.with_timezone(&Utc))
}

/// XML digest-method URIs (XML-DSig / XML-Enc) to their OID equivalents —
/// the normalization needed before comparing against a CMS
/// `signature-policy-identifier` hash, which always carries a plain OID.
fn xmlenc_uri_to_oid(uri: &str) -> Option<Oid> {
    use crate::asn1::oid::well_known;
    Some(match uri {
        "http://www.w3.org/2000/09/xmldsig#sha1" => well_known::sha1(),
        "http://www.w3.org/2001/04/xmlenc#sha256" => well_known::sha256(),
        "http://www.w3.org/2001/04/xmldsig-more#sha384" => well_known::sha384(),
        "http://www.w3.org/2001/04/xmlenc#sha512" => well_known::sha512(),
        _ => return None,
    })
}

fn base64_decode(text: &str) -> std::result::Result<Vec<u8>, ()> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(text.as_bytes()).map_err(|_| ())
}
