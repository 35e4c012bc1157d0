//! X.509 `Name` (RDNSequence): an ordered sequence of SETs of
//! `(AttributeType, AttributeValue)` pairs.
//!
//! Equality and hashing are defined on the canonical DER encoding only,
//! never on the textual rendering — two names that decode to the same
//! bytes are the same name regardless of which directory-string type was
//! used to encode a given attribute. `Display` exists purely for reports.

use crate::asn1::{self, Class, Node, Oid, TAG_SEQUENCE, TAG_SET};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Name {
    /// Sequence of RDN sets, each a list of (attribute OID, string value).
    pub rdns: Vec<Vec<(Oid, String)>>,
    /// The exact DER bytes of the whole `Name` SEQUENCE, as seen on the wire.
    der: Vec<u8>,
}

impl Name {
    pub fn parse(node: &Node<'_>) -> Result<Self> {
        node.expect_universal(TAG_SEQUENCE)?;
        let mut rdns = Vec::new();
        for set_node in node.children()? {
            set_node.expect_universal(TAG_SET)?;
            let mut attrs = Vec::new();
            for attr_node in set_node.children()? {
                let pair = attr_node.as_sequence()?;
                if pair.len() != 2 {
                    return Err(Error::Asn1NonCanonical {
                        offset: attr_node.span.0,
                        reason: "AttributeTypeAndValue must have exactly two elements".into(),
                    });
                }
                let oid = pair[0].as_oid()?;
                let value = pair[1].as_any_string().unwrap_or_else(|_| {
                    pair[1].content.iter().map(|b| format!("{b:02x}")).collect()
                });
                attrs.push((oid, value));
            }
            rdns.push(attrs);
        }
        let der = asn1::encode_tlv(
            Class::Universal,
            true,
            TAG_SEQUENCE,
            node.content,
        );
        Ok(Name { rdns, der })
    }

    /// Canonical DER bytes of this Name, as it appeared in its owning
    /// certificate/CRL. Equality must be computed on this, never `Display`.
    pub fn der_bytes(&self) -> &[u8] {
        &self.der
    }

    /// First attribute value for the given OID across all RDNs, in order.
    pub fn get(&self, oid: &Oid) -> Option<&str> {
        self.rdns
            .iter()
            .flatten()
            .find(|(o, _)| o == oid)
            .map(|(_, v)| v.as_str())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get(&crate::asn1::oid::well_known::at_common_name())
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}
impl Eq for Name {}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .rdns
            .iter()
            .flatten()
            .map(|(oid, v)| format!("{oid}={v}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::{decode_tlv, encode_sequence, encode_set_of_sorted, oid::well_known, Class, TAG_PRINTABLE_STRING};

    fn printable(s: &str) -> Vec<u8> {
        asn1::encode_tlv(Class::Universal, false, TAG_PRINTABLE_STRING, s.as_bytes())
    }

    fn attr(oid: Oid, value: &str) -> Vec<u8> {
        encode_sequence(&[oid.encode_der(), printable(value)])
    }

    #[test]
    fn equality_is_on_der_not_display() {
        let name_der = encode_sequence(&[encode_set_of_sorted(vec![attr(
            well_known::at_common_name(),
            "Alice",
        )])]);
        let (node, _) = decode_tlv(&name_der, 0).unwrap();
        let name = Name::parse(&node).unwrap();
        assert_eq!(name.common_name(), Some("Alice"));

        let (node2, _) = decode_tlv(&name_der, 0).unwrap();
        let name2 = Name::parse(&node2).unwrap();
        assert_eq!(name, name2);
    }
}
