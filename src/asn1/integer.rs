//! Arbitrary-precision ASN.1 INTEGER, represented as raw two's-complement
//! bytes rather than lifted into a bignum type. Certificate serials, RSA
//! moduli/exponents, and CRL serials only ever need big-endian bytes; the
//! one place that needs actual bignum arithmetic is RSA signature
//! verification, which lifts bytes into `rsa::BigUint` at the point of use
//! (see `crate::crypto`).

/// An ASN.1 INTEGER's minimal two's-complement big-endian encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Integer(Vec<u8>);

impl Integer {
    /// Construct from DER content bytes, rejecting non-minimal encodings
    /// (a leading 0x00 not needed to disambiguate sign, or a leading 0xff
    /// not needed to extend a negative number).
    pub fn from_der_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        if bytes.len() > 1 {
            let redundant_zero = bytes[0] == 0x00 && bytes[1] & 0x80 == 0;
            let redundant_ff = bytes[0] == 0xff && bytes[1] & 0x80 != 0;
            if redundant_zero || redundant_ff {
                return None;
            }
        }
        Some(Integer(bytes.to_vec()))
    }

    /// Construct from an `i64`, producing the minimal DER encoding.
    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            return Integer(vec![0]);
        }
        let mut bytes = value.to_be_bytes().to_vec();
        while bytes.len() > 1 {
            let (first, second) = (bytes[0], bytes[1]);
            let redundant_zero = first == 0x00 && second & 0x80 == 0;
            let redundant_ff = first == 0xff && second & 0x80 != 0;
            if redundant_zero || redundant_ff {
                bytes.remove(0);
            } else {
                break;
            }
        }
        Integer(bytes)
    }

    /// Construct a non-negative integer from unsigned big-endian magnitude
    /// bytes, adding a leading 0x00 if the high bit is set.
    pub fn from_unsigned_be(magnitude: &[u8]) -> Self {
        let trimmed: &[u8] = {
            let mut i = 0;
            while i + 1 < magnitude.len() && magnitude[i] == 0 {
                i += 1;
            }
            &magnitude[i..]
        };
        if trimmed.is_empty() {
            return Integer(vec![0]);
        }
        if trimmed[0] & 0x80 != 0 {
            let mut v = Vec::with_capacity(trimmed.len() + 1);
            v.push(0);
            v.extend_from_slice(trimmed);
            Integer(v)
        } else {
            Integer(trimmed.to_vec())
        }
    }

    pub fn is_negative(&self) -> bool {
        self.0[0] & 0x80 != 0
    }

    /// Minimal DER content bytes (two's-complement, as they'd appear inside
    /// the INTEGER TLV).
    pub fn der_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unsigned big-endian magnitude, with any DER sign-disambiguation
    /// leading zero stripped. Panics only logically invalid for negative
    /// integers (callers use this for serials/moduli, which are always
    /// non-negative per X.509/PKCS#1).
    pub fn to_unsigned_bytes_be(&self) -> Vec<u8> {
        let mut b = self.0.as_slice();
        while b.len() > 1 && b[0] == 0 {
            b = &b[1..];
        }
        b.to_vec()
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.0.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        let fill = if self.is_negative() { 0xff } else { 0x00 };
        buf.fill(fill);
        buf[8 - self.0.len()..].copy_from_slice(&self.0);
        Some(i64::from_be_bytes(buf))
    }

    /// Lowercase hex of the unsigned magnitude (common rendering for
    /// certificate serial numbers in reports).
    pub fn to_hex(&self) -> String {
        self.to_unsigned_bytes_be().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn encode_der(&self) -> Vec<u8> {
        super::encode_tlv(super::Class::Universal, false, super::TAG_INTEGER, &self.0)
    }
}

impl std::fmt::Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_redundant_leading_zero() {
        assert!(Integer::from_der_bytes(&[0x00, 0x01]).is_none());
        assert!(Integer::from_der_bytes(&[0x00, 0x80]).is_some());
    }

    #[test]
    fn from_i64_roundtrip() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, i64::MAX, i64::MIN] {
            let i = Integer::from_i64(v);
            assert_eq!(i.as_i64(), Some(v), "failed for {v}");
        }
    }

    #[test]
    fn unsigned_magnitude_strips_sign_byte() {
        let i = Integer::from_unsigned_be(&[0x80, 0x01]);
        assert_eq!(i.der_bytes(), &[0x00, 0x80, 0x01]);
        assert_eq!(i.to_unsigned_bytes_be(), vec![0x80, 0x01]);
    }

    #[test]
    fn hex_rendering() {
        let i = Integer::from_unsigned_be(&[0xab, 0xcd]);
        assert_eq!(i.to_hex(), "abcd");
    }
}
