//! PDF signature slot locator: byte-exact `/ByteRange`/`/Contents`
//! discovery.
//!
//! Three independent strategies, required to agree on every well-formed
//! input: a fast byte-level scan, a Latin-1 decoded fallback scan, and an
//! authoritative tier that walks the real cross-reference table (reusing
//! the `xref`/`object`/`lexer`/`parser` layer) to confirm which
//! `/ByteRange` occurrences are genuine signature dictionary offsets before
//! re-running the same local byte extraction anchored there.
//! `LocatorStrategy` selects among the three per call rather than through
//! any crate-global flag.

use crate::error::{Error, Result};
use crate::lexer::token;
use crate::object::{Object, ObjectRef};
use crate::parser::parse_object;
use crate::xref::{self, CrossRefTable};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocatorStrategy {
    FastScan,
    #[default]
    AuthoritativeXref,
    CrossCheck,
}

/// A located signature field: its `/ByteRange`, the exact `<...>` hex
/// region of `/Contents`, and the file offset of its signature dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSlot {
    pub field_name: Option<String>,
    pub byte_range: [i64; 4],
    /// Offset of the first hex digit (just after `<`).
    pub contents_start: usize,
    /// Offset of the closing `>`.
    pub contents_end: usize,
    pub sig_dict_offset: usize,
}

impl SignatureSlot {
    pub fn contents_hex(&self, bytes: &[u8]) -> &[u8] {
        &bytes[self.contents_start..self.contents_end]
    }

    /// Decode the `/Contents` hex digest into raw PKCS#7 DER bytes.
    pub fn contents_der(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        decode_hex_lenient(self.contents_hex(bytes))
    }

    /// `revision_length` this slot's `ByteRange` claims to cover.
    pub fn covered_length(&self) -> i64 {
        self.byte_range[0] + self.byte_range[1] + self.byte_range[3] + (self.contents_end as i64 - self.contents_start as i64 + 2)
    }
}

fn decode_hex_lenient(hex: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex.iter().copied().filter(u8::is_ascii_hexdigit).collect();
    let mut out = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        if pair.len() < 2 {
            break; // odd trailing nibble (shouldn't happen for well-formed placeholders)
        }
        let hi = (pair[0] as char).to_digit(16).ok_or(Error::PdfContentsOutsideGap)?;
        let lo = (pair[1] as char).to_digit(16).ok_or(Error::PdfContentsOutsideGap)?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    if needle.is_empty() || haystack.len() < needle.len() {
        return out;
    }
    for i in 0..=haystack.len() - needle.len() {
        if &haystack[i..i + needle.len()] == needle {
            out.push(i);
        }
    }
    out
}

/// Parse a `/ByteRange [ n n n n ]` literal starting at `open_bracket` (the
/// index of `[`). Returns the 4 numbers and the index just past `]`.
fn parse_byte_range_array(bytes: &[u8], open_bracket: usize, latin1: bool) -> Result<([i64; 4], usize)> {
    if bytes.get(open_bracket) != Some(&b'[') {
        return Err(Error::PdfByteRangeMalformed("expected '['".into()));
    }
    let close = bytes[open_bracket..]
        .iter()
        .position(|&b| b == b']')
        .map(|p| open_bracket + p)
        .ok_or_else(|| Error::PdfByteRangeMalformed("missing ']'".into()))?;
    let raw = &bytes[open_bracket + 1..close];
    let inner = if latin1 {
        // Latin-1: every byte is its own Unicode scalar value 0..=255 — a
        // deliberately distinct decode path from the strict-UTF-8 fast scan.
        raw.iter().map(|&b| b as char).collect::<String>()
    } else {
        std::str::from_utf8(raw).map_err(|_| Error::PdfByteRangeMalformed("non-UTF8 ByteRange".into()))?.to_string()
    };
    let nums: Vec<i64> = inner
        .split_whitespace()
        .map(str::parse::<i64>)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::PdfByteRangeMalformed(format!("non-numeric token in {inner:?}")))?;
    if nums.len() != 4 {
        return Err(Error::PdfByteRangeMalformed(format!("expected 4 numbers, found {}", nums.len())));
    }
    Ok(([nums[0], nums[1], nums[2], nums[3]], close + 1))
}

/// Find the `<...>` hex region of the `/Contents` entry nearest after
/// `search_from`. Returns (hex_start, hex_end), indices just inside `<`/`>`.
fn find_contents_hex_region(bytes: &[u8], search_from: usize) -> Result<(usize, usize)> {
    let window_end = (search_from + 8192).min(bytes.len());
    if search_from >= window_end {
        return Err(Error::PdfContentsNotFound);
    }
    let marker = b"/Contents";
    let rel = bytes[search_from..window_end].windows(marker.len()).position(|w| w == marker).ok_or(Error::PdfContentsNotFound)?;
    let mut i = search_from + rel + marker.len();
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::PdfContentsNotFound);
    }
    let start = i + 1;
    let end = bytes[start..].iter().position(|&b| b == b'>').map(|p| start + p).ok_or(Error::PdfContentsNotFound)?;
    Ok((start, end))
}

fn find_dict_start_before(bytes: &[u8], before: usize) -> usize {
    let window_start = before.saturating_sub(4096);
    bytes[window_start..before].windows(2).rposition(|w| w == b"<<").map(|p| window_start + p).unwrap_or(before)
}

fn field_name_near(bytes: &[u8], sig_dict_offset: usize) -> Option<String> {
    let window_start = sig_dict_offset.saturating_sub(4096);
    let window = &bytes[window_start..sig_dict_offset.min(bytes.len())];
    let marker = b"/T ";
    if window.len() < marker.len() {
        return None;
    }
    let rel = window.windows(marker.len()).rposition(|w| w == marker)?;
    let mut i = window_start + rel + marker.len();
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i += 1;
    let start = i;
    let end = bytes[start..].iter().position(|&b| b == b')').map(|p| start + p)?;
    std::str::from_utf8(&bytes[start..end]).ok().map(str::to_string)
}

/// Tiers (a)/(b): scan every `/ByteRange [...]` occurrence and pair it with
/// the nearest following `/Contents <...>`.
fn scan_byte_ranges(bytes: &[u8], latin1: bool) -> Result<Vec<SignatureSlot>> {
    let mut slots = Vec::new();
    for offset in find_all(bytes, b"/ByteRange") {
        let mut i = offset + b"/ByteRange".len();
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
            i += 1;
        }
        if bytes.get(i) != Some(&b'[') {
            continue;
        }
        let (byte_range, after) = parse_byte_range_array(bytes, i, latin1)?;
        let (contents_start, contents_end) = find_contents_hex_region(bytes, after)?;
        let sig_dict_offset = find_dict_start_before(bytes, offset);
        slots.push(SignatureSlot { field_name: field_name_near(bytes, sig_dict_offset), byte_range, contents_start, contents_end, sig_dict_offset });
    }
    if slots.is_empty() {
        return Err(Error::PdfByteRangeNotFound);
    }
    Ok(slots)
}

/// Parse the indirect object living at `offset`: `N G obj <object> endobj`.
/// Same token-skip + `parse_object` pattern as full xref-driven object
/// loading, adapted to operate on an in-memory buffer rather than a
/// `Read + Seek` stream.
pub(crate) fn load_object_at(bytes: &[u8], offset: usize) -> Result<Object> {
    let window_end = (offset + 1024 * 1024).min(bytes.len());
    let slice = bytes.get(offset..window_end).ok_or(Error::InvalidXref)?;
    let endobj_at = slice.windows(6).position(|w| w == b"endobj").map(|p| p + 6).unwrap_or(slice.len());
    let content = &slice[..endobj_at];

    let (rest, _) = token(content).map_err(|e| Error::ParseError { offset, reason: format!("object number: {e}") })?;
    let (rest, _) = token(rest).map_err(|e| Error::ParseError { offset, reason: format!("generation: {e}") })?;
    let (rest, _) = token(rest).map_err(|e| Error::ParseError { offset, reason: format!("'obj' keyword: {e}") })?;
    let (_, obj) = parse_object(rest).map_err(|e| Error::ParseError { offset, reason: format!("object body: {e}") })?;
    Ok(obj)
}

pub(crate) fn resolve(table: &CrossRefTable, bytes: &[u8], obj: &Object) -> Result<Object> {
    match obj {
        Object::Reference(r) => resolve_ref(table, bytes, *r, 0),
        other => Ok(other.clone()),
    }
}

pub(crate) fn resolve_ref(table: &CrossRefTable, bytes: &[u8], r: ObjectRef, depth: usize) -> Result<Object> {
    if depth > 32 {
        return Err(Error::LoopInChain);
    }
    let entry = table.get(r.id).ok_or(Error::InvalidXref)?;
    if entry.entry_type != xref::XRefEntryType::Uncompressed {
        // Object streams (compressed entries) are not needed by any
        // signature-field lookup this locator performs; treat as absent.
        return Err(Error::InvalidXref);
    }
    let obj = load_object_at(bytes, entry.offset as usize)?;
    match obj {
        Object::Reference(inner) => resolve_ref(table, bytes, inner, depth + 1),
        other => Ok(other),
    }
}

pub(crate) fn dict_get<'d>(dict: &'d std::collections::HashMap<String, Object>, key: &str) -> Option<&'d Object> {
    dict.get(key)
}

/// Walk `AcroForm/Fields` (recursing into `/Kids`) collecting every
/// signature-field value dictionary's confirmed object offset.
fn find_signature_field_offsets(table: &CrossRefTable, bytes: &[u8]) -> Result<Vec<usize>> {
    let trailer = table.trailer().ok_or(Error::InvalidXref)?;
    let root_ref = trailer.get("Root").and_then(Object::as_reference).ok_or(Error::InvalidXref)?;
    let catalog = resolve_ref(table, bytes, root_ref, 0)?;
    let catalog_dict = catalog.as_dict().ok_or(Error::InvalidXref)?;
    let Some(acroform_obj) = dict_get(catalog_dict, "AcroForm") else {
        return Ok(Vec::new());
    };
    let acroform = resolve(table, bytes, acroform_obj)?;
    let Some(acroform_dict) = acroform.as_dict() else {
        return Ok(Vec::new());
    };
    let Some(fields_obj) = dict_get(acroform_dict, "Fields") else {
        return Ok(Vec::new());
    };
    let fields = resolve(table, bytes, fields_obj)?;
    let Some(fields_arr) = fields.as_array() else {
        return Ok(Vec::new());
    };

    let mut offsets = Vec::new();
    let mut stack: Vec<Object> = fields_arr.clone();
    let mut guard = 0;
    while let Some(field_obj) = stack.pop() {
        guard += 1;
        if guard > 10_000 {
            break;
        }
        let field_offset = match &field_obj {
            Object::Reference(r) => table.get(r.id).map(|e| e.offset as usize),
            _ => None,
        };
        let field = resolve(table, bytes, &field_obj)?;
        let Some(field_dict) = field.as_dict() else { continue };

        if let Some(kids_obj) = dict_get(field_dict, "Kids") {
            if let Object::Array(kids) = resolve(table, bytes, kids_obj)? {
                stack.extend(kids);
            }
        }

        let is_sig_field = dict_get(field_dict, "FT").and_then(Object::as_name) == Some("Sig");
        if !is_sig_field {
            continue;
        }
        let Some(value_obj) = dict_get(field_dict, "V") else { continue };
        let Object::Reference(value_ref) = value_obj else { continue };
        let Some(entry) = table.get(value_ref.id) else { continue };
        if entry.entry_type == xref::XRefEntryType::Uncompressed {
            offsets.push(entry.offset as usize);
        }
        let _ = field_offset;
    }
    Ok(offsets)
}

fn locate_fast(bytes: &[u8]) -> Result<Vec<SignatureSlot>> {
    scan_byte_ranges(bytes, false)
}

fn locate_latin1(bytes: &[u8]) -> Result<Vec<SignatureSlot>> {
    scan_byte_ranges(bytes, true)
}

fn locate_authoritative(bytes: &[u8]) -> Result<Vec<SignatureSlot>> {
    let mut cursor = Cursor::new(bytes);
    let xref_offset = xref::find_xref_offset(&mut cursor)?;
    let table = xref::parse_xref(&mut cursor, xref_offset)?;
    let offsets = find_signature_field_offsets(&table, bytes)?;
    if offsets.is_empty() {
        return Err(Error::PdfByteRangeNotFound);
    }
    let mut slots = Vec::new();
    for sig_dict_offset in offsets {
        let window = &bytes[sig_dict_offset..(sig_dict_offset + 4096).min(bytes.len())];
        let rel = window.windows(b"/ByteRange".len()).position(|w| w == b"/ByteRange").ok_or(Error::PdfByteRangeNotFound)?;
        let mut i = sig_dict_offset + rel + b"/ByteRange".len();
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
            i += 1;
        }
        let (byte_range, after) = parse_byte_range_array(bytes, i, false)?;
        let (contents_start, contents_end) = find_contents_hex_region(bytes, after)?;
        slots.push(SignatureSlot { field_name: field_name_near(bytes, sig_dict_offset), byte_range, contents_start, contents_end, sig_dict_offset });
    }
    Ok(slots)
}

/// Locate every signature field's slot using `strategy`. `CrossCheck` runs
/// the fast scan and the authoritative tier and requires they agree —
/// every strategy must produce identical answers on well-formed input —
/// returning whichever has the richer offsets (authoritative).
pub fn locate_all(bytes: &[u8], strategy: LocatorStrategy) -> Result<Vec<SignatureSlot>> {
    match strategy {
        LocatorStrategy::FastScan => locate_fast(bytes),
        LocatorStrategy::AuthoritativeXref => locate_authoritative(bytes).or_else(|_| locate_fast(bytes)),
        LocatorStrategy::CrossCheck => {
            let fast = locate_fast(bytes)?;
            let latin1 = locate_latin1(bytes)?;
            if fast.len() != latin1.len() || fast.iter().zip(&latin1).any(|(a, b)| a.byte_range != b.byte_range) {
                return Err(Error::PdfByteRangeMalformed("fast and latin1 scans disagree".into()));
            }
            if let Ok(authoritative) = locate_authoritative(bytes) {
                if authoritative.len() != fast.len() {
                    return Err(Error::PdfByteRangeMalformed("authoritative tier disagrees with byte scans".into()));
                }
            }
            Ok(fast)
        },
    }
}

/// `extract_byte_range(bytes)`: the first (or only) signature's `ByteRange`.
pub fn extract_byte_range(bytes: &[u8]) -> Result<[i64; 4]> {
    Ok(locate_all(bytes, LocatorStrategy::AuthoritativeXref)?.remove(0).byte_range)
}

/// `find_contents_range(bytes)`: the first (or only) signature's `/Contents`
/// hex region, as `(start, end)` offsets just inside the angle brackets.
pub fn find_contents_range(bytes: &[u8]) -> Result<(usize, usize)> {
    let slot = locate_all(bytes, LocatorStrategy::AuthoritativeXref)?.remove(0);
    Ok((slot.contents_start, slot.contents_end))
}
