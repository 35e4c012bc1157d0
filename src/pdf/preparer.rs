//! PDF preparer/embedder: reserves a `/ByteRange`+`/Contents`
//! placeholder as a PDF incremental update and later splices a caller's
//! PKCS#7 DER blob into that placeholder without rehashing anything.
//!
//! Builds a real incremental-update revision on top of the document's own
//! object/xref layer rather than assuming the placeholder already exists
//! in caller-supplied bytes, using the same signature dictionary field
//! layout (`/M` date, hex-encoded `/Contents`) and zero-pad-to-width
//! `/ByteRange` technique common to PDF signing implementations.

use crate::config::PreparationOptions;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::pdf::slot::{self, LocatorStrategy};
use crate::xref::{self, CrossRefTable, XRefEntryType};
use base64::Engine;
use std::collections::HashMap;
use std::io::Cursor;

/// Bytes reserved for the hex-encoded `/Contents` placeholder when the
/// caller doesn't supply one, sized to comfortably hold a signer
/// certificate, a short chain, and an embedded RFC 3161 timestamp token or
/// OCSP response alongside the signature value itself.
pub const DEFAULT_RESERVE_BYTES: usize = 16_384;

/// The outcome of [`prepare_for_external_signing`]: a new revision of the
/// input document with a reserved signature slot, the `/ByteRange` that
/// slot claims to cover, and the digest of those covered bytes (so a
/// caller can hand `digest_base64` straight to a remote signer without
/// re-reading `prepared_bytes`).
#[derive(Debug, Clone)]
pub struct PreparedSignature {
    pub prepared_bytes: Vec<u8>,
    pub byte_range: [i64; 4],
    pub digest_base64: String,
}

/// Width, in decimal digits, reserved for each `/ByteRange` number. Chosen
/// so the placeholder and the final, real values always occupy exactly the
/// same number of bytes: fixing the `/ByteRange` widths before positioning
/// is what lets [`embed_pkcs7`] patch `/Contents` later without shifting
/// any other byte in the file.
const BYTE_RANGE_DIGIT_WIDTH: usize = 10;

fn byte_range_placeholder() -> String {
    let field = "0".repeat(BYTE_RANGE_DIGIT_WIDTH);
    format!("/ByteRange [{field} {field} {field} {field}]")
}

/// Reserve a signature slot in `bytes` as an incremental update: a new
/// signature dictionary, an optional visible widget annotation (merged
/// with the signature field per common PDF practice), the `AcroForm`
/// bookkeeping to reach it, and a trailing classic cross-reference section
/// chained to the original via `/Prev`.
pub fn prepare_for_external_signing(bytes: &[u8], options: &PreparationOptions) -> Result<PreparedSignature> {
    let reserve_bytes = options.reserve_bytes.unwrap_or(DEFAULT_RESERVE_BYTES);
    if reserve_bytes == 0 {
        return Err(Error::ReserveBytesTooSmall);
    }

    let mut cursor = Cursor::new(bytes);
    let xref_offset = xref::find_xref_offset(&mut cursor)?;
    let table = xref::parse_xref(&mut cursor, xref_offset)?;
    let trailer = table.trailer().ok_or(Error::InvalidXref)?.clone();
    let root_ref = trailer.get("Root").and_then(Object::as_reference).ok_or(Error::InvalidXref)?;
    let catalog_dict = load_dict(&table, bytes, root_ref)?;

    let mut next_id = table.all_object_numbers().max().unwrap_or(0) + 1;
    let mut alloc = || {
        let id = next_id;
        next_id += 1;
        id
    };

    let sig_id = alloc();
    let appearance_stream = options.appearance.as_ref().map(|cb| cb(&options.metadata, &options.rect));
    let ap_id = appearance_stream.as_ref().map(|_| alloc());
    let field_id = alloc();

    let page_info = match options.page {
        Some(index) => {
            let pages_ref =
                catalog_dict.get("Pages").and_then(Object::as_reference).ok_or_else(|| Error::InvalidPdf("catalog missing /Pages".into()))?;
            let mut leaves = Vec::new();
            collect_page_leaves(&table, bytes, pages_ref, 0, &mut leaves)?;
            let available = leaves.len() as u32;
            Some(leaves.into_iter().nth(index as usize).ok_or(Error::PageOutOfRange { requested: index, available })?)
        },
        None => None,
    };

    let existing_acroform = catalog_dict.get("AcroForm").and_then(Object::as_reference);
    let (acroform_id, acroform_gen, acroform_is_new) = match existing_acroform {
        Some(r) => (r.id, r.gen, false),
        None => (alloc(), 0u16, true),
    };

    let now = chrono::Utc::now();

    let mut buffer = bytes.to_vec();
    if buffer.last() != Some(&b'\n') {
        buffer.push(b'\n');
    }

    let mut offsets: HashMap<u32, u64> = HashMap::new();

    offsets.insert(sig_id, buffer.len() as u64);
    buffer.extend_from_slice(build_signature_object(sig_id, reserve_bytes, options, now).as_bytes());

    if let (Some(ap_id), Some(content)) = (ap_id, appearance_stream.as_ref()) {
        offsets.insert(ap_id, buffer.len() as u64);
        buffer.extend_from_slice(build_appearance_object(ap_id, options, content).as_bytes());
    }

    offsets.insert(field_id, buffer.len() as u64);
    buffer.extend_from_slice(build_field_object(field_id, sig_id, ap_id, page_info.as_ref().map(|(r, _)| *r), options).as_bytes());

    offsets.insert(acroform_id, buffer.len() as u64);
    buffer.extend_from_slice(build_acroform_object(acroform_id, acroform_gen, &table, bytes, existing_acroform, field_id)?.as_bytes());

    if acroform_is_new {
        offsets.insert(root_ref.id, buffer.len() as u64);
        buffer.extend_from_slice(build_catalog_object(root_ref, &catalog_dict, acroform_id)?.as_bytes());
    }

    if let Some((page_ref, page_dict)) = &page_info {
        offsets.insert(page_ref.id, buffer.len() as u64);
        buffer.extend_from_slice(build_page_object(*page_ref, page_dict, &table, bytes, field_id)?.as_bytes());
    }

    let size = next_id;
    let xref_start = buffer.len() as u64;
    buffer.extend_from_slice(build_xref_section(&offsets, size, root_ref.id, xref_offset).as_bytes());
    buffer.extend_from_slice(format!("{xref_start}\n%%EOF\n").as_bytes());

    let slots = slot::locate_all(&buffer, LocatorStrategy::FastScan)?;
    let sig_dict_offset = offsets[&sig_id];
    let target = slots
        .into_iter()
        .find(|s| s.sig_dict_offset as u64 == sig_dict_offset)
        .ok_or(Error::PdfByteRangeNotFound)?;

    let file_len = buffer.len() as i64;
    let before_sig = (target.contents_start - 1) as i64; // position of '<'
    let after_sig_start = (target.contents_end + 1) as i64; // position just past '>'
    let byte_range = [0i64, before_sig, after_sig_start, file_len - after_sig_start];

    patch_byte_range(&mut buffer, target.sig_dict_offset, &byte_range)?;

    let signed_bytes = extract_signed_bytes(&buffer, &byte_range)?;
    let digest = options.digest_alg.digest(&signed_bytes);
    let digest_base64 = base64::engine::general_purpose::STANDARD.encode(digest);

    Ok(PreparedSignature { prepared_bytes: buffer, byte_range, digest_base64 })
}

/// Splice a caller-supplied PKCS#7 DER blob into the first signature slot
/// of `prepared_bytes`, hex-encoding it and zero-padding the remainder of
/// the reserved placeholder. Never touches anything outside the
/// `/Contents` hex region, so `byte_range` from [`prepare_for_external_signing`]
/// remains valid against the returned bytes.
pub fn embed_pkcs7(prepared_bytes: &[u8], pkcs7_der: &[u8]) -> Result<Vec<u8>> {
    let target = slot::locate_all(prepared_bytes, LocatorStrategy::AuthoritativeXref)
        .or_else(|_| slot::locate_all(prepared_bytes, LocatorStrategy::FastScan))?
        .into_iter()
        .next()
        .ok_or(Error::PdfByteRangeNotFound)?;

    let placeholder_len = target.contents_end - target.contents_start;
    let hex = encode_hex_upper(pkcs7_der);
    if hex.len() > placeholder_len {
        return Err(Error::Pkcs7TooLarge { actual: pkcs7_der.len(), reserve: placeholder_len / 2 });
    }

    let mut out = prepared_bytes.to_vec();
    out[target.contents_start..target.contents_start + hex.len()].copy_from_slice(hex.as_bytes());
    for byte in out.iter_mut().take(target.contents_end).skip(target.contents_start + hex.len()) {
        *byte = b'0';
    }
    Ok(out)
}

fn load_dict(table: &CrossRefTable, bytes: &[u8], obj_ref: ObjectRef) -> Result<HashMap<String, Object>> {
    let entry = table.get(obj_ref.id).ok_or(Error::InvalidXref)?;
    if entry.entry_type != XRefEntryType::Uncompressed {
        return Err(Error::InvalidXref);
    }
    let obj = slot::load_object_at(bytes, entry.offset as usize)?;
    obj.as_dict().cloned().ok_or_else(|| Error::InvalidPdf(format!("object {} is not a dictionary", obj_ref.id)))
}

fn collect_page_leaves(
    table: &CrossRefTable,
    bytes: &[u8],
    node_ref: ObjectRef,
    depth: u32,
    out: &mut Vec<(ObjectRef, HashMap<String, Object>)>,
) -> Result<()> {
    if depth > 64 {
        return Err(Error::LoopInChain);
    }
    let dict = load_dict(table, bytes, node_ref)?;
    if dict.get("Type").and_then(Object::as_name) == Some("Pages") {
        let kids_obj = dict.get("Kids").ok_or_else(|| Error::InvalidPdf("/Pages node missing /Kids".into()))?;
        let kids = slot::resolve(table, bytes, kids_obj)?;
        let kids = kids.as_array().ok_or_else(|| Error::InvalidPdf("/Kids is not an array".into()))?;
        for kid in kids {
            let kid_ref = kid.as_reference().ok_or_else(|| Error::InvalidPdf("/Kids entry is not an indirect reference".into()))?;
            collect_page_leaves(table, bytes, kid_ref, depth + 1, out)?;
        }
    } else {
        out.push((node_ref, dict));
    }
    Ok(())
}

fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn format_pdf_date(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("D:{}Z", now.format("%Y%m%d%H%M%S"))
}

fn serialize_value(obj: &Object, out: &mut String) {
    match obj {
        Object::Null => out.push_str("null"),
        Object::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Object::Integer(i) => out.push_str(&i.to_string()),
        Object::Real(r) => out.push_str(&r.to_string()),
        Object::String(s) => {
            out.push('(');
            out.push_str(&escape_pdf_string(&String::from_utf8_lossy(s)));
            out.push(')');
        },
        Object::Name(n) => {
            out.push('/');
            out.push_str(n);
        },
        Object::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                serialize_value(item, out);
            }
            out.push(']');
        },
        Object::Dictionary(dict) => {
            out.push_str("<< ");
            for (k, v) in dict {
                out.push('/');
                out.push_str(k);
                out.push(' ');
                serialize_value(v, out);
                out.push(' ');
            }
            out.push_str(">>");
        },
        Object::Stream { dict, .. } => serialize_value(&Object::Dictionary(dict.clone()), out),
        Object::Reference(r) => out.push_str(&format!("{} {} R", r.id, r.gen)),
    }
}

fn build_signature_object(sig_id: u32, reserve_bytes: usize, options: &PreparationOptions, now: chrono::DateTime<chrono::Utc>) -> String {
    let mut dict = format!("{sig_id} 0 obj\n<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /{}\n", options.sub_filter.as_pdf_name());
    dict.push_str(&byte_range_placeholder());
    dict.push('\n');
    dict.push_str(&format!("/Contents <{}>\n", "0".repeat(reserve_bytes * 2)));
    if let Some(name) = &options.metadata.name {
        dict.push_str(&format!("/Name ({})\n", escape_pdf_string(name)));
    }
    if let Some(reason) = &options.metadata.reason {
        dict.push_str(&format!("/Reason ({})\n", escape_pdf_string(reason)));
    }
    if let Some(location) = &options.metadata.location {
        dict.push_str(&format!("/Location ({})\n", escape_pdf_string(location)));
    }
    if let Some(contact) = &options.metadata.contact_info {
        dict.push_str(&format!("/ContactInfo ({})\n", escape_pdf_string(contact)));
    }
    dict.push_str(&format!("/M ({})\n", format_pdf_date(now)));
    dict.push_str(">>\nendobj\n");
    dict
}

fn build_appearance_object(ap_id: u32, options: &PreparationOptions, content: &[u8]) -> String {
    let mut obj = format!(
        "{ap_id} 0 obj\n<< /Type /XObject /Subtype /Form /FormType 1 /BBox [0 0 {} {}] /Resources << >> /Length {} >>\nstream\n",
        options.rect.width,
        options.rect.height,
        content.len()
    );
    obj.push_str(&String::from_utf8_lossy(content));
    obj.push_str("\nendstream\nendobj\n");
    obj
}

fn build_field_object(field_id: u32, sig_id: u32, ap_id: Option<u32>, page_ref: Option<ObjectRef>, options: &PreparationOptions) -> String {
    let mut dict = format!("{field_id} 0 obj\n<< /Type /Annot /Subtype /Widget /FT /Sig\n");
    dict.push_str(&format!("/T ({})\n", escape_pdf_string(&options.field_name)));
    dict.push_str(&format!("/V {sig_id} 0 R\n"));
    match page_ref {
        Some(p) => {
            let r = &options.rect;
            dict.push_str(&format!("/Rect [{} {} {} {}]\n", r.x, r.y, r.x + r.width, r.y + r.height));
            dict.push_str(&format!("/P {} {} R\n", p.id, p.gen));
            dict.push_str("/F 4\n"); // Print
        },
        None => {
            dict.push_str("/Rect [0 0 0 0]\n");
            dict.push_str("/F 0\n");
        },
    }
    if let Some(ap_id) = ap_id {
        dict.push_str(&format!("/AP << /N {ap_id} 0 R >>\n"));
    }
    dict.push_str(">>\nendobj\n");
    dict
}

fn build_acroform_object(
    acroform_id: u32,
    acroform_gen: u16,
    table: &CrossRefTable,
    bytes: &[u8],
    existing: Option<ObjectRef>,
    field_id: u32,
) -> Result<String> {
    let mut existing_fields: Vec<ObjectRef> = Vec::new();
    let mut extra = String::new();
    if let Some(r) = existing {
        if let Ok(dict) = load_dict(table, bytes, r) {
            if let Some(fields_obj) = dict.get("Fields") {
                let fields = slot::resolve(table, bytes, fields_obj)?;
                if let Some(arr) = fields.as_array() {
                    existing_fields = arr.iter().filter_map(Object::as_reference).collect();
                }
            }
            if let Some(dr) = dict.get("DR") {
                extra.push_str("/DR ");
                serialize_value(dr, &mut extra);
                extra.push('\n');
            }
        }
    }

    let mut dict = format!("{acroform_id} {acroform_gen} obj\n<< /Fields [");
    for f in &existing_fields {
        dict.push_str(&format!(" {} {} R", f.id, f.gen));
    }
    dict.push_str(&format!(" {field_id} 0 R ]\n"));
    dict.push_str(&extra);
    dict.push_str("/SigFlags 3\n>>\nendobj\n");
    Ok(dict)
}

fn build_catalog_object(root_ref: ObjectRef, catalog_dict: &HashMap<String, Object>, acroform_id: u32) -> Result<String> {
    let mut dict = format!("{} {} obj\n<< ", root_ref.id, root_ref.gen);
    for (k, v) in catalog_dict {
        if k == "AcroForm" {
            continue;
        }
        dict.push('/');
        dict.push_str(k);
        dict.push(' ');
        serialize_value(v, &mut dict);
        dict.push('\n');
    }
    dict.push_str(&format!("/AcroForm {acroform_id} 0 R\n"));
    dict.push_str(">>\nendobj\n");
    Ok(dict)
}

fn build_page_object(
    page_ref: ObjectRef,
    page_dict: &HashMap<String, Object>,
    table: &CrossRefTable,
    bytes: &[u8],
    field_id: u32,
) -> Result<String> {
    let mut annots: Vec<Object> = Vec::new();
    if let Some(annots_obj) = page_dict.get("Annots") {
        if let Ok(resolved) = slot::resolve(table, bytes, annots_obj) {
            if let Some(arr) = resolved.as_array() {
                annots = arr.clone();
            }
        }
    }
    annots.push(Object::Reference(ObjectRef::new(field_id, 0)));

    let mut dict = format!("{} {} obj\n<< ", page_ref.id, page_ref.gen);
    for (k, v) in page_dict {
        if k == "Annots" {
            continue;
        }
        dict.push('/');
        dict.push_str(k);
        dict.push(' ');
        serialize_value(v, &mut dict);
        dict.push('\n');
    }
    dict.push_str("/Annots [");
    for a in &annots {
        serialize_value(a, &mut dict);
        dict.push(' ');
    }
    dict.push_str("]\n>>\nendobj\n");
    Ok(dict)
}

/// Classic (non-stream) cross-reference section covering exactly the
/// objects this incremental update touched, chained to the original
/// document via `/Prev`.
fn build_xref_section(offsets: &HashMap<u32, u64>, size: u32, root_id: u32, prev_offset: u64) -> String {
    let mut nums: Vec<u32> = offsets.keys().copied().collect();
    nums.sort_unstable();

    let mut section = String::from("xref\n");
    for num in nums {
        section.push_str(&format!("{num} 1\n"));
        section.push_str(&format!("{:010} {:05} n \n", offsets[&num], 0));
    }
    section.push_str(&format!("trailer\n<< /Size {size} /Root {root_id} 0 R /Prev {prev_offset} >>\nstartxref\n"));
    section
}

fn patch_byte_range(buffer: &mut [u8], sig_dict_offset: usize, byte_range: &[i64; 4]) -> Result<()> {
    let window_end = (sig_dict_offset + 4096).min(buffer.len());
    let window = &buffer[sig_dict_offset..window_end];
    let marker = b"/ByteRange [";
    let rel = window.windows(marker.len()).position(|w| w == marker).ok_or(Error::PdfByteRangeNotFound)?;
    let start = sig_dict_offset + rel + marker.len();
    let formatted = format!(
        "{:0width$} {:0width$} {:0width$} {:0width$}",
        byte_range[0],
        byte_range[1],
        byte_range[2],
        byte_range[3],
        width = BYTE_RANGE_DIGIT_WIDTH
    );
    if start + formatted.len() > buffer.len() {
        return Err(Error::PdfByteRangeMalformed("ByteRange placeholder too small for computed offsets".into()));
    }
    buffer[start..start + formatted.len()].copy_from_slice(formatted.as_bytes());
    Ok(())
}

fn extract_signed_bytes(bytes: &[u8], byte_range: &[i64; 4]) -> Result<Vec<u8>> {
    let (o1, l1, o2, l2) = (byte_range[0] as usize, byte_range[1] as usize, byte_range[2] as usize, byte_range[3] as usize);
    if o1 + l1 > bytes.len() || o2 + l2 > bytes.len() {
        return Err(Error::PdfByteRangeMalformed("ByteRange exceeds file length".into()));
    }
    let mut out = Vec::with_capacity(l1 + l2);
    out.extend_from_slice(&bytes[o1..o1 + l1]);
    out.extend_from_slice(&bytes[o2..o2 + l2]);
    Ok(out)
}

fn encode_hex_upper(bytes: &[u8]) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(HEX[(b >> 4) as usize] as char);
        s.push(HEX[(b & 0x0f) as usize] as char);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PreparationMetadata, PreparationOptions};
    use crate::geometry::Rect;

    /// A minimal one-page PDF with a classic xref table, built by hand so
    /// the exact byte offsets line up with the subsection entries.
    fn minimal_pdf() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.7\n");

        let off1 = buf.len();
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let off2 = buf.len();
        buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
        let off3 = buf.len();
        buf.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n");

        let xref_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 4\n");
        buf.extend_from_slice(b"0000000000 65535 f \n");
        buf.extend_from_slice(format!("{:010} 00000 n \n", off1).as_bytes());
        buf.extend_from_slice(format!("{:010} 00000 n \n", off2).as_bytes());
        buf.extend_from_slice(format!("{:010} 00000 n \n", off3).as_bytes());
        buf.extend_from_slice(b"trailer\n<< /Size 4 /Root 1 0 R >>\n");
        buf.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());
        buf
    }

    #[test]
    fn prepares_invisible_signature_slot() {
        let pdf = minimal_pdf();
        let options = PreparationOptions::invisible("Signature1");
        let prepared = prepare_for_external_signing(&pdf, &options).unwrap();

        assert!(prepared.prepared_bytes.len() > pdf.len());
        let [o1, l1, o2, l2] = prepared.byte_range;
        assert_eq!(o1, 0);
        assert_eq!(o2 + l2, prepared.prepared_bytes.len() as i64);
        assert!(l1 > 0);

        let (start, end) = slot::find_contents_range(&prepared.prepared_bytes).unwrap();
        assert!(prepared.prepared_bytes[start..end].iter().all(|&b| b == b'0'));
        assert!(!prepared.digest_base64.is_empty());
    }

    #[test]
    fn prepares_visible_signature_slot_on_page() {
        let pdf = minimal_pdf();
        let options = PreparationOptions::new("Signature1", Rect::new(10.0, 10.0, 100.0, 40.0))
            .with_metadata(PreparationMetadata { reason: Some("Test".into()), ..Default::default() });
        let prepared = prepare_for_external_signing(&pdf, &options).unwrap();

        let text = String::from_utf8_lossy(&prepared.prepared_bytes);
        assert!(text.contains("/Subtype /Widget"));
        assert!(text.contains("/Annots"));
        assert!(text.contains("/AcroForm"));
        assert!(text.contains("/SigFlags 3"));
    }

    #[test]
    fn rejects_zero_reserve_bytes() {
        let pdf = minimal_pdf();
        let options = PreparationOptions::invisible("Signature1").with_reserve_bytes(0);
        let err = prepare_for_external_signing(&pdf, &options).unwrap_err();
        assert_eq!(err.code(), "reserve_bytes_too_small");
    }

    #[test]
    fn page_out_of_range_is_reported() {
        let pdf = minimal_pdf();
        let options = PreparationOptions::new("Signature1", Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut options = options;
        options.page = Some(5);
        let err = prepare_for_external_signing(&pdf, &options).unwrap_err();
        assert_eq!(err.code(), "page_out_of_range");
    }

    #[test]
    fn embeds_signature_into_reserved_placeholder() {
        let pdf = minimal_pdf();
        let options = PreparationOptions::invisible("Signature1").with_reserve_bytes(64);
        let prepared = prepare_for_external_signing(&pdf, &options).unwrap();

        let fake_der = vec![0xAAu8; 40];
        let embedded = embed_pkcs7(&prepared.prepared_bytes, &fake_der).unwrap();
        assert_eq!(embedded.len(), prepared.prepared_bytes.len());

        let (start, end) = slot::find_contents_range(&embedded).unwrap();
        let hex = &embedded[start..end];
        assert!(hex.starts_with(b"AAAAAAAA"));
        assert!(hex.ends_with(b"0000"));
    }

    #[test]
    fn embed_rejects_signature_larger_than_placeholder() {
        let pdf = minimal_pdf();
        let options = PreparationOptions::invisible("Signature1").with_reserve_bytes(4);
        let prepared = prepare_for_external_signing(&pdf, &options).unwrap();

        let too_big = vec![0xFFu8; 100];
        let err = embed_pkcs7(&prepared.prepared_bytes, &too_big).unwrap_err();
        assert_eq!(err.code(), "pkcs7_too_large");
    }
}
