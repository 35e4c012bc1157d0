//! Decoding support for cross-reference *streams* (PDF 1.5+).
//!
//! The authoritative tier of the signature-slot locator (see `pdf::slot`)
//! must be able to read a document's xref table even when it is stored as a
//! compressed stream object rather than the classic plain-text table. That
//! stream is, in every PDF producer seen in practice, `/Filter
//! /FlateDecode` optionally with a PNG predictor (`/DecodeParms
//! << /Predictor .. /Columns .. >>`). General content-stream filter
//! decoding (LZW, DCT, CCITT, ...) is out of scope — this module only
//! covers what is needed to read the xref stream itself.

use crate::error::{Error, Result};
use std::io::Read;

/// Decode parameters for an xref stream (`/DecodeParms`).
#[derive(Debug, Clone)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG).
    pub predictor: i64,
    /// Number of columns (entry width in bytes, for xref streams).
    pub columns: usize,
    /// Number of color components per sample (default 1).
    pub colors: usize,
    /// Bits per component (default 8).
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    fn bytes_per_row(&self) -> usize {
        let pixel_bytes = (self.columns * self.colors * self.bits_per_component).div_ceil(8);
        if self.predictor >= 10 {
            pixel_bytes + 1
        } else {
            pixel_bytes
        }
    }

    fn pixel_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }
}

/// Inflate a zlib- or raw-deflate-wrapped xref stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut zlib = flate2::read::ZlibDecoder::new(data);
    if zlib.read_to_end(&mut out).is_ok() && !out.is_empty() {
        return Ok(out);
    }
    out.clear();
    let mut deflate = flate2::read::DeflateDecoder::new(data);
    deflate
        .read_to_end(&mut out)
        .map_err(|e| Error::InvalidPdf(format!("failed to inflate xref stream: {e}")))?;
    Ok(out)
}

/// Reverse TIFF/PNG predictor encoding applied to decompressed xref stream
/// rows.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => decode_tiff_predictor(data, params),
        10..=15 => decode_png_predictor(data, params),
        other => Err(Error::InvalidPdf(format!("unsupported predictor: {other}"))),
    }
}

fn decode_tiff_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let bytes_per_row = params.pixel_bytes_per_row();
    let colors = params.colors;
    if bytes_per_row == 0 || !data.len().is_multiple_of(bytes_per_row) {
        return Err(Error::InvalidPdf(format!(
            "xref stream data length {} is not a multiple of row size {bytes_per_row}",
            data.len()
        )));
    }

    let mut output = Vec::with_capacity(data.len());
    for row_data in data.chunks(bytes_per_row) {
        for i in 0..colors {
            output.push(row_data[i]);
        }
        for i in colors..row_data.len() {
            let left = output[output.len() - colors];
            output.push(row_data[i].wrapping_add(left));
        }
    }
    Ok(output)
}

fn decode_png_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let bytes_per_row = params.bytes_per_row();
    let pixel_bytes = params.pixel_bytes_per_row();
    if bytes_per_row == 0 || !data.len().is_multiple_of(bytes_per_row) {
        return Err(Error::InvalidPdf(format!(
            "xref stream data length {} is not a multiple of row size {bytes_per_row}",
            data.len()
        )));
    }

    let row_count = data.len() / bytes_per_row;
    let mut output = Vec::with_capacity(row_count * pixel_bytes);
    let bpp = params.colors.max(1);

    for row_idx in 0..row_count {
        let row_start = row_idx * bytes_per_row;
        let row_data = &data[row_start..row_start + bytes_per_row];
        let predictor_tag = if params.predictor == 15 {
            row_data[0]
        } else {
            (params.predictor - 10) as u8
        };
        let encoded = &row_data[1..];

        match predictor_tag {
            0 => output.extend_from_slice(encoded),
            1 => decode_png_sub(encoded, &mut output, bpp),
            2 => decode_png_up(encoded, &mut output, row_idx, pixel_bytes),
            3 => decode_png_average(encoded, &mut output, row_idx, pixel_bytes, bpp),
            4 => decode_png_paeth(encoded, &mut output, row_idx, pixel_bytes, bpp),
            other => {
                return Err(Error::InvalidPdf(format!("invalid PNG predictor tag: {other}")));
            },
        }
    }
    Ok(output)
}

fn decode_png_sub(encoded: &[u8], output: &mut Vec<u8>, bpp: usize) {
    let start_pos = output.len();
    for (i, &byte) in encoded.iter().enumerate() {
        let left = if i >= bpp { output[start_pos + i - bpp] } else { 0 };
        output.push(byte.wrapping_add(left));
    }
}

fn decode_png_up(encoded: &[u8], output: &mut Vec<u8>, row_idx: usize, pixel_bytes: usize) {
    for (i, &byte) in encoded.iter().enumerate() {
        let up = if row_idx > 0 { output[(row_idx - 1) * pixel_bytes + i] } else { 0 };
        output.push(byte.wrapping_add(up));
    }
}

fn decode_png_average(
    encoded: &[u8],
    output: &mut Vec<u8>,
    row_idx: usize,
    pixel_bytes: usize,
    bpp: usize,
) {
    let start_pos = output.len();
    for (i, &byte) in encoded.iter().enumerate() {
        let left = if i >= bpp { output[start_pos + i - bpp] as u16 } else { 0 };
        let up = if row_idx > 0 { output[(row_idx - 1) * pixel_bytes + i] as u16 } else { 0 };
        output.push(byte.wrapping_add(((left + up) / 2) as u8));
    }
}

fn decode_png_paeth(
    encoded: &[u8],
    output: &mut Vec<u8>,
    row_idx: usize,
    pixel_bytes: usize,
    bpp: usize,
) {
    let start_pos = output.len();
    for (i, &byte) in encoded.iter().enumerate() {
        let left = if i >= bpp { output[start_pos + i - bpp] as i16 } else { 0 };
        let up = if row_idx > 0 { output[(row_idx - 1) * pixel_bytes + i] as i16 } else { 0 };
        let up_left = if row_idx > 0 && i >= bpp {
            output[(row_idx - 1) * pixel_bytes + i - bpp] as i16
        } else {
            0
        };
        output.push(byte.wrapping_add(paeth_predictor(left, up, up_left) as u8));
    }
}

fn paeth_predictor(a: i16, b: i16, c: i16) -> i16 {
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
