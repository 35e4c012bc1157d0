//! PDF-facing halves of the signature pipeline: locating an existing
//! `/ByteRange`/`/Contents` slot and preparing/embedding a new one
//! for external signing.

pub mod preparer;
pub mod slot;
