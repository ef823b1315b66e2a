/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! JPEG XL signatures
use prism_core::bytestream::ByteReader;

/// Start of a bare codestream
pub const CODESTREAM_SIGNATURE: [u8; 2] = [0xFF, 0x0A];

/// The `JXL ` signature box every container starts with
pub const CONTAINER_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A
];

/// How a JPEG XL file is packaged
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JxlSignature {
    /// A bare codestream
    Codestream,
    /// An ISO BMFF style box container
    Container
}

/// Identify a JPEG XL file from its first bytes
///
/// Returns `None` for empty input or anything that is not JPEG XL
pub fn check_signature(data: &[u8]) -> Option<JxlSignature> {
    let reader = ByteReader::new(data);

    if reader.peek(CODESTREAM_SIGNATURE.len()).ok() == Some(&CODESTREAM_SIGNATURE[..]) {
        return Some(JxlSignature::Codestream);
    }
    if reader.peek(CONTAINER_SIGNATURE.len()).ok() == Some(&CONTAINER_SIGNATURE[..]) {
        return Some(JxlSignature::Container);
    }
    None
}
