/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Container boxes
//!
//! JPEG XL files in a container are a sequence of ISO BMFF style boxes,
//! `size:u32be type:[u8;4] payload`. A size of 1 means a 64 bit size
//! follows the type, a size of 0 means the box runs to the end of the file.
//!
//! This module holds the accumulator used while scanning boxes for
//! metadata, and a small reader and writer for the box structure itself.
use prism_core::bytestream::ByteReader;
use prism_core::log::trace;

use crate::errors::JxlErrors;

/// Size box buffers start at and grow by
pub const BOX_CHUNK_SIZE: usize = 4096;

/// Metadata boxes the decoder collects
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MetadataBox {
    Exif,
    Xmp
}

impl MetadataBox {
    pub const fn box_type(self) -> [u8; 4] {
        match self {
            MetadataBox::Exif => *b"Exif",
            MetadataBox::Xmp => *b"xml "
        }
    }

    pub fn from_box_type(box_type: [u8; 4]) -> Option<MetadataBox> {
        match &box_type {
            b"Exif" => Some(MetadataBox::Exif),
            b"xml " => Some(MetadataBox::Xmp),
            _ => None
        }
    }
}

fn try_zeroed_bytes(len: usize) -> Result<Vec<u8>, JxlErrors> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| JxlErrors::OutOfMemory(len))?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Grow a full box buffer by one chunk
///
/// `remaining` is how many bytes at the end of `buffer` were not written.
/// Returns the grown buffer and the offset writing resumes at, the bytes
/// before it are kept as they are.
pub fn grow_box_buffer(mut buffer: Vec<u8>, remaining: usize) -> Result<(Vec<u8>, usize), JxlErrors> {
    let offset = buffer.len().saturating_sub(remaining);
    let new_len = buffer
        .len()
        .checked_add(BOX_CHUNK_SIZE)
        .ok_or(JxlErrors::OutOfMemory(usize::MAX))?;
    buffer
        .try_reserve_exact(BOX_CHUNK_SIZE)
        .map_err(|_| JxlErrors::OutOfMemory(new_len))?;
    buffer.resize(new_len, 0);
    Ok((buffer, offset))
}

/// State of a metadata box scan
///
/// At most one box is open at a time, its buffer lives with the backend
/// while it is open.
#[derive(Debug, Default)]
pub struct BoxScan {
    open:      Option<MetadataBox>,
    want_exif: bool,
    want_xmp:  bool,
    exif:      Option<Vec<u8>>,
    xmp:       Option<Vec<u8>>
}

impl BoxScan {
    pub fn new(want_exif: bool, want_xmp: bool) -> BoxScan {
        BoxScan {
            want_exif,
            want_xmp,
            ..Default::default()
        }
    }

    /// True while a wanted box has not been found
    pub fn searching(&self) -> bool {
        (self.want_exif && self.exif.is_none()) || (self.want_xmp && self.xmp.is_none())
    }

    /// Whether a box of this kind should be collected
    pub fn wants(&self, kind: MetadataBox) -> bool {
        match kind {
            MetadataBox::Exif => self.want_exif && self.exif.is_none(),
            MetadataBox::Xmp => self.want_xmp && self.xmp.is_none()
        }
    }

    /// The box currently being collected
    pub const fn open_box(&self) -> Option<MetadataBox> {
        self.open
    }

    /// Start collecting a box, returns the buffer to hand to the backend
    pub fn open(&mut self, kind: MetadataBox) -> Result<Vec<u8>, JxlErrors> {
        let buffer = try_zeroed_bytes(BOX_CHUNK_SIZE)?;
        trace!("Collecting {kind:?} box");
        self.open = Some(kind);
        Ok(buffer)
    }

    /// Finish the open box with the buffer the backend gave back
    ///
    /// The unwritten tail of `remaining` bytes is dropped
    pub fn finish(&mut self, mut buffer: Vec<u8>, remaining: usize) {
        let Some(kind) = self.open.take() else {
            return;
        };
        buffer.truncate(buffer.len().saturating_sub(remaining));
        trace!("{kind:?} box complete, {} bytes", buffer.len());

        match kind {
            MetadataBox::Exif => self.exif = Some(buffer),
            MetadataBox::Xmp => self.xmp = Some(buffer)
        }
    }

    /// Consume the scan, returns the raw (exif, xmp) payloads found
    pub fn into_payloads(self) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
        (self.exif, self.xmp)
    }
}

/// Find the start of a TIFF header, `MM\0*` or `II*\0`
pub fn find_tiff_header(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|w| w == b"MM\0*" || w == b"II*\0")
}

/// Strip everything in front of the TIFF header of an Exif payload
///
/// Exif boxes start with a four byte offset, some writers add an
/// `Exif\0\0` marker too. A header with nothing after it is useless
/// and treated as missing.
pub fn trim_exif(mut data: Vec<u8>) -> Option<Vec<u8>> {
    let start = find_tiff_header(&data)?;
    if data.len() - start <= 4 {
        return None;
    }
    data.drain(..start);
    Some(data)
}

/// A box in a container
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ContainerBox<'a> {
    pub box_type: [u8; 4],
    pub payload:  &'a [u8]
}

/// Iterate over the boxes of a container
///
/// Iteration stops at the first malformed box
pub struct BoxReader<'a> {
    stream: ByteReader<'a>,
    failed: bool
}

impl<'a> BoxReader<'a> {
    pub const fn new(data: &'a [u8]) -> BoxReader<'a> {
        BoxReader {
            stream: ByteReader::new(data),
            failed: false
        }
    }

    /// True if iteration stopped on a malformed box instead of the end of data
    pub const fn failed(&self) -> bool {
        self.failed
    }

    /// Offset of the next box in the data
    pub fn position(&self) -> usize {
        self.stream.position()
    }

    fn read_box(&mut self) -> Option<ContainerBox<'a>> {
        let size = self.stream.get_u32_be().ok()?;
        let box_type = self.stream.get_fixed_bytes::<4>().ok()?;

        let payload_len = match size {
            0 => self.stream.remaining(),
            1 => {
                let large = self.stream.get_u64_be().ok()?;
                usize::try_from(large).ok()?.checked_sub(16)?
            }
            n => (n as usize).checked_sub(8)?
        };
        let payload = self.stream.get_bytes(payload_len).ok()?;
        Some(ContainerBox { box_type, payload })
    }
}

impl<'a> Iterator for BoxReader<'a> {
    type Item = ContainerBox<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.stream.eof() {
            return None;
        }
        let item = self.read_box();
        if item.is_none() {
            self.failed = true;
        }
        item
    }
}

/// Append a box with a 32 bit size header
pub fn write_box(output: &mut Vec<u8>, box_type: [u8; 4], payload: &[u8]) -> Result<(), JxlErrors> {
    let size = payload
        .len()
        .checked_add(8)
        .and_then(|x| u32::try_from(x).ok())
        .ok_or_else(|| {
            JxlErrors::Backend(format!(
                "Box {:?} of {} bytes is too large",
                String::from_utf8_lossy(&box_type),
                payload.len()
            ))
        })?;
    output.extend_from_slice(&size.to_be_bytes());
    output.extend_from_slice(&box_type);
    output.extend_from_slice(payload);
    Ok(())
}
