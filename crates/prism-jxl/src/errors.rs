/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible when moving images through a JPEG XL codec
#![allow(clippy::uninlined_format_args)]

use core::fmt::{Debug, Display, Formatter};

use prism_core::colorspace::ColorSpace;
use prism_image::errors::ImageErrors;

use crate::backend::DecoderStatus;

/// Errors that may arise during decoding or encoding
///
/// [`ProfileConstructionFailed`](JxlErrors::ProfileConstructionFailed) and
/// [`MetadataIncomplete`](JxlErrors::MetadataIncomplete) never abort a
/// decode, they end up in [`JxlDecoder::warnings`](crate::decoder::JxlDecoder::warnings)
pub enum JxlErrors {
    /// The input does not start with a codestream or container signature
    FormatMismatch,
    /// Width or height is zero
    InvalidDimensions(usize, usize),
    /// (dimension name, found, maximum allowed)
    TooLargeDimensions(&'static str, usize, usize),
    /// Input ended before the image was complete
    Truncated,
    /// The backend produced an event that is not valid in the current state
    ProtocolViolation {
        expected: &'static [DecoderStatus],
        observed: DecoderStatus
    },
    /// Allocating this many bytes failed
    OutOfMemory(usize),
    ProfileConstructionFailed(String),
    MetadataIncomplete(&'static str),
    /// A configuration call to the encoder failed, carries the stage
    EncodeConfigFailed(String),
    /// The encoder finished without producing any bytes
    EmptyOutput,
    /// An error reported by the codec backend
    Backend(String),
    /// A layer colorspace the encoder cannot export
    UnsupportedLayout(ColorSpace),
    Image(ImageErrors)
}

impl JxlErrors {
    /// Whether a decode can carry on after this error
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            JxlErrors::ProfileConstructionFailed(_) | JxlErrors::MetadataIncomplete(_)
        )
    }
}

impl Debug for JxlErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            JxlErrors::FormatMismatch => {
                writeln!(f, "Input does not start with a JPEG XL signature")
            }
            JxlErrors::InvalidDimensions(width, height) => {
                writeln!(f, "Invalid image dimensions {width}x{height}")
            }
            JxlErrors::TooLargeDimensions(name, found, max) => {
                writeln!(
                    f,
                    "Too large image {name} {found}, greater than the configured maximum {max}"
                )
            }
            JxlErrors::Truncated => {
                writeln!(f, "Data incomplete, the file ended before the image did")
            }
            JxlErrors::ProtocolViolation { expected, observed } => {
                writeln!(
                    f,
                    "Unexpected decoder event {:?}, expected one of {:?}",
                    observed, expected
                )
            }
            JxlErrors::OutOfMemory(size) => {
                writeln!(f, "Could not allocate {size} bytes")
            }
            JxlErrors::ProfileConstructionFailed(reason) => {
                writeln!(f, "Could not build a color profile: {reason}")
            }
            JxlErrors::MetadataIncomplete(reason) => {
                writeln!(f, "Metadata could not be read completely: {reason}")
            }
            JxlErrors::EncodeConfigFailed(stage) => {
                writeln!(f, "Encoder rejected the configuration at stage: {stage}")
            }
            JxlErrors::EmptyOutput => {
                writeln!(f, "Encoder produced no output")
            }
            JxlErrors::Backend(err) => {
                writeln!(f, "Codec backend error: {err}")
            }
            JxlErrors::UnsupportedLayout(colorspace) => {
                writeln!(
                    f,
                    "Cannot export layers in colorspace {colorspace:?}, supported ones are Luma, LumaA, RGB and RGBA"
                )
            }
            JxlErrors::Image(err) => {
                writeln!(f, "{:?}", err)
            }
        }
    }
}

impl Display for JxlErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for JxlErrors {}

impl From<ImageErrors> for JxlErrors {
    fn from(value: ImageErrors) -> Self {
        match value {
            ImageErrors::OutOfMemory(size) => JxlErrors::OutOfMemory(size),
            err => JxlErrors::Image(err)
        }
    }
}
