/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Errors possible during image manipulation
use std::fmt::{Debug, Display, Formatter};

use prism_core::bit_depth::BitType;
use prism_core::colorspace::ColorSpace;

/// All possible image errors that can occur.
///
/// Codec specific errors live in their crates and wrap this one
pub enum ImageErrors {
    /// Width and height multiplied overflow or are zero
    ///
    /// (width, height)
    ZeroOrOverflowDimensions(usize, usize),
    /// Dimensions of two things that must agree, don't
    ///
    /// (expected, found)
    DimensionsMisMatch((usize, usize), (usize, usize)),
    /// A buffer holds the wrong number of samples
    ///
    /// (expected, found)
    LengthMisMatch(usize, usize),
    /// A channel count that no supported layout has
    InvalidChannelCount(usize),
    UnsupportedColorspace(ColorSpace, &'static str, &'static [ColorSpace]),
    /// An operation cannot work on samples of this type
    UnsupportedBitType(&'static str, BitType),
    /// The image has no layer at this index
    NoLayer(usize),
    /// Allocating this many bytes failed
    OutOfMemory(usize),
    /// A color profile could not be parsed or used
    ColorProfile(String),
    GenericString(String),
    GenericStr(&'static str)
}

impl Debug for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroOrOverflowDimensions(width, height) => {
                writeln!(
                    f,
                    "Dimensions {width}x{height} are either zero or too large to address"
                )
            }
            Self::DimensionsMisMatch(expected, found) => {
                writeln!(
                    f,
                    "Dimensions mismatch, expected {}x{} but found {}x{}",
                    expected.0, expected.1, found.0, found.1
                )
            }
            Self::LengthMisMatch(expected, found) => {
                writeln!(
                    f,
                    "Buffer length mismatch, expected {expected} samples but found {found}"
                )
            }
            Self::InvalidChannelCount(count) => {
                writeln!(f, "Invalid channel count {count}, expected 1 to 4 channels")
            }
            Self::UnsupportedColorspace(present, operation, supported) => {
                writeln!(f,"Unsupported colorspace {present:?}, for the operation {operation}\nSupported colorspaces are {supported:?}")
            }
            Self::UnsupportedBitType(operation, bit_type) => {
                writeln!(
                    f,
                    "Operation {operation} is not implemented for {bit_type:?} samples"
                )
            }
            Self::NoLayer(index) => {
                writeln!(f, "No layer at index {index}")
            }
            Self::OutOfMemory(size) => {
                writeln!(f, "Could not allocate {size} bytes")
            }
            Self::ColorProfile(err) => {
                writeln!(f, "Color profile error: {err}")
            }
            Self::GenericString(err) => {
                writeln!(f, "{err}")
            }
            Self::GenericStr(err) => {
                writeln!(f, "{err}")
            }
        }
    }
}

impl Display for ImageErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?}", self)
    }
}

impl std::error::Error for ImageErrors {}

impl From<&'static str> for ImageErrors {
    fn from(value: &'static str) -> Self {
        Self::GenericStr(value)
    }
}

impl From<String> for ImageErrors {
    fn from(value: String) -> Self {
        Self::GenericString(value)
    }
}
