/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Pixel format tables
//!
//! Which sample type a decoded image is stored in, how many channels the
//! decoder is asked for, and which host format an encoder input is named by.
//! Every table here is total over its inputs.
use prism_core::bit_depth::{BitDepth, BitType};
use prism_core::colorspace::ColorSpace;
use prism_image::image::{ColorModel, Precision};

use crate::errors::JxlErrors;

/// Sample storage picked for a decode and the two precisions it can end up in
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DecodeFormat {
    pub bit_type:   BitType,
    pub linear:     Precision,
    pub non_linear: Precision
}

impl DecodeFormat {
    /// The precision to use once the profile's linearity is known
    pub const fn precision(&self, linear: bool) -> Precision {
        if linear {
            self.linear
        } else {
            self.non_linear
        }
    }
}

const FLOAT_FORMAT: DecodeFormat = DecodeFormat {
    bit_type:   BitType::F32,
    linear:     Precision::FLOAT_LINEAR,
    non_linear: Precision::FLOAT_NON_LINEAR
};
const U16_FORMAT: DecodeFormat = DecodeFormat {
    bit_type:   BitType::U16,
    linear:     Precision::U16_LINEAR,
    non_linear: Precision::U16_NON_LINEAR
};
const U8_FORMAT: DecodeFormat = DecodeFormat {
    bit_type:   BitType::U8,
    linear:     Precision::U8_LINEAR,
    non_linear: Precision::U8_NON_LINEAR
};

/// Pick the sample storage for a decode
///
/// XYB encoded images and anything deeper than 16 bits decode to floats,
/// the rest decode to the smallest integer that holds them.
pub const fn select_decode_format(uses_original_profile: bool, bits_per_sample: u32) -> DecodeFormat {
    if !uses_original_profile || bits_per_sample > 16 {
        FLOAT_FORMAT
    } else if bits_per_sample <= 8 {
        U8_FORMAT
    } else {
        U16_FORMAT
    }
}

/// Number of interleaved channels to request from the decoder
///
/// CMYK always asks for four, the fourth slot holds alpha or padding,
/// the key comes through its own extra channel buffer.
pub const fn decode_channels(model: ColorModel, has_alpha: bool) -> usize {
    // [without alpha, with alpha]
    const TABLE: [[usize; 2]; 3] = [[1, 2], [3, 4], [4, 4]];

    let row = match model {
        ColorModel::Gray => 0,
        ColorModel::Rgb => 1,
        ColorModel::Cmyk => 2
    };
    TABLE[row][has_alpha as usize]
}

/// The layer colorspace a decoded image ends up in
pub const fn decoded_colorspace(model: ColorModel, has_alpha: bool) -> ColorSpace {
    match (model, has_alpha) {
        (ColorModel::Gray, false) => ColorSpace::Luma,
        (ColorModel::Gray, true) => ColorSpace::LumaA,
        (ColorModel::Rgb, false) => ColorSpace::RGB,
        (ColorModel::Rgb, true) => ColorSpace::RGBA,
        (ColorModel::Cmyk, _) => ColorSpace::CMYK
    }
}

/// Name of the host pixel format an encoder input is extracted in
///
/// Primes mark perceptual (non-linear) channels
///
/// # Errors
/// [`JxlErrors::UnsupportedLayout`] for anything but gray and RGB with
/// or without alpha, and for depths other than 8 and 16 bits
pub fn encode_format_name(
    colorspace: ColorSpace, linear: bool, depth: BitDepth
) -> Result<&'static str, JxlErrors> {
    let wide = match depth {
        BitDepth::Eight => false,
        BitDepth::Sixteen => true,
        _ => return Err(JxlErrors::UnsupportedLayout(colorspace))
    };
    let name = match (colorspace, linear, wide) {
        (ColorSpace::Luma, true, false) => "Y u8",
        (ColorSpace::Luma, true, true) => "Y u16",
        (ColorSpace::Luma, false, false) => "Y' u8",
        (ColorSpace::Luma, false, true) => "Y' u16",
        (ColorSpace::LumaA, true, false) => "YA u8",
        (ColorSpace::LumaA, true, true) => "YA u16",
        (ColorSpace::LumaA, false, false) => "Y'A u8",
        (ColorSpace::LumaA, false, true) => "Y'A u16",
        (ColorSpace::RGB, true, false) => "RGB u8",
        (ColorSpace::RGB, true, true) => "RGB u16",
        (ColorSpace::RGB, false, false) => "R'G'B' u8",
        (ColorSpace::RGB, false, true) => "R'G'B' u16",
        (ColorSpace::RGBA, true, false) => "RGBA u8",
        (ColorSpace::RGBA, true, true) => "RGBA u16",
        (ColorSpace::RGBA, false, false) => "R'G'B'A u8",
        (ColorSpace::RGBA, false, true) => "R'G'B'A u16",
        _ => return Err(JxlErrors::UnsupportedLayout(colorspace))
    };
    Ok(name)
}

/// Container decision for an encode
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ContainerPlan {
    /// Wrap the codestream in a box container
    pub container:        bool,
    /// Codestream level to declare, only set for high precision images
    pub codestream_level: Option<u8>,
    /// Metadata boxes will be added
    pub boxes:            bool
}

/// Decide whether an encode needs a container
///
/// High precision images that keep their profile or carry a deep alpha
/// need codestream level 10, which lives in a container. Metadata boxes
/// need a container too.
pub const fn plan_container(
    bits_per_sample: u32, uses_original_profile: bool, alpha_bits: u32, wants_metadata: bool
) -> ContainerPlan {
    let high_precision = bits_per_sample > 12 && (uses_original_profile || alpha_bits > 12);

    ContainerPlan {
        container:        high_precision || wants_metadata,
        codestream_level: if high_precision { Some(10) } else { None },
        boxes:            wants_metadata
    }
}
