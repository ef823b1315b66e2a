/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Color profiles attached to images
//!
//! A profile is either one of a handful of named presets, which codecs can
//! describe without ICC bytes, or an opaque ICC profile.
//!
//! Profiles are only queried, they are never authored. With the `cms` feature
//! ICC profiles are parsed by [moxcms](https://docs.rs/moxcms) which answers
//! linearity and can transform pixels into sRGB.
use prism_core::log::trace;

use crate::errors::ImageErrors;
use crate::image::ColorModel;

/// A color profile
#[derive(Clone, Debug, PartialEq)]
pub enum ColorProfile {
    /// sRGB primaries, D65 white point, sRGB transfer curve
    Srgb,
    /// sRGB primaries, D65 white point, linear transfer
    LinearSrgb,
    /// D65 gray with the sRGB transfer curve
    GrayD65Srgb,
    /// D65 gray with a linear transfer
    GrayD65Linear,
    /// An embedded ICC profile
    Icc(IccProfile)
}

impl ColorProfile {
    /// Wrap raw ICC bytes
    ///
    /// # Errors
    /// If the bytes are not an ICC profile, or with the `cms` feature,
    /// if moxcms cannot parse them
    pub fn from_icc(bytes: Vec<u8>) -> Result<ColorProfile, ImageErrors> {
        IccProfile::new(bytes).map(ColorProfile::Icc)
    }

    /// The preset matching a color model and transfer
    ///
    /// CMYK has no preset, the RGB presets are returned for it
    pub const fn preset(model: ColorModel, linear: bool) -> ColorProfile {
        match (model, linear) {
            (ColorModel::Gray, true) => ColorProfile::GrayD65Linear,
            (ColorModel::Gray, false) => ColorProfile::GrayD65Srgb,
            (_, true) => ColorProfile::LinearSrgb,
            (_, false) => ColorProfile::Srgb
        }
    }

    /// Whether samples under this profile are linear light
    pub fn is_linear(&self) -> bool {
        match self {
            ColorProfile::LinearSrgb | ColorProfile::GrayD65Linear => true,
            ColorProfile::Srgb | ColorProfile::GrayD65Srgb => false,
            ColorProfile::Icc(icc) => icc.is_linear()
        }
    }

    /// The color space this profile describes, `None` for ICC
    /// profiles of any other colorant (Lab, n-color, ...)
    pub fn colorant(&self) -> Option<ColorModel> {
        match self {
            ColorProfile::Srgb | ColorProfile::LinearSrgb => Some(ColorModel::Rgb),
            ColorProfile::GrayD65Srgb | ColorProfile::GrayD65Linear => Some(ColorModel::Gray),
            ColorProfile::Icc(icc) => icc.colorant()
        }
    }

    pub fn is_gray(&self) -> bool {
        self.colorant() == Some(ColorModel::Gray)
    }

    pub fn is_rgb(&self) -> bool {
        self.colorant() == Some(ColorModel::Rgb)
    }

    pub fn is_cmyk(&self) -> bool {
        self.colorant() == Some(ColorModel::Cmyk)
    }

    /// Raw ICC bytes, `None` for presets
    pub fn icc_bytes(&self) -> Option<&[u8]> {
        match self {
            ColorProfile::Icc(icc) => Some(icc.bytes()),
            _ => None
        }
    }

    /// A short human readable name
    pub fn name(&self) -> &str {
        match self {
            ColorProfile::Srgb => "sRGB",
            ColorProfile::LinearSrgb => "linear sRGB",
            ColorProfile::GrayD65Srgb => "D65 gray, sRGB TRC",
            ColorProfile::GrayD65Linear => "D65 gray, linear",
            ColorProfile::Icc(icc) => icc.description()
        }
    }

    /// True if pixels under this profile can be written out as sRGB
    /// (or gray sRGB) without a transform
    pub fn is_srgb_compatible(&self) -> bool {
        match self {
            ColorProfile::Icc(icc) => icc.is_effectively_srgb(),
            _ => true
        }
    }
}

/// An opaque ICC profile
#[derive(Clone, Debug, PartialEq)]
pub struct IccProfile {
    bytes:       Vec<u8>,
    colorant:    Option<ColorModel>,
    linear:      bool,
    description: String
}

const ICC_HEADER_SIZE: usize = 128;

impl IccProfile {
    pub fn new(bytes: Vec<u8>) -> Result<IccProfile, ImageErrors> {
        if bytes.len() < ICC_HEADER_SIZE || &bytes[36..40] != b"acsp" {
            return Err(ImageErrors::ColorProfile(format!(
                "{} bytes do not start with an ICC header",
                bytes.len()
            )));
        }
        let colorant = match &bytes[16..20] {
            b"RGB " => Some(ColorModel::Rgb),
            b"GRAY" => Some(ColorModel::Gray),
            b"CMYK" => Some(ColorModel::Cmyk),
            _ => None
        };
        let linear = linearity(&bytes)?;
        let description = format!("ICC ({} bytes)", bytes.len());

        trace!("ICC profile colorant: {colorant:?}, linear: {linear}");

        Ok(IccProfile {
            bytes,
            colorant,
            linear,
            description
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub const fn colorant(&self) -> Option<ColorModel> {
        self.colorant
    }

    pub const fn is_linear(&self) -> bool {
        self.linear
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether converting through this profile to sRGB is an identity
    ///
    /// Without the `cms` feature this is unknown and reported as false
    pub fn is_effectively_srgb(&self) -> bool {
        #[cfg(feature = "cms")]
        {
            cms::is_profile_srgb(&self.bytes)
        }
        #[cfg(not(feature = "cms"))]
        {
            false
        }
    }
}

#[cfg(feature = "cms")]
fn linearity(bytes: &[u8]) -> Result<bool, ImageErrors> {
    cms::is_linear(bytes)
}

#[cfg(not(feature = "cms"))]
fn linearity(_: &[u8]) -> Result<bool, ImageErrors> {
    Ok(false)
}

#[cfg(feature = "cms")]
pub(crate) mod cms {
    use moxcms::{ColorProfile, DataColorSpace, Layout, ToneReprCurve, TransformOptions};

    use crate::errors::ImageErrors;

    fn parse(bytes: &[u8]) -> Result<ColorProfile, ImageErrors> {
        ColorProfile::new_from_slice(bytes).map_err(|e| ImageErrors::ColorProfile(e.to_string()))
    }

    fn curve_is_linear(curve: Option<&ToneReprCurve>) -> bool {
        match curve {
            // an empty table is the identity, a single entry is a u8.8 gamma
            Some(ToneReprCurve::Lut(table)) => {
                table.is_empty() || (table.len() == 1 && table[0] == 256)
            }
            Some(ToneReprCurve::Parametric(params)) => {
                let near = |x: Option<&f32>, v: f32| x.is_some_and(|x| (x - v).abs() < 1e-4);
                match params.len() {
                    1 => near(params.first(), 1.0),
                    3 => near(params.first(), 1.0) && near(params.get(1), 1.0) && near(params.get(2), 0.0),
                    n if n >= 5 => {
                        near(params.first(), 1.0)
                            && near(params.get(1), 1.0)
                            && near(params.get(2), 0.0)
                            && (near(params.get(3), 1.0) || near(params.get(4), 0.0))
                    }
                    _ => false
                }
            }
            None => false
        }
    }

    pub(crate) fn is_linear(bytes: &[u8]) -> Result<bool, ImageErrors> {
        let profile = parse(bytes)?;

        Ok(match profile.color_space {
            DataColorSpace::Gray => curve_is_linear(profile.gray_trc.as_ref()),
            DataColorSpace::Rgb => {
                curve_is_linear(profile.red_trc.as_ref())
                    && curve_is_linear(profile.green_trc.as_ref())
                    && curve_is_linear(profile.blue_trc.as_ref())
            }
            _ => false
        })
    }

    /// Check if the profile maps a handful of probe colors onto themselves in sRGB
    pub(crate) fn is_profile_srgb(bytes: &[u8]) -> bool {
        let Ok(source) = parse(bytes) else {
            return false;
        };
        if !matches!(source.color_space, DataColorSpace::Rgb) {
            return false;
        }
        let srgb = ColorProfile::new_srgb();
        let Ok(transform) =
            source.create_transform_8bit(Layout::Rgb, &srgb, Layout::Rgb, TransformOptions::default())
        else {
            return false;
        };
        let probes: [[u8; 3]; 7] = [
            [0, 0, 0],
            [255, 255, 255],
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [128, 128, 128],
            [192, 64, 32]
        ];
        probes.iter().all(|probe| {
            let mut output = [0_u8; 3];
            transform.transform(probe, &mut output).is_ok()
                && probe
                    .iter()
                    .zip(output.iter())
                    .all(|(a, b)| (i16::from(*a) - i16::from(*b)).abs() <= 1)
        })
    }

    /// Transform interleaved f32 RGB(A) samples encoded in `bytes` into sRGB
    pub(crate) fn transform_to_srgb(
        bytes: &[u8], has_alpha: bool, input: &[f32], output: &mut [f32]
    ) -> Result<(), ImageErrors> {
        let source = parse(bytes)?;
        let layout = if has_alpha { Layout::Rgba } else { Layout::Rgb };
        let transform = source
            .create_transform_f32(layout, &ColorProfile::new_srgb(), layout, TransformOptions::default())
            .map_err(|e| ImageErrors::ColorProfile(e.to_string()))?;
        transform
            .transform(input, output)
            .map_err(|e| ImageErrors::ColorProfile(e.to_string()))
    }
}
