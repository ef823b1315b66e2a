/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image Colorspace information and manipulation utilities.

/// All colorspaces a prism layer can be stored in
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ColorSpace {
    /// Grayscale colorspace
    Luma,
    /// Grayscale with alpha colorspace
    LumaA,
    /// Red, Green , Blue
    RGB,
    /// Red, Green, Blue, Alpha
    RGBA,
    /// Cyan , Magenta, Yellow, Black
    CMYK,
    /// Hue, Saturation, Value
    ///
    /// Hue is normalized to `[0,1)`, samples are expected to be floating point
    HSV,
    /// Hue, Saturation, Value with a trailing alpha channel
    HSVA,
    /// The colorspace is unknown
    Unknown
}

impl ColorSpace {
    /// Number of channels present for a certain colorspace
    ///
    /// E.g. RGB returns 3 since it contains R,G and B colors to make up a pixel
    pub const fn num_components(&self) -> usize {
        match self {
            Self::RGB | Self::HSV => 3,
            Self::RGBA | Self::CMYK | Self::HSVA => 4,
            Self::Luma => 1,
            Self::LumaA => 2,
            Self::Unknown => 0
        }
    }

    pub const fn has_alpha(&self) -> bool {
        matches!(self, Self::RGBA | Self::LumaA | Self::HSVA)
    }

    pub const fn is_grayscale(&self) -> bool {
        matches!(self, Self::LumaA | Self::Luma)
    }

    /// Returns the position of the alpha sample in a pixel
    ///
    /// If an image doesn't have an alpha channel returns `None`
    pub const fn alpha_position(&self) -> Option<usize> {
        match self {
            Self::RGBA | Self::HSVA => Some(3),
            Self::LumaA => Some(1),
            _ => None
        }
    }

    /// Return the colorspace with alpha added, or the same colorspace if
    /// it already has alpha or cannot carry one
    pub const fn with_alpha(self) -> ColorSpace {
        match self {
            Self::Luma => Self::LumaA,
            Self::RGB => Self::RGBA,
            Self::HSV => Self::HSVA,
            other => other
        }
    }
}

/// Encapsulates all colorspaces supported by
/// the library
pub static ALL_COLORSPACES: [ColorSpace; 7] = [
    ColorSpace::Luma,
    ColorSpace::LumaA,
    ColorSpace::RGB,
    ColorSpace::RGBA,
    ColorSpace::CMYK,
    ColorSpace::HSV,
    ColorSpace::HSVA
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_position_agrees_with_has_alpha() {
        for colorspace in ALL_COLORSPACES {
            assert_eq!(
                colorspace.has_alpha(),
                colorspace.alpha_position().is_some(),
                "{colorspace:?}"
            );
            if let Some(pos) = colorspace.alpha_position() {
                assert_eq!(pos + 1, colorspace.num_components());
            }
        }
    }

    #[test]
    fn with_alpha_adds_one_channel() {
        assert_eq!(ColorSpace::Luma.with_alpha(), ColorSpace::LumaA);
        assert_eq!(ColorSpace::RGB.with_alpha(), ColorSpace::RGBA);
        assert_eq!(ColorSpace::CMYK.with_alpha(), ColorSpace::CMYK);
    }
}
