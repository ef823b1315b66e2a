/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Sample type and transfer conversions
//!
//! Conversions go through normalized `f32`: integers map `0..=MAX` onto
//! `0.0..=1.0`, floats are taken as they are. Alpha is never touched by a
//! transfer change.
use prism_core::bit_depth::BitType;
use prism_core::colorspace::ColorSpace;

use crate::buffer::{PixelBuffer, PixelFormat, SampleBuffer};
use crate::errors::ImageErrors;
use crate::image::Trc;

/// A pixel sample type
pub trait Sample: Copy + Default + bytemuck::Pod {
    const BIT_TYPE: BitType;

    /// Normalize to `[0,1]`
    fn to_f32(self) -> f32;

    /// Quantize from `[0,1]`, values outside are clamped for integers
    fn from_f32(value: f32) -> Self;
}

macro_rules! sample_for_int {
    ($int:tt, $bit_type:expr) => {
        impl Sample for $int {
            const BIT_TYPE: BitType = $bit_type;

            #[inline(always)]
            fn to_f32(self) -> f32 {
                f32::from(self) * (1.0 / $int::MAX as f32)
            }

            #[inline(always)]
            fn from_f32(value: f32) -> $int {
                (value.clamp(0.0, 1.0) * $int::MAX as f32 + 0.5) as $int
            }
        }
    };
}

sample_for_int!(u8, BitType::U8);
sample_for_int!(u16, BitType::U16);

impl Sample for f32 {
    const BIT_TYPE: BitType = BitType::F32;

    #[inline(always)]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline(always)]
    fn from_f32(value: f32) -> f32 {
        value
    }
}

/// The sRGB transfer curve, decoding direction
///
/// Negative values are mirrored
#[inline]
pub fn srgb_to_linear(value: f32) -> f32 {
    let magnitude = value.abs();
    let linear = if magnitude <= 0.040_45 {
        magnitude / 12.92
    } else {
        ((magnitude + 0.055) / 1.055).powf(2.4)
    };
    linear.copysign(value)
}

/// The sRGB transfer curve, encoding direction
///
/// Negative values are mirrored
#[inline]
pub fn linear_to_srgb(value: f32) -> f32 {
    let magnitude = value.abs();
    let encoded = if magnitude <= 0.003_130_8 {
        magnitude * 12.92
    } else {
        1.055 * magnitude.powf(1.0 / 2.4) - 0.055
    };
    encoded.copysign(value)
}

fn try_vec_f32(len: usize) -> Result<Vec<f32>, ImageErrors> {
    match SampleBuffer::try_zeroed(BitType::F32, len)? {
        SampleBuffer::F32(v) => Ok(v),
        _ => Err(ImageErrors::GenericStr("allocation returned the wrong sample type"))
    }
}

/// Read all samples of a buffer as normalized floats
pub fn to_f32_samples(samples: &SampleBuffer) -> Result<Vec<f32>, ImageErrors> {
    let mut out = try_vec_f32(samples.len())?;
    match samples {
        SampleBuffer::U8(v) => widen(v, &mut out),
        SampleBuffer::U16(v) => widen(v, &mut out),
        SampleBuffer::F32(v) => out.copy_from_slice(v)
    }
    Ok(out)
}

fn widen<T: Sample>(input: &[T], output: &mut [f32]) {
    for (out, sample) in output.iter_mut().zip(input) {
        *out = sample.to_f32();
    }
}

fn narrow<T: Sample>(input: &[f32]) -> Result<Vec<T>, ImageErrors> {
    let mut out = Vec::new();
    out.try_reserve_exact(input.len())
        .map_err(|_| ImageErrors::OutOfMemory(input.len() * T::BIT_TYPE.size_of()))?;
    out.extend(input.iter().map(|x| T::from_f32(*x)));
    Ok(out)
}

/// Quantize normalized floats into samples of `bit_type`
pub fn from_f32_samples(input: &[f32], bit_type: BitType) -> Result<SampleBuffer, ImageErrors> {
    Ok(match bit_type {
        BitType::U8 => SampleBuffer::U8(narrow(input)?),
        BitType::U16 => SampleBuffer::U16(narrow(input)?),
        BitType::F32 => SampleBuffer::F32(narrow(input)?),
        _ => return Err(ImageErrors::UnsupportedBitType("from_f32_samples", bit_type))
    })
}

/// Apply a transfer change in place on interleaved samples
///
/// CMYK has no transfer to change, it is left alone
pub fn change_trc(samples: &mut [f32], colorspace: ColorSpace, from: Trc, to: Trc) {
    if from == to || colorspace == ColorSpace::CMYK {
        return;
    }
    let channels = colorspace.num_components().max(1);
    let alpha = colorspace.alpha_position();
    let curve: fn(f32) -> f32 = match to {
        Trc::Linear => srgb_to_linear,
        Trc::NonLinear => linear_to_srgb
    };
    for pixel in samples.chunks_exact_mut(channels) {
        for (pos, sample) in pixel.iter_mut().enumerate() {
            if Some(pos) != alpha {
                *sample = curve(*sample);
            }
        }
    }
}

/// Convert a buffer to another sample type and transfer
///
/// # Arguments
/// - buffer: Source pixels
/// - colorspace: What the pixels hold, used to find alpha
/// - from: Transfer of the source
/// - bit_type: Sample type of the result
/// - to: Transfer of the result
pub fn convert_buffer(
    buffer: &PixelBuffer, colorspace: ColorSpace, from: Trc, bit_type: BitType, to: Trc
) -> Result<PixelBuffer, ImageErrors> {
    let mut samples = to_f32_samples(buffer.samples())?;
    change_trc(&mut samples, colorspace, from, to);

    let format = PixelFormat::new(buffer.format().num_channels(), bit_type)?;
    let samples = from_f32_samples(&samples, bit_type)?;
    PixelBuffer::from_samples(buffer.width(), buffer.height(), format, samples)
}

/// Expand a gray or RGB buffer, with or without alpha, into RGBA floats
///
/// Missing alpha is filled with 1.0
pub fn to_rgba_f32(
    buffer: &PixelBuffer, colorspace: ColorSpace, from: Trc, to: Trc
) -> Result<PixelBuffer, ImageErrors> {
    static SUPPORTED: [ColorSpace; 4] = [
        ColorSpace::Luma,
        ColorSpace::LumaA,
        ColorSpace::RGB,
        ColorSpace::RGBA
    ];
    if !SUPPORTED.contains(&colorspace) {
        return Err(ImageErrors::UnsupportedColorspace(
            colorspace,
            "to_rgba_f32",
            &SUPPORTED
        ));
    }
    let mut samples = to_f32_samples(buffer.samples())?;
    change_trc(&mut samples, colorspace, from, to);

    let channels = colorspace.num_components();
    let pixels = samples.len() / channels;
    let mut out = try_vec_f32(pixels * 4)?;

    for (dst, src) in out.chunks_exact_mut(4).zip(samples.chunks_exact(channels)) {
        match colorspace {
            ColorSpace::Luma => dst.copy_from_slice(&[src[0], src[0], src[0], 1.0]),
            ColorSpace::LumaA => dst.copy_from_slice(&[src[0], src[0], src[0], src[1]]),
            ColorSpace::RGB => dst.copy_from_slice(&[src[0], src[1], src[2], 1.0]),
            _ => dst.copy_from_slice(src)
        }
    }
    let format = PixelFormat::new(4, BitType::F32)?;
    PixelBuffer::from_samples(buffer.width(), buffer.height(), format, SampleBuffer::F32(out))
}

/// Naive CMYK to RGB, the same formula babl uses without a profile
///
/// `r = (1 - c) * (1 - k)`, likewise for green and blue
pub fn cmyk_to_rgb(buffer: &PixelBuffer) -> Result<PixelBuffer, ImageErrors> {
    if buffer.format().num_channels() != 4 {
        return Err(ImageErrors::InvalidChannelCount(buffer.format().num_channels()));
    }
    let samples = to_f32_samples(buffer.samples())?;
    let mut out = try_vec_f32(samples.len() / 4 * 3)?;

    for (rgb, cmyk) in out.chunks_exact_mut(3).zip(samples.chunks_exact(4)) {
        let k = 1.0 - cmyk[3];
        rgb[0] = (1.0 - cmyk[0]) * k;
        rgb[1] = (1.0 - cmyk[1]) * k;
        rgb[2] = (1.0 - cmyk[2]) * k;
    }
    let bit_type = buffer.format().bit_type();
    let format = PixelFormat::new(3, bit_type)?;
    let samples = from_f32_samples(&out, bit_type)?;
    PixelBuffer::from_samples(buffer.width(), buffer.height(), format, samples)
}

/// Transform RGB(A) pixels described by an ICC profile into sRGB
///
/// The result is non-linear sRGB floats
#[cfg(feature = "cms")]
pub fn icc_to_srgb(
    buffer: &PixelBuffer, colorspace: ColorSpace, icc: &[u8]
) -> Result<PixelBuffer, ImageErrors> {
    if !matches!(colorspace, ColorSpace::RGB | ColorSpace::RGBA) {
        return Err(ImageErrors::UnsupportedColorspace(
            colorspace,
            "icc_to_srgb",
            &[ColorSpace::RGB, ColorSpace::RGBA]
        ));
    }
    let input = to_f32_samples(buffer.samples())?;
    let mut output = try_vec_f32(input.len())?;
    crate::profile::cms::transform_to_srgb(icc, colorspace.has_alpha(), &input, &mut output)?;

    let format = PixelFormat::new(buffer.format().num_channels(), BitType::F32)?;
    PixelBuffer::from_samples(buffer.width(), buffer.height(), format, SampleBuffer::F32(output))
}
