/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Owned pixel storage
//!
//! A [`PixelBuffer`] is a dense, row-major, interleaved block of samples
//! described by a [`PixelFormat`]. Samples are typed ([`SampleBuffer`])
//! and can be viewed as raw bytes for codecs that write into them.
use core::mem::size_of;

use prism_core::bit_depth::{BitType, ByteEndian};
use prism_core::colorspace::ColorSpace;

use crate::errors::ImageErrors;
use crate::image::ColorModel;

/// Layout of a single pixel
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PixelFormat {
    num_channels: u8,
    bit_type:     BitType,
    endian:       ByteEndian
}

impl PixelFormat {
    /// Create a new pixel format in native endian
    ///
    /// # Errors
    /// If `num_channels` is not between 1 and 4
    pub fn new(num_channels: usize, bit_type: BitType) -> Result<PixelFormat, ImageErrors> {
        if !(1..=4).contains(&num_channels) {
            return Err(ImageErrors::InvalidChannelCount(num_channels));
        }
        Ok(PixelFormat {
            num_channels: num_channels as u8,
            bit_type,
            endian: ByteEndian::Native
        })
    }

    /// Pixel format holding one pixel of `colorspace`
    pub fn for_colorspace(
        colorspace: ColorSpace, bit_type: BitType
    ) -> Result<PixelFormat, ImageErrors> {
        PixelFormat::new(colorspace.num_components(), bit_type)
    }

    #[must_use]
    pub const fn with_endian(mut self, endian: ByteEndian) -> PixelFormat {
        self.endian = endian;
        self
    }

    pub const fn num_channels(&self) -> usize {
        self.num_channels as usize
    }

    pub const fn bit_type(&self) -> BitType {
        self.bit_type
    }

    pub const fn endian(&self) -> ByteEndian {
        self.endian
    }

    /// Size of a single sample in bytes
    pub const fn sample_size(&self) -> usize {
        self.bit_type.size_of()
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        self.sample_size() * self.num_channels()
    }

    /// Check that the channel count is one a color model can be stored in
    ///
    /// Gray takes one channel plus optional alpha, RGB takes three plus optional
    /// alpha. CMYK color planes are handed out as three channels with an optional
    /// fourth, the key lives in its own buffer.
    pub fn check_model(&self, model: ColorModel) -> Result<(), ImageErrors> {
        let ok = match model {
            ColorModel::Gray => matches!(self.num_channels, 1 | 2),
            ColorModel::Rgb | ColorModel::Cmyk => matches!(self.num_channels, 3 | 4)
        };
        if ok {
            Ok(())
        } else {
            Err(ImageErrors::GenericString(format!(
                "{} channels cannot hold a {model:?} pixel",
                self.num_channels
            )))
        }
    }
}

/// Typed sample storage
#[derive(Clone, Debug, PartialEq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>)
}

fn try_zeroed_vec<T: Copy + Default>(len: usize) -> Result<Vec<T>, ImageErrors> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(len)
        .map_err(|_| ImageErrors::OutOfMemory(len.saturating_mul(size_of::<T>())))?;
    storage.resize(len, T::default());
    Ok(storage)
}

impl SampleBuffer {
    /// Allocate `len` zeroed samples of `bit_type`
    ///
    /// # Errors
    /// [`ImageErrors::OutOfMemory`] if the allocation cannot be satisfied,
    /// this never aborts the process
    pub fn try_zeroed(bit_type: BitType, len: usize) -> Result<SampleBuffer, ImageErrors> {
        Ok(match bit_type {
            BitType::U8 => SampleBuffer::U8(try_zeroed_vec(len)?),
            BitType::U16 => SampleBuffer::U16(try_zeroed_vec(len)?),
            BitType::F32 => SampleBuffer::F32(try_zeroed_vec(len)?),
            _ => return Err(ImageErrors::UnsupportedBitType("allocate", bit_type))
        })
    }

    pub const fn bit_type(&self) -> BitType {
        match self {
            SampleBuffer::U8(_) => BitType::U8,
            SampleBuffer::U16(_) => BitType::U16,
            SampleBuffer::F32(_) => BitType::F32
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::U8(v) => v.len(),
            SampleBuffer::U16(v) => v.len(),
            SampleBuffer::F32(v) => v.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The samples as native endian bytes
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SampleBuffer::U8(v) => v,
            SampleBuffer::U16(v) => bytemuck::cast_slice(v),
            SampleBuffer::F32(v) => bytemuck::cast_slice(v)
        }
    }

    /// The samples as mutable native endian bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            SampleBuffer::U8(v) => v,
            SampleBuffer::U16(v) => bytemuck::cast_slice_mut(v),
            SampleBuffer::F32(v) => bytemuck::cast_slice_mut(v)
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            SampleBuffer::U8(v) => Some(v),
            _ => None
        }
    }

    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            SampleBuffer::U16(v) => Some(v),
            _ => None
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            SampleBuffer::F32(v) => Some(v),
            _ => None
        }
    }

    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            SampleBuffer::F32(v) => Some(v),
            _ => None
        }
    }
}

/// Number of samples a `width` x `height` image with `channels` channels holds
///
/// # Errors
/// If either dimension is zero or the product overflows
pub fn sample_count(width: usize, height: usize, channels: usize) -> Result<usize, ImageErrors> {
    if width == 0 || height == 0 {
        return Err(ImageErrors::ZeroOrOverflowDimensions(width, height));
    }
    width
        .checked_mul(height)
        .and_then(|x| x.checked_mul(channels))
        .ok_or(ImageErrors::ZeroOrOverflowDimensions(width, height))
}

/// A dense interleaved pixel buffer
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width:   usize,
    height:  usize,
    format:  PixelFormat,
    samples: SampleBuffer
}

impl PixelBuffer {
    /// Allocate a zeroed buffer
    pub fn new_zeroed(
        width: usize, height: usize, format: PixelFormat
    ) -> Result<PixelBuffer, ImageErrors> {
        let len = sample_count(width, height, format.num_channels())?;
        let samples = SampleBuffer::try_zeroed(format.bit_type(), len)?;

        Ok(PixelBuffer {
            width,
            height,
            format,
            samples
        })
    }

    /// Wrap already existing samples
    ///
    /// # Errors
    /// If the sample type or count disagrees with the format and dimensions
    pub fn from_samples(
        width: usize, height: usize, format: PixelFormat, samples: SampleBuffer
    ) -> Result<PixelBuffer, ImageErrors> {
        if samples.bit_type() != format.bit_type() {
            return Err(ImageErrors::GenericString(format!(
                "Sample type {:?} does not match format {:?}",
                samples.bit_type(),
                format.bit_type()
            )));
        }
        let expected = sample_count(width, height, format.num_channels())?;
        if samples.len() != expected {
            return Err(ImageErrors::LengthMisMatch(expected, samples.len()));
        }
        Ok(PixelBuffer {
            width,
            height,
            format,
            samples
        })
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub const fn format(&self) -> PixelFormat {
        self.format
    }

    pub const fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut SampleBuffer {
        &mut self.samples
    }

    /// Size of the buffer in bytes
    pub fn byte_len(&self) -> usize {
        self.samples.len() * self.format.sample_size()
    }

    pub fn into_samples(self) -> SampleBuffer {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use prism_core::bit_depth::BitType;

    use super::*;

    #[test]
    fn channel_count_is_validated() {
        assert!(PixelFormat::new(0, BitType::U8).is_err());
        assert!(PixelFormat::new(5, BitType::U8).is_err());
        assert!(PixelFormat::new(4, BitType::F32).is_ok());
    }

    #[test]
    fn model_consistency() {
        let gray_alpha = PixelFormat::new(2, BitType::U16).unwrap();
        assert!(gray_alpha.check_model(ColorModel::Gray).is_ok());
        assert!(gray_alpha.check_model(ColorModel::Rgb).is_err());

        let rgb = PixelFormat::new(3, BitType::U8).unwrap();
        assert!(rgb.check_model(ColorModel::Gray).is_err());
        assert!(rgb.check_model(ColorModel::Cmyk).is_ok());
    }

    #[test]
    fn byte_view_covers_all_samples() {
        let format = PixelFormat::new(3, BitType::U16).unwrap();
        let mut buffer = PixelBuffer::new_zeroed(2, 3, format).unwrap();
        assert_eq!(buffer.samples().len(), 18);
        assert_eq!(buffer.byte_len(), 36);
        assert_eq!(buffer.samples_mut().as_bytes_mut().len(), 36);
    }

    #[test]
    fn zero_dimensions_rejected() {
        let format = PixelFormat::new(1, BitType::U8).unwrap();
        assert!(PixelBuffer::new_zeroed(0, 10, format).is_err());
        assert!(sample_count(usize::MAX, 2, 1).is_err());
    }

    #[test]
    fn from_samples_checks_length_and_type() {
        let format = PixelFormat::new(1, BitType::U8).unwrap();
        assert!(PixelBuffer::from_samples(2, 2, format, SampleBuffer::U8(vec![0; 3])).is_err());
        assert!(PixelBuffer::from_samples(2, 2, format, SampleBuffer::U16(vec![0; 4])).is_err());
        assert!(PixelBuffer::from_samples(2, 2, format, SampleBuffer::U8(vec![0; 4])).is_ok());
    }
}
