/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image bit depth, information and manipulations

/// The image bit depth.
///
/// This is the depth of the samples as stored in memory, not the depth
/// the codestream declared. A 12 bit JPEG XL image decoded into `u16`
/// storage has a bit depth of [`BitDepth::Sixteen`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[non_exhaustive]
pub enum BitDepth {
    /// Eight bit depth.
    ///
    /// Images with such bit depth use [`u8`] to store
    /// pixels and use the whole range from 0-255.
    Eight,
    /// Sixteen bit depth
    ///
    /// Images with such bit depths use [`u16`] to store values and use the whole range
    /// i.e 0-65535
    ///
    /// Data is stored and processed in native endian.
    Sixteen,
    /// Floating point depth
    ///
    /// Samples are [`f32`], nominally in the range 0.0-1.0
    /// but values outside it are preserved.
    Float32,
    /// Bit depth information is unknown
    #[default]
    Unknown
}

/// The underlying bit representation of the image
///
/// This represents the minimum rust type that
/// can be used to represent image data
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum BitType {
    /// Samples are stored as [`u8`]
    U8,
    /// Samples are stored as [`u16`]
    U16,
    /// Samples are stored as [`f32`]
    F32
}

impl BitType {
    /// Number of bytes a single sample of this type occupies
    pub const fn size_of(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4
        }
    }

    /// The bit depth this storage type represents
    pub const fn to_depth(self) -> BitDepth {
        match self {
            Self::U8 => BitDepth::Eight,
            Self::U16 => BitDepth::Sixteen,
            Self::F32 => BitDepth::Float32
        }
    }
}

impl BitDepth {
    /// Return the storage type for samples of this bit depth
    ///
    /// Returns `None` for [`BitDepth::Unknown`]
    ///
    /// # Example
    ///
    /// ```
    /// use prism_core::bit_depth::{BitDepth, BitType};
    /// assert_eq!(BitDepth::Eight.bit_type(), Some(BitType::U8));
    /// assert_eq!(BitDepth::Float32.bit_type(), Some(BitType::F32));
    /// ```
    pub const fn bit_type(self) -> Option<BitType> {
        match self {
            Self::Eight => Some(BitType::U8),
            Self::Sixteen => Some(BitType::U16),
            Self::Float32 => Some(BitType::F32),
            Self::Unknown => None
        }
    }

    /// Get the number of bytes needed to store a single sample
    /// of this depth, zero if the depth is unknown
    pub const fn size_of(self) -> usize {
        match self.bit_type() {
            Some(ty) => ty.size_of(),
            None => 0
        }
    }

    /// Number of significant bits per sample
    pub const fn bits(self) -> u32 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
            Self::Float32 => 32,
            Self::Unknown => 0
        }
    }
}

/// The byte order samples wider than a byte are laid out in
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum ByteEndian {
    /// Little endian
    LE,
    /// Big endian
    BE,
    /// Whatever the platform is
    #[default]
    Native
}
