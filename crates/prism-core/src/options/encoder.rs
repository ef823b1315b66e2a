/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use bitflags::bitflags;

use crate::bit_depth::BitDepth;
use crate::options::default_num_threads;

bitflags! {
    /// Encoder options that are flags
    #[derive(Copy, Debug, Clone, Eq, PartialEq)]
    struct EncoderFlags: u32 {
        /// Encode without loss, ignoring the distance
        const LOSSLESS     = 0b0000_0001;
        /// Carry the image's own color profile into the output
        const KEEP_PROFILE = 0b0000_0010;
        /// Attach the image's Exif blob as a container box
        const SAVE_EXIF    = 0b0000_0100;
        /// Attach the image's XMP packet as a container box
        const SAVE_XMP     = 0b0000_1000;
    }
}

impl Default for EncoderFlags {
    fn default() -> Self {
        let mut options = EncoderFlags::empty();
        options.set(EncoderFlags::LOSSLESS, false);
        options.set(EncoderFlags::KEEP_PROFILE, false);
        options.set(EncoderFlags::SAVE_EXIF, true);
        options.set(EncoderFlags::SAVE_XMP, true);

        options
    }
}

/// Smallest frame distance a lossy encode may request
pub const MIN_LOSSY_DISTANCE: f32 = 0.1;
/// Largest frame distance accepted
pub const MAX_DISTANCE: f32 = 15.0;

/// Options shared by the prism encoders
#[derive(Debug, Copy, Clone)]
pub struct EncoderOptions {
    depth:       BitDepth,
    distance:    f32,
    effort:      u8,
    num_threads: usize,
    flags:       EncoderFlags
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            depth:       BitDepth::Eight,
            distance:    1.0,
            effort:      7,
            num_threads: default_num_threads(),
            flags:       EncoderFlags::default()
        }
    }
}

impl EncoderOptions {
    /// Get the depth for which the image will be encoded in
    pub const fn get_depth(&self) -> BitDepth {
        self.depth
    }

    /// Get the frame distance lossy encodes target
    ///
    /// Lower is higher quality, 1.0 is visually lossless
    pub const fn get_distance(&self) -> f32 {
        self.distance
    }

    /// Get the effort, between 1 (fastest) and 9 (slowest)
    pub const fn get_effort(&self) -> u8 {
        self.effort
    }

    /// Return number of threads configured for multithreading
    /// where possible
    pub const fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub const fn get_lossless(&self) -> bool {
        self.flags.contains(EncoderFlags::LOSSLESS)
    }

    pub const fn get_keep_profile(&self) -> bool {
        self.flags.contains(EncoderFlags::KEEP_PROFILE)
    }

    pub const fn get_save_exif(&self) -> bool {
        self.flags.contains(EncoderFlags::SAVE_EXIF)
    }

    pub const fn get_save_xmp(&self) -> bool {
        self.flags.contains(EncoderFlags::SAVE_XMP)
    }

    /// Set depth for the image to be encoded
    ///
    /// Anything deeper than eight bits is stored as sixteen bits
    #[must_use]
    pub fn set_depth(mut self, depth: BitDepth) -> Self {
        self.depth = match depth {
            BitDepth::Eight | BitDepth::Unknown => BitDepth::Eight,
            _ => BitDepth::Sixteen
        };
        self
    }

    /// Set the frame distance, clamped to `[0.0, 15.0]`
    #[must_use]
    pub fn set_distance(mut self, distance: f32) -> Self {
        self.distance = if distance.is_nan() {
            1.0
        } else {
            distance.clamp(0.0, MAX_DISTANCE)
        };
        self
    }

    /// Set the effort, clamped to `[1, 9]`
    #[must_use]
    pub fn set_effort(mut self, effort: u8) -> Self {
        self.effort = effort.clamp(1, 9);
        self
    }

    /// Set the number of threads allowed for multithreaded encoding
    /// where supported
    ///
    /// Zero is treated as one.
    #[must_use]
    pub fn set_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads.max(1);
        self
    }

    #[must_use]
    pub fn set_lossless(mut self, yes: bool) -> Self {
        self.flags.set(EncoderFlags::LOSSLESS, yes);
        self
    }

    #[must_use]
    pub fn set_keep_profile(mut self, yes: bool) -> Self {
        self.flags.set(EncoderFlags::KEEP_PROFILE, yes);
        self
    }

    #[must_use]
    pub fn set_save_exif(mut self, yes: bool) -> Self {
        self.flags.set(EncoderFlags::SAVE_EXIF, yes);
        self
    }

    #[must_use]
    pub fn set_save_xmp(mut self, yes: bool) -> Self {
        self.flags.set(EncoderFlags::SAVE_XMP, yes);
        self
    }
}
