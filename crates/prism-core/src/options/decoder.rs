/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Global Decoder options

use crate::options::default_num_threads;

/// Decoder options that are flags
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct DecoderFlags {
    /// Whether container metadata boxes (Exif, XMP) should be collected
    read_metadata: bool
}

impl Default for DecoderFlags {
    fn default() -> Self {
        DecoderFlags {
            read_metadata: true
        }
    }
}

/// Decoder options
///
/// Not all options are respected by decoders all decoders
#[derive(Debug, Copy, Clone)]
pub struct DecoderOptions {
    /// Maximum width for which decoders will
    /// not try to decode images larger than
    /// the specified width.
    ///
    /// - Default value: 16384
    max_width:   usize,
    /// Maximum height for which decoders will not
    /// try to decode images larger than the
    /// specified height
    ///
    /// - Default value: 16384
    max_height:  usize,
    /// Number of threads the parallel runner handed to the
    /// decoder is sized to
    ///
    /// - Default value: available parallelism
    num_threads: usize,
    flags:       DecoderFlags
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_width:   1 << 14,
            max_height:  1 << 14,
            num_threads: default_num_threads(),
            flags:       DecoderFlags::default()
        }
    }
}

impl DecoderOptions {
    /// Get maximum width configured for which the decoder
    /// should not try to decode images greater than this width
    pub const fn get_max_width(&self) -> usize {
        self.max_width
    }

    /// Get maximum height configured for which the decoder should
    /// not try to decode images greater than this height
    pub const fn get_max_height(&self) -> usize {
        self.max_height
    }

    /// Get the number of threads the decoder may use
    pub const fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    /// Whether metadata boxes should be read from container files
    pub const fn get_read_metadata(&self) -> bool {
        self.flags.read_metadata
    }

    /// Set maximum width for which the decoder should not try
    /// decoding images greater than that width
    ///
    /// # Arguments
    ///
    /// * `width`:  The maximum width allowed
    ///
    /// returns: DecoderOptions
    #[must_use]
    pub fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    /// Set maximum height for which the decoder should not try
    /// decoding images greater than that height
    /// # Arguments
    ///
    /// * `height`: The maximum height allowed
    ///
    /// returns: DecoderOptions
    #[must_use]
    pub fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }

    /// Set the number of threads the decoder's runner will be sized to
    ///
    /// Zero is treated as one.
    #[must_use]
    pub fn set_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads.max(1);
        self
    }

    /// Set whether container metadata should be read
    #[must_use]
    pub fn set_read_metadata(mut self, yes: bool) -> Self {
        self.flags.read_metadata = yes;
        self
    }
}
