/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decoder and encoder options
//!
//! This module exposes structs for which the prism decoders and encoders
//! get shared options.
//!
//! Options are built with chained `set_*` calls and read back with `get_*` calls.
pub use decoder::DecoderOptions;
pub use encoder::{EncoderOptions, MAX_DISTANCE, MIN_LOSSY_DISTANCE};

mod decoder;
mod encoder;

/// Number of threads to use when the caller did not say otherwise
///
/// This is the available parallelism of the machine, or 1 if it can't be
/// determined.
pub fn default_num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|x| x.get())
        .unwrap_or(1)
}
