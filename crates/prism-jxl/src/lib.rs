/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A JPEG XL codec adapter for prism images
//!
//! This crate turns JPEG XL files into [`Image`]s and back. The actual
//! coding is done by a backend speaking the event protocol in [`backend`],
//! the adapter drives it: it checks signatures, picks pixel formats,
//! resolves color profiles, merges CMYK planes and collects metadata boxes.
//!
//! # Example
//! Decode a file
//!```no_run
//! use prism_core::options::DecoderOptions;
//!
//! let data = std::fs::read("image.jxl").unwrap();
//! let image = prism_jxl::decode_jxl(&data, DecoderOptions::default()).unwrap();
//! println!("{:?}", image.dimensions());
//!```
//!
//! # Features
//! - `oxide`: Decoding through jxl-oxide
//! - `zune`: Lossless encoding through zune-jpegxl
//! - `threads`: Let backends use more than one thread
//! - `cms`: Transform non-sRGB sources into sRGB before encoding
//! - `log`: Log through the [log](https://docs.rs/log) crate
#![allow(
    clippy::needless_return,
    clippy::similar_names,
    clippy::inline_always,
    clippy::doc_markdown,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions
)]

#[cfg(feature = "oxide")]
use prism_core::options::DecoderOptions;
#[cfg(feature = "zune")]
use prism_core::options::EncoderOptions;
#[cfg(any(feature = "oxide", feature = "zune"))]
use prism_image::image::Image;

pub use crate::decoder::{DecodedImage, JxlDecoder};
pub use crate::encoder::{EncodeRequest, JxlEncoder, Quality};
pub use crate::errors::JxlErrors;
pub use crate::signature::{check_signature, JxlSignature};

pub mod backend;
pub mod backends;
pub mod boxes;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod format;
pub mod merge;
pub mod runner;
pub mod signature;
#[cfg(test)]
mod testing;

/// Decode a JPEG XL file with the jxl-oxide backend
///
/// # Errors
/// See [`JxlDecoder::decode_image`]
#[cfg(feature = "oxide")]
pub fn decode_jxl(data: &[u8], options: DecoderOptions) -> Result<Image, JxlErrors> {
    let backend = backends::oxide::OxideDecoder::new();
    JxlDecoder::new_with_backend(data, options, backend).decode_image()
}

/// Encode the bottom layer of an image with the zune-jpegxl backend
///
/// zune-jpegxl is lossless only, so options asking for lossy output fail
///
/// # Errors
/// See [`JxlEncoder::encode`]
#[cfg(feature = "zune")]
pub fn encode_jxl(image: &Image, options: EncoderOptions) -> Result<Vec<u8>, JxlErrors> {
    let backend = backends::zune::ZuneEncoder::new();
    JxlEncoder::new_with_backend(options, backend).encode(image)
}
