/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The prism host image model
//!
//! An [`Image`](image::Image) is a stack of [`Layer`](image::Layer)s, each
//! holding a single interleaved [`PixelBuffer`](buffer::PixelBuffer), plus
//! a color profile and opaque metadata blobs.
//!
//! Codecs produce and consume images through a deliberately small surface:
//! create, insert a layer, read a layer buffer and replace layer pixels.
//!
//! # Features
//! - `log`: Log through the [log](https://docs.rs/log) crate
//! - `metadata`: Parse Exif blobs into fields with kamadak-exif
//! - `cms`: Parse ICC profiles and transform into sRGB with moxcms
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

pub mod buffer;
pub mod convert;
pub mod errors;
pub mod image;
pub mod metadata;
pub mod profile;
pub mod traits;
