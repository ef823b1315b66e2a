/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image processing routines for prism images
//!
//! This implements the HSV color transform and the legacy "HSV Value"
//! layer mode on top of it.
//!
//! The layer mode implements the `OperationsTrait` defined by prism-image.
//!
//! # Example
//! - Take the value of a layer and keep the hue and saturation of the image
//! ```
//! use prism_core::colorspace::ColorSpace;
//! use prism_image::buffer::{PixelBuffer, PixelFormat, SampleBuffer};
//! use prism_image::image::{ColorModel, Image, Layer, Precision};
//! use prism_image::traits::OperationsTrait;
//! use prism_core::bit_depth::BitType;
//! use prism_imageprocs::hsv_value_legacy::HsvValueLegacy;
//!
//! let format = PixelFormat::new(4, BitType::F32).unwrap();
//! let base = PixelBuffer::from_samples(1, 1, format, SampleBuffer::F32(vec![1.0, 0.0, 0.0, 1.0])).unwrap();
//! let layer = PixelBuffer::from_samples(1, 1, format, SampleBuffer::F32(vec![0.5, 0.5, 0.5, 1.0])).unwrap();
//!
//! let mut image = Image::new(1, 1, ColorModel::Rgb, Precision::FLOAT_NON_LINEAR).unwrap();
//! image.insert_layer(Layer::new("base", ColorSpace::RGBA, base).unwrap(), 0).unwrap();
//!
//! HsvValueLegacy::new(&layer, 1.0).execute(&mut image).unwrap();
//! // still red, at half the value
//! assert_eq!(image.layer_buffer(0).unwrap().samples().as_f32().unwrap(), &[0.5, 0.0, 0.0, 1.0]);
//! ```
#![warn(
    clippy::correctness,
    clippy::perf,
    clippy::pedantic,
    clippy::inline_always,
    clippy::missing_errors_doc,
    clippy::panic
)]
#![allow(
    clippy::needless_return,
    clippy::similar_names,
    clippy::inline_always,
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::many_single_char_names
)]

pub mod hsv;
pub mod hsv_value_legacy;
