/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Core routines shared by all prism crates
//!
//! It currently contains
//!
//! - A small big-endian byte reader used for signature and box walking
//! - Colorspace and bit depth information shared by images
//! - Image decoder and encoder options
//! - A logging facade that compiles away when the `log` feature is off
//!
//! # Features
//!  - `log`: Route `prism_core::log` macros to the [log](https://docs.rs/log) crate
#![macro_use]

pub mod bit_depth;
pub mod bytestream;
pub mod colorspace;
#[cfg(not(feature = "log"))]
pub mod log;
pub mod options;

#[cfg(feature = "log")]
pub use log;
