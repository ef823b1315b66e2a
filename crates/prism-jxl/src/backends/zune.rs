/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! An encoder backend on top of [`zune-jpegxl`](zune_jpegxl)
//!
//! zune-jpegxl writes lossless modular codestreams of 8 and 16 bit
//! gray and RGB images tagged as sRGB. Everything it cannot express
//! is refused when configured, so the adapter fails before any work is done.
//!
//! The codestream is produced on the first [`process_output`](JxlEncoderBackend::process_output)
//! call, container boxes are written around it by this backend.
#![cfg(feature = "zune")]

use prism_core::bit_depth::{BitType, ByteEndian};
use prism_core::log::trace;
use prism_image::buffer::PixelFormat;
use zune_jpegxl::JxlSimpleEncoder;

use crate::backend::{BasicInfo, EncodedColor, EncoderStatus, JxlEncoderBackend};
use crate::boxes::write_box;
use crate::errors::JxlErrors;
use crate::runner::ParallelRunner;
use crate::signature::CONTAINER_SIGNATURE;

/// `ftyp` payload of a JPEG XL container
const FILE_TYPE: [u8; 12] = *b"jxl \0\0\0\0jxl ";

fn unsupported(what: &str) -> JxlErrors {
    JxlErrors::Backend(format!("zune-jpegxl does not support {what}"))
}

/// Lossless encoder backend powered by zune-jpegxl
#[derive(Default)]
pub struct ZuneEncoder {
    threads:   usize,
    container: bool,
    level:     Option<u8>,
    info:      Option<BasicInfo>,
    effort:    u8,
    frame:     Option<(PixelFormat, Vec<u8>)>,
    boxes:     Vec<([u8; 4], Vec<u8>)>,
    closed:    bool,
    output:    Option<Vec<u8>>,
    position:  usize,
    error:     Option<String>
}

impl ZuneEncoder {
    pub fn new() -> ZuneEncoder {
        ZuneEncoder::default()
    }

    fn codestream(&self) -> Result<Vec<u8>, JxlErrors> {
        let info = self
            .info
            .ok_or(JxlErrors::Backend("No basic info was set".to_string()))?;
        let (format, pixels) = self
            .frame
            .as_ref()
            .ok_or(JxlErrors::Backend("No frame was added".to_string()))?;

        let colorspace = match (info.num_color_channels, info.has_alpha()) {
            (1, false) => zune_core::colorspace::ColorSpace::Luma,
            (1, true) => zune_core::colorspace::ColorSpace::LumaA,
            (3, false) => zune_core::colorspace::ColorSpace::RGB,
            (3, true) => zune_core::colorspace::ColorSpace::RGBA,
            (n, _) => return Err(unsupported(&format!("{n} color channels")))
        };
        let depth = match format.bit_type() {
            BitType::U8 => zune_core::bit_depth::BitDepth::Eight,
            BitType::U16 => zune_core::bit_depth::BitDepth::Sixteen,
            other => return Err(unsupported(&format!("{other:?} samples")))
        };
        let threads = u8::try_from(self.threads).unwrap_or(u8::MAX);
        let options = zune_core::options::EncoderOptions::new(info.width, info.height, colorspace, depth)
            .set_num_threads(threads)
            .set_effort(self.effort);

        trace!("zune-jpegxl: {colorspace:?} {depth:?}, {threads} threads");

        JxlSimpleEncoder::new(pixels, options)
            .encode()
            .map_err(|x| JxlErrors::Backend(format!("{x:?}")))
    }

    /// Wrap a codestream into a container with the collected boxes
    fn wrap(&self, codestream: Vec<u8>) -> Result<Vec<u8>, JxlErrors> {
        if !self.container {
            return Ok(codestream);
        }
        let mut output = Vec::with_capacity(codestream.len() + 64);
        output.extend_from_slice(&CONTAINER_SIGNATURE);
        write_box(&mut output, *b"ftyp", &FILE_TYPE)?;

        if let Some(level) = self.level {
            write_box(&mut output, *b"jxll", &[level])?;
        }
        for (box_type, payload) in &self.boxes {
            write_box(&mut output, *box_type, payload)?;
        }
        write_box(&mut output, *b"jxlc", &codestream)?;
        Ok(output)
    }

    fn produce(&mut self) -> Result<(), JxlErrors> {
        if !self.closed {
            return Err(JxlErrors::Backend("Input was not closed".to_string()));
        }
        let codestream = self.codestream()?;
        self.output = Some(self.wrap(codestream)?);
        self.position = 0;
        Ok(())
    }
}

impl JxlEncoderBackend for ZuneEncoder {
    fn set_parallel_runner(&mut self, runner: &ParallelRunner) -> Result<(), JxlErrors> {
        self.threads = runner.num_threads();
        Ok(())
    }

    fn release_parallel_runner(&mut self) {
        self.threads = 1;
    }

    fn use_container(&mut self, container: bool) -> Result<(), JxlErrors> {
        self.container = container;
        Ok(())
    }

    fn set_codestream_level(&mut self, level: u8) -> Result<(), JxlErrors> {
        self.level = Some(level);
        Ok(())
    }

    fn use_boxes(&mut self) -> Result<(), JxlErrors> {
        if !self.container {
            return Err(JxlErrors::Backend("Boxes need a container".to_string()));
        }
        Ok(())
    }

    fn set_basic_info(&mut self, info: &BasicInfo) -> Result<(), JxlErrors> {
        if info.exponent_bits_per_sample != 0 {
            return Err(unsupported("floating point samples"));
        }
        if info.width <= 1 || info.height <= 1 {
            return Err(unsupported("images one pixel wide or tall"));
        }
        self.info = Some(*info);
        Ok(())
    }

    fn set_icc_profile(&mut self, _: &[u8]) -> Result<(), JxlErrors> {
        Err(unsupported("ICC profiles"))
    }

    fn set_color_encoding(&mut self, color: &EncodedColor) -> Result<(), JxlErrors> {
        // the codestream header always declares sRGB
        let gray = self.info.is_some_and(|x| x.num_color_channels == 1);
        if *color != EncodedColor::srgb(gray) {
            return Err(unsupported(&format!("the color encoding {color:?}")));
        }
        Ok(())
    }

    fn set_frame_distance(&mut self, distance: f32) -> Result<(), JxlErrors> {
        if distance != 0.0 {
            return Err(unsupported("lossy encoding"));
        }
        Ok(())
    }

    fn set_frame_lossless(&mut self, lossless: bool) -> Result<(), JxlErrors> {
        if !lossless {
            return Err(unsupported("lossy encoding"));
        }
        Ok(())
    }

    fn set_effort(&mut self, effort: u8) -> Result<(), JxlErrors> {
        self.effort = effort;
        Ok(())
    }

    fn add_image_frame(&mut self, format: PixelFormat, pixels: &[u8]) -> Result<(), JxlErrors> {
        if format.endian() != ByteEndian::Native {
            return Err(unsupported("non native byte order"));
        }
        if self.frame.is_some() {
            return Err(unsupported("more than one frame"));
        }
        self.frame = Some((format, pixels.to_vec()));
        Ok(())
    }

    fn add_box(
        &mut self, box_type: [u8; 4], contents: &[u8], compress: bool
    ) -> Result<(), JxlErrors> {
        if compress {
            return Err(unsupported("compressed boxes"));
        }
        if !self.container {
            return Err(JxlErrors::Backend("Boxes need a container".to_string()));
        }
        self.boxes.push((box_type, contents.to_vec()));
        Ok(())
    }

    fn close_input(&mut self) {
        self.closed = true;
    }

    fn process_output(&mut self, output: &mut [u8]) -> (EncoderStatus, usize) {
        if self.output.is_none() {
            if let Err(err) = self.produce() {
                self.error = Some(format!("{err:?}").trim_end().to_string());
                return (EncoderStatus::Error, 0);
            }
        }
        let Some(encoded) = self.output.as_ref() else {
            return (EncoderStatus::Error, 0);
        };
        let rest = &encoded[self.position..];
        let count = rest.len().min(output.len());
        output[..count].copy_from_slice(&rest[..count]);
        self.position += count;

        if self.position < encoded.len() {
            (EncoderStatus::NeedMoreOutput, count)
        } else {
            (EncoderStatus::Success, count)
        }
    }

    fn last_error(&self) -> Option<String> {
        self.error.clone()
    }
}
