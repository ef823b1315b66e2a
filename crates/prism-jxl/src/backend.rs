/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The boundary between the adapter and a JPEG XL codec
//!
//! A backend is an event driven codec: the adapter feeds it input,
//! asks it to make progress and reacts to the status it reports.
//! Decoders report [`DecoderStatus`] events in a fixed order, encoders
//! report [`EncoderStatus`] while their output is drained.
//!
//! Any codec that can speak this protocol can be plugged into
//! [`JxlDecoder`](crate::decoder::JxlDecoder) or
//! [`JxlEncoder`](crate::encoder::JxlEncoder).
use bitflags::bitflags;
use prism_image::buffer::{PixelFormat, SampleBuffer};

use crate::errors::JxlErrors;
use crate::runner::ParallelRunner;

/// Events a decoder backend reports from [`process_input`](JxlDecoderBackend::process_input)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DecoderStatus {
    /// Nothing more to do
    Success,
    /// The backend failed, [`last_error`](JxlDecoderBackend::last_error) may say why
    Error,
    /// The input ran out, input is always closed so this means truncation
    NeedMoreInput,
    /// An output buffer for the main image is needed
    NeedImageOutBuffer,
    /// [`basic_info`](JxlDecoderBackend::basic_info) is available
    BasicInfo,
    /// Color information is available
    ColorEncoding,
    /// The main image has been written to the output buffers
    FullImage,
    /// A new box starts
    Box,
    /// The box buffer is full
    BoxNeedMoreOutput
}

/// Status reported by [`process_output`](JxlEncoderBackend::process_output)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EncoderStatus {
    Success,
    Error,
    NeedMoreOutput
}

bitflags! {
    /// Events a decoder should stop at
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct Events: u32 {
        const BASIC_INFO     = 0b0001;
        const COLOR_ENCODING = 0b0010;
        const FULL_IMAGE     = 0b0100;
        const BOX            = 0b1000;
    }
}

/// Image wide header information
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BasicInfo {
    pub width:                    usize,
    pub height:                   usize,
    pub bits_per_sample:          u32,
    /// Non zero for floating point samples
    pub exponent_bits_per_sample: u32,
    pub num_color_channels:       u32,
    /// Zero when the image has no alpha
    pub alpha_bits:               u32,
    pub num_extra_channels:       u32,
    /// False if the codestream is stored in an internal (XYB) color space
    pub uses_original_profile:    bool,
    pub have_container:           bool
}

impl BasicInfo {
    pub const fn has_alpha(&self) -> bool {
        self.alpha_bits > 0
    }
}

/// What an extra channel holds
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ExtraChannelKind {
    Alpha,
    Depth,
    SpotColor,
    SelectionMask,
    /// The key channel of a CMYK image
    Black,
    Cfa,
    Thermal,
    Optional,
    Unknown
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtraChannelInfo {
    pub kind:            ExtraChannelKind,
    pub bits_per_sample: u32
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EncodedColorSpace {
    Rgb,
    Gray,
    Xyb,
    Unknown
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WhitePoint {
    D65,
    E,
    Dci,
    Custom
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TransferFunction {
    Linear,
    Srgb,
    Bt709,
    Pq,
    Hlg,
    Dci,
    Gamma(f32),
    Unknown
}

/// A color space described by its parts instead of an ICC profile
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EncodedColor {
    pub color_space: EncodedColorSpace,
    pub white_point: WhitePoint,
    pub transfer:    TransferFunction
}

impl EncodedColor {
    /// sRGB, or D65 gray with the sRGB transfer
    pub const fn srgb(gray: bool) -> EncodedColor {
        EncodedColor {
            color_space: if gray {
                EncodedColorSpace::Gray
            } else {
                EncodedColorSpace::Rgb
            },
            white_point: WhitePoint::D65,
            transfer:    TransferFunction::Srgb
        }
    }

    /// Linear sRGB, or linear D65 gray
    pub const fn linear_srgb(gray: bool) -> EncodedColor {
        let mut color = EncodedColor::srgb(gray);
        color.transfer = TransferFunction::Linear;
        color
    }

    /// Whether this is one of the descriptions a preset profile covers,
    /// returns the linearity if so
    pub fn preset_linearity(&self) -> Option<bool> {
        if self.white_point != WhitePoint::D65
            || !matches!(
                self.color_space,
                EncodedColorSpace::Rgb | EncodedColorSpace::Gray
            )
        {
            return None;
        }
        match self.transfer {
            TransferFunction::Linear => Some(true),
            TransferFunction::Srgb => Some(false),
            _ => None
        }
    }
}

/// The color description an encoder is asked to embed
#[derive(Clone, Debug, PartialEq)]
pub enum ColorEncoding {
    Srgb { gray: bool },
    LinearSrgb { gray: bool },
    Icc(Vec<u8>),
    Unknown
}

impl ColorEncoding {
    /// The structured form, `None` for ICC and unknown encodings
    pub const fn as_encoded(&self) -> Option<EncodedColor> {
        match self {
            ColorEncoding::Srgb { gray } => Some(EncodedColor::srgb(*gray)),
            ColorEncoding::LinearSrgb { gray } => Some(EncodedColor::linear_srgb(*gray)),
            _ => None
        }
    }
}

/// A pull style JPEG XL decoder
///
/// `'a` is the lifetime of the input the decoder reads from
pub trait JxlDecoderBackend<'a> {
    /// Hand the backend a runner to spread work over
    fn set_parallel_runner(&mut self, runner: &ParallelRunner) -> Result<(), JxlErrors>;
    /// Forget the runner, called before the runner is dropped
    fn release_parallel_runner(&mut self);

    fn set_input(&mut self, data: &'a [u8]);
    /// Signal that no more input follows
    fn close_input(&mut self);
    fn release_input(&mut self);
    /// Start over from the beginning of the input
    fn rewind(&mut self);
    fn subscribe_events(&mut self, events: Events);
    fn process_input(&mut self) -> DecoderStatus;

    /// Valid after [`DecoderStatus::BasicInfo`]
    fn basic_info(&self) -> Option<BasicInfo>;
    fn extra_channel_info(&self, index: usize) -> Option<ExtraChannelInfo>;

    /// Ask for pixels in this color space, only honored when the image
    /// does not use its original profile
    fn set_preferred_color_profile(&mut self, color: &EncodedColor);
    /// The color space of output pixels if it has a structured description
    fn color_as_encoded_profile(&self) -> Option<EncodedColor>;
    /// The color space of output pixels as ICC bytes
    fn icc_profile(&self) -> Option<Vec<u8>>;

    fn set_image_out_buffer(
        &mut self, format: PixelFormat, buffer: SampleBuffer
    ) -> Result<(), JxlErrors>;
    fn take_image_out_buffer(&mut self) -> Option<SampleBuffer>;

    /// Bytes needed to store extra channel `index` in `format`
    fn extra_channel_buffer_size(&self, format: PixelFormat, index: usize) -> Option<usize>;
    fn set_extra_channel_buffer(
        &mut self, format: PixelFormat, buffer: SampleBuffer, index: usize
    ) -> Result<(), JxlErrors>;
    fn take_extra_channel_buffer(&mut self, index: usize) -> Option<SampleBuffer>;

    /// Whether compressed (`brob`) boxes should be handed out decompressed
    fn set_decompress_boxes(&mut self, decompress: bool);
    /// Type of the box announced by the last [`DecoderStatus::Box`]
    fn box_type(&self, decompressed: bool) -> Result<[u8; 4], JxlErrors>;
    /// Give the backend a buffer to write box contents into,
    /// starting at `offset`
    fn set_box_buffer(&mut self, buffer: Vec<u8>, offset: usize);
    /// Take back the box buffer along with the number of bytes at its end
    /// that were not written to
    fn release_box_buffer(&mut self) -> Option<(Vec<u8>, usize)>;

    /// A description of the last failure
    fn last_error(&self) -> Option<String> {
        None
    }
}

/// A push style JPEG XL encoder
///
/// Configuration calls report failure through `Err`, the adapter turns
/// those into [`JxlErrors::EncodeConfigFailed`]
pub trait JxlEncoderBackend {
    fn set_parallel_runner(&mut self, runner: &ParallelRunner) -> Result<(), JxlErrors>;
    fn release_parallel_runner(&mut self);

    fn use_container(&mut self, container: bool) -> Result<(), JxlErrors>;
    fn set_codestream_level(&mut self, level: u8) -> Result<(), JxlErrors>;
    /// Allow metadata boxes to be added
    fn use_boxes(&mut self) -> Result<(), JxlErrors>;

    fn set_basic_info(&mut self, info: &BasicInfo) -> Result<(), JxlErrors>;
    fn set_icc_profile(&mut self, icc: &[u8]) -> Result<(), JxlErrors>;
    fn set_color_encoding(&mut self, color: &EncodedColor) -> Result<(), JxlErrors>;

    fn set_frame_distance(&mut self, distance: f32) -> Result<(), JxlErrors>;
    fn set_frame_lossless(&mut self, lossless: bool) -> Result<(), JxlErrors>;
    fn set_effort(&mut self, effort: u8) -> Result<(), JxlErrors>;

    fn add_image_frame(&mut self, format: PixelFormat, pixels: &[u8]) -> Result<(), JxlErrors>;
    fn add_box(&mut self, box_type: [u8; 4], contents: &[u8], compress: bool)
        -> Result<(), JxlErrors>;
    /// No more frames or boxes follow
    fn close_input(&mut self);

    /// Write encoded bytes into `output`, returns the status and the
    /// number of bytes written
    fn process_output(&mut self, output: &mut [u8]) -> (EncoderStatus, usize);

    fn last_error(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_recognized() {
        assert_eq!(EncodedColor::srgb(false).preset_linearity(), Some(false));
        assert_eq!(EncodedColor::linear_srgb(true).preset_linearity(), Some(true));

        let mut pq = EncodedColor::srgb(false);
        pq.transfer = TransferFunction::Pq;
        assert_eq!(pq.preset_linearity(), None);

        let mut dci = EncodedColor::linear_srgb(false);
        dci.white_point = WhitePoint::Dci;
        assert_eq!(dci.preset_linearity(), None);
    }

    #[test]
    fn icc_has_no_structured_form() {
        assert!(ColorEncoding::Icc(vec![0; 128]).as_encoded().is_none());
        assert_eq!(
            ColorEncoding::LinearSrgb { gray: true }.as_encoded(),
            Some(EncodedColor::linear_srgb(true))
        );
    }
}
