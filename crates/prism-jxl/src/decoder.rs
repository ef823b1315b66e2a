/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Decoding JPEG XL files into prism images
//!
//! The decoder drives a [`JxlDecoderBackend`] through a fixed sequence of
//! events. Each state of [`DecodeState`] waits for exactly one event, any
//! other event aborts the decode with [`JxlErrors::ProtocolViolation`].
//!
//! ```text
//! Init -> SignatureChecked -> BasicInfoReady -> ColorEncodingResolved
//!      -> AwaitingOutputBuffer -> AwaitingFullImage -> ImageComplete
//!      -> (MetadataBoxScan) -> Done
//! ```
//!
//! Problems with the color profile or metadata are not fatal, they are
//! logged and kept in [`JxlDecoder::warnings`].
use core::mem;

use prism_core::colorspace::ColorSpace;
use prism_core::log::{trace, warn};
use prism_core::options::DecoderOptions;
use prism_image::buffer::{sample_count, PixelBuffer, PixelFormat, SampleBuffer};
use prism_image::errors::ImageErrors;
use prism_image::image::{ColorModel, Image, Layer, Precision};
use prism_image::metadata::ImageMetadata;
use prism_image::profile::ColorProfile;

use crate::backend::{
    BasicInfo, DecoderStatus, EncodedColor, Events, ExtraChannelKind, JxlDecoderBackend
};
use crate::boxes::{grow_box_buffer, trim_exif, BoxScan, MetadataBox};
use crate::errors::JxlErrors;
use crate::format::{decode_channels, decoded_colorspace, select_decode_format, DecodeFormat};
use crate::merge::merge_cmyk;
use crate::runner::ParallelRunner;
use crate::signature::check_signature;

/// Name of the layer decoded pixels end up in
pub const LAYER_NAME: &str = "Background";

/// What the basic info event told us about the image
#[derive(Copy, Clone, Debug)]
pub struct Header {
    pub info:        BasicInfo,
    pub model:       ColorModel,
    /// Index of the extra channel holding the CMYK key
    pub key_channel: Option<usize>
}

/// Pixel storage and color decided at the color encoding event
#[derive(Clone, Debug)]
pub struct ColorSetup {
    pub format:  DecodeFormat,
    pub request: PixelFormat,
    pub profile: Option<ColorProfile>,
    pub linear:  bool
}

/// States of a decode
pub enum DecodeState {
    Init,
    SignatureChecked,
    BasicInfoReady(Header),
    ColorEncodingResolved(Header, ColorSetup),
    AwaitingOutputBuffer(Header, ColorSetup),
    AwaitingFullImage(Header, ColorSetup),
    ImageComplete(Box<DecodedImage>),
    MetadataBoxScan(Box<DecodedImage>),
    Done(Box<DecodedImage>),
    /// A decode failed or already finished
    Failed
}

impl DecodeState {
    pub const fn name(&self) -> &'static str {
        match self {
            DecodeState::Init => "Init",
            DecodeState::SignatureChecked => "SignatureChecked",
            DecodeState::BasicInfoReady(..) => "BasicInfoReady",
            DecodeState::ColorEncodingResolved(..) => "ColorEncodingResolved",
            DecodeState::AwaitingOutputBuffer(..) => "AwaitingOutputBuffer",
            DecodeState::AwaitingFullImage(..) => "AwaitingFullImage",
            DecodeState::ImageComplete(..) => "ImageComplete",
            DecodeState::MetadataBoxScan(..) => "MetadataBoxScan",
            DecodeState::Done(..) => "Done",
            DecodeState::Failed => "Failed"
        }
    }
}

/// A fully decoded image, not yet turned into an [`Image`]
#[derive(Clone, Debug)]
pub struct DecodedImage {
    width:       usize,
    height:      usize,
    color_model: ColorModel,
    has_alpha:   bool,
    precision:   Precision,
    primary:     PixelBuffer,
    /// The key channel of CMYK images
    extra:       Option<PixelBuffer>,
    profile:     Option<ColorProfile>,
    metadata:    ImageMetadata
}

impl DecodedImage {
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub const fn color_model(&self) -> ColorModel {
        self.color_model
    }

    pub const fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub const fn precision(&self) -> Precision {
        self.precision
    }

    pub const fn primary(&self) -> &PixelBuffer {
        &self.primary
    }

    pub const fn extra(&self) -> Option<&PixelBuffer> {
        self.extra.as_ref()
    }

    pub const fn profile(&self) -> Option<&ColorProfile> {
        self.profile.as_ref()
    }

    pub const fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    /// Build a host image out of the decoded pixels
    ///
    /// Gray images get a gray base, everything else an RGB one. The profile
    /// is only attached when its colorant matches the base, a CMYK profile
    /// on a CMYK image becomes the simulation profile instead.
    ///
    /// Pixel buffers are moved into the image, CMYK images are the exception,
    /// their planes are merged into a new four channel buffer.
    pub fn into_image(self) -> Result<Image, ImageErrors> {
        let base = match self.color_model {
            ColorModel::Gray => ColorModel::Gray,
            _ => ColorModel::Rgb
        };
        let mut image = Image::new(self.width, self.height, base, self.precision)?;

        let (colorspace, buffer) = match self.color_model {
            ColorModel::Cmyk => {
                let key = self
                    .extra
                    .ok_or(ImageErrors::GenericStr("CMYK image without a key channel"))?;
                (ColorSpace::CMYK, merge_cmyk(&self.primary, &key)?)
            }
            model => (decoded_colorspace(model, self.has_alpha), self.primary)
        };

        match self.profile {
            Some(profile) if self.color_model == ColorModel::Cmyk && profile.is_cmyk() => {
                image.set_simulation_profile(Some(profile));
            }
            Some(profile) if profile.colorant() == Some(base) => {
                image.set_profile(Some(profile));
            }
            Some(profile) => {
                trace!(
                    "Not attaching profile {} to a {:?} image",
                    profile.name(),
                    base
                );
            }
            None => ()
        }

        image.insert_layer(Layer::new(LAYER_NAME, colorspace, buffer)?, 0)?;
        *image.metadata_mut() = self.metadata;

        Ok(image)
    }
}

/// A JPEG XL decoder
///
/// Fields are dropped in declaration order, the runner goes before the
/// backend it was handed to.
pub struct JxlDecoder<'a, B: JxlDecoderBackend<'a>> {
    runner:   Option<ParallelRunner>,
    backend:  B,
    data:     &'a [u8],
    options:  DecoderOptions,
    state:    DecodeState,
    info:     Option<BasicInfo>,
    warnings: Vec<JxlErrors>
}

impl<'a, B: JxlDecoderBackend<'a>> JxlDecoder<'a, B> {
    /// Create a decoder reading `data` through `backend`
    pub fn new_with_backend(data: &'a [u8], options: DecoderOptions, backend: B) -> Self {
        JxlDecoder {
            runner: None,
            backend,
            data,
            options,
            state: DecodeState::Init,
            info: None,
            warnings: vec![]
        }
    }

    /// Non fatal problems met so far
    pub fn warnings(&self) -> &[JxlErrors] {
        &self.warnings
    }

    /// Image dimensions, `None` before headers are decoded
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.info.map(|x| (x.width, x.height))
    }

    pub const fn basic_info(&self) -> Option<BasicInfo> {
        self.info
    }

    /// Name of the state the decoder is in
    pub const fn state(&self) -> &'static str {
        self.state.name()
    }

    /// Decode up to the basic info event
    pub fn decode_headers(&mut self) -> Result<BasicInfo, JxlErrors> {
        while matches!(self.state, DecodeState::Init | DecodeState::SignatureChecked) {
            self.advance()?;
        }
        self.info
            .ok_or(JxlErrors::Backend("Decoder cannot be reused".to_string()))
    }

    /// Decode the image
    pub fn decode(&mut self) -> Result<DecodedImage, JxlErrors> {
        loop {
            match mem::replace(&mut self.state, DecodeState::Failed) {
                DecodeState::Done(image) => {
                    self.release_runner();
                    return Ok(*image);
                }
                state => {
                    self.state = state;
                    self.advance()?;
                }
            }
        }
    }

    /// Decode the image into a host image
    pub fn decode_image(&mut self) -> Result<Image, JxlErrors> {
        Ok(self.decode()?.into_image()?)
    }

    fn advance(&mut self) -> Result<(), JxlErrors> {
        let state = mem::replace(&mut self.state, DecodeState::Failed);
        if let DecodeState::Failed = state {
            return Err(JxlErrors::Backend(
                "Decoder cannot be reused after it finished or failed".to_string()
            ));
        }
        trace!("Decoder state: {}", state.name());

        match self.step(state) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err(err) => {
                self.release_runner();
                Err(err)
            }
        }
    }

    fn step(&mut self, state: DecodeState) -> Result<DecodeState, JxlErrors> {
        match state {
            DecodeState::Init => {
                let signature = check_signature(self.data).ok_or(JxlErrors::FormatMismatch)?;
                trace!("JPEG XL signature: {signature:?}");
                Ok(DecodeState::SignatureChecked)
            }
            DecodeState::SignatureChecked => self.read_basic_info().map(DecodeState::BasicInfoReady),
            DecodeState::BasicInfoReady(header) => {
                let setup = self.resolve_color(&header)?;
                Ok(DecodeState::ColorEncodingResolved(header, setup))
            }
            DecodeState::ColorEncodingResolved(header, setup) => {
                self.expect(&[DecoderStatus::NeedImageOutBuffer])?;
                Ok(DecodeState::AwaitingOutputBuffer(header, setup))
            }
            DecodeState::AwaitingOutputBuffer(header, setup) => {
                self.hand_out_buffers(&header, &setup)?;
                Ok(DecodeState::AwaitingFullImage(header, setup))
            }
            DecodeState::AwaitingFullImage(header, setup) => self
                .collect_image(&header, setup)
                .map(|image| DecodeState::ImageComplete(Box::new(image))),
            DecodeState::ImageComplete(image) => {
                let container = self.info.is_some_and(|x| x.have_container);
                if container && self.options.get_read_metadata() {
                    Ok(DecodeState::MetadataBoxScan(image))
                } else {
                    Ok(DecodeState::Done(image))
                }
            }
            DecodeState::MetadataBoxScan(mut image) => {
                image.metadata = self.read_metadata();
                Ok(DecodeState::Done(image))
            }
            DecodeState::Done(image) => Ok(DecodeState::Done(image)),
            DecodeState::Failed => Ok(DecodeState::Failed)
        }
    }

    fn release_runner(&mut self) {
        if let Some(runner) = self.runner.take() {
            self.backend.release_parallel_runner();
            drop(runner);
        }
    }

    fn push_warning(&mut self, err: JxlErrors) {
        warn!("{}", format!("{err:?}").trim_end());
        self.warnings.push(err);
    }

    /// Process input for the first event of the stream
    ///
    /// Only here do a backend error or a short read mean the input itself
    /// is bad, later events must follow the protocol.
    fn expect_first(
        &mut self, expected: &'static [DecoderStatus]
    ) -> Result<DecoderStatus, JxlErrors> {
        match self.backend.process_input() {
            status if expected.contains(&status) => Ok(status),
            DecoderStatus::Error => Err(JxlErrors::Backend(
                self.backend
                    .last_error()
                    .unwrap_or_else(|| "Decoder reported an error".to_string())
            )),
            DecoderStatus::NeedMoreInput => Err(JxlErrors::Truncated),
            observed => Err(JxlErrors::ProtocolViolation { expected, observed })
        }
    }

    /// Process input and check the event is one of `expected`
    fn expect(
        &mut self, expected: &'static [DecoderStatus]
    ) -> Result<DecoderStatus, JxlErrors> {
        let status = self.backend.process_input();

        if expected.contains(&status) {
            return Ok(status);
        }
        if status == DecoderStatus::Error {
            if let Some(message) = self.backend.last_error() {
                warn!("Backend error out of sequence: {message}");
            }
        }
        Err(JxlErrors::ProtocolViolation {
            expected,
            observed: status
        })
    }

    fn read_basic_info(&mut self) -> Result<Header, JxlErrors> {
        let runner = ParallelRunner::new(self.options.get_num_threads());
        self.backend.set_parallel_runner(&runner)?;
        self.runner = Some(runner);

        self.backend.set_input(self.data);
        self.backend.close_input();
        self.backend
            .subscribe_events(Events::BASIC_INFO | Events::COLOR_ENCODING | Events::FULL_IMAGE);

        self.expect_first(&[DecoderStatus::BasicInfo])?;

        let info = self
            .backend
            .basic_info()
            .ok_or(JxlErrors::Backend("Basic info event without basic info".to_string()))?;

        trace!("Image dimensions: ({},{})", info.width, info.height);
        trace!("Bits per sample: {}", info.bits_per_sample);
        trace!("Uses original profile: {}", info.uses_original_profile);

        if info.width == 0 || info.height == 0 {
            return Err(JxlErrors::InvalidDimensions(info.width, info.height));
        }
        if info.width > self.options.get_max_width() {
            return Err(JxlErrors::TooLargeDimensions(
                "width",
                info.width,
                self.options.get_max_width()
            ));
        }
        if info.height > self.options.get_max_height() {
            return Err(JxlErrors::TooLargeDimensions(
                "height",
                info.height,
                self.options.get_max_height()
            ));
        }

        let key_channel = (0..info.num_extra_channels as usize).find(|i| {
            self.backend
                .extra_channel_info(*i)
                .is_some_and(|x| x.kind == ExtraChannelKind::Black)
        });

        let model = if info.num_color_channels == 1 {
            ColorModel::Gray
        } else if key_channel.is_some() {
            ColorModel::Cmyk
        } else {
            ColorModel::Rgb
        };
        trace!("Color model: {model:?}, key channel: {key_channel:?}");

        self.info = Some(info);

        Ok(Header {
            info,
            model,
            key_channel
        })
    }

    fn resolve_color(&mut self, header: &Header) -> Result<ColorSetup, JxlErrors> {
        self.expect(&[DecoderStatus::ColorEncoding])?;

        let info = header.info;
        let gray = header.model == ColorModel::Gray;

        if !info.uses_original_profile {
            self.backend
                .set_preferred_color_profile(&EncodedColor::srgb(gray));
        }

        let format = select_decode_format(info.uses_original_profile, info.bits_per_sample);
        let channels = decode_channels(header.model, info.has_alpha());
        let request = PixelFormat::new(channels, format.bit_type)?;

        let (profile, linear) = self.resolve_profile(header.model);

        trace!(
            "Decoding into {:?} x {channels}, linear: {linear}",
            format.bit_type
        );

        Ok(ColorSetup {
            format,
            request,
            profile,
            linear
        })
    }

    fn resolve_profile(&mut self, model: ColorModel) -> (Option<ColorProfile>, bool) {
        let preset = self
            .backend
            .color_as_encoded_profile()
            .and_then(|x| x.preset_linearity());

        if let Some(linear) = preset {
            let profile = ColorProfile::preset(model, linear);
            trace!("Using preset profile {}", profile.name());
            return (Some(profile), linear);
        }

        let Some(icc) = self.backend.icc_profile() else {
            self.push_warning(JxlErrors::ProfileConstructionFailed(
                "Decoder has no ICC profile for the image".to_string()
            ));
            return (None, false);
        };

        match ColorProfile::from_icc(icc) {
            Ok(profile) => {
                let linear = profile.is_linear();
                (Some(profile), linear)
            }
            Err(err) => {
                self.push_warning(JxlErrors::ProfileConstructionFailed(
                    format!("{err:?}").trim_end().to_string()
                ));
                (None, false)
            }
        }
    }

    fn hand_out_buffers(&mut self, header: &Header, setup: &ColorSetup) -> Result<(), JxlErrors> {
        let (width, height) = (header.info.width, header.info.height);
        let request = setup.request;

        let length = sample_count(width, height, request.num_channels())?;
        let samples = SampleBuffer::try_zeroed(request.bit_type(), length)?;
        self.backend.set_image_out_buffer(request, samples)?;

        if let Some(index) = header.key_channel {
            let format = PixelFormat::new(1, request.bit_type())?;
            let bytes = self
                .backend
                .extra_channel_buffer_size(format, index)
                .ok_or_else(|| {
                    JxlErrors::Backend(format!("No buffer size for extra channel {index}"))
                })?;
            let samples = SampleBuffer::try_zeroed(request.bit_type(), bytes / format.sample_size())?;
            self.backend.set_extra_channel_buffer(format, samples, index)?;
        }
        Ok(())
    }

    fn collect_image(&mut self, header: &Header, setup: ColorSetup) -> Result<DecodedImage, JxlErrors> {
        self.expect(&[DecoderStatus::FullImage])?;

        let (width, height) = (header.info.width, header.info.height);

        let samples = self
            .backend
            .take_image_out_buffer()
            .ok_or(JxlErrors::Backend("Decoder kept the image buffer".to_string()))?;
        let primary = PixelBuffer::from_samples(width, height, setup.request, samples)?;

        let extra = match header.key_channel {
            Some(index) => {
                let samples = self
                    .backend
                    .take_extra_channel_buffer(index)
                    .ok_or(JxlErrors::Backend("Decoder kept the key buffer".to_string()))?;
                let format = PixelFormat::new(1, setup.request.bit_type())?;
                Some(PixelBuffer::from_samples(width, height, format, samples)?)
            }
            None => None
        };

        Ok(DecodedImage {
            width,
            height,
            color_model: header.model,
            has_alpha: header.info.has_alpha(),
            precision: setup.format.precision(setup.linear),
            primary,
            extra,
            profile: setup.profile,
            metadata: ImageMetadata::default()
        })
    }

    /// Rescan the input for Exif and XMP boxes, never fails
    fn read_metadata(&mut self) -> ImageMetadata {
        let mut scan = BoxScan::new(true, true);

        if let Err(err) = self.scan_boxes(&mut scan) {
            self.push_warning(err);
            // the open box, if any, is incomplete
            let _ = self.backend.release_box_buffer();
        }
        let (exif, xmp) = scan.into_payloads();

        let exif = exif.and_then(|exif| {
            let trimmed = trim_exif(exif);
            if trimmed.is_none() {
                self.push_warning(JxlErrors::MetadataIncomplete(
                    "Exif box has no TIFF header"
                ));
            }
            trimmed
        });
        trace!(
            "Metadata found, exif: {}, xmp: {}",
            exif.is_some(),
            xmp.is_some()
        );

        let mut metadata = ImageMetadata::default();
        metadata.set_exif(exif);
        metadata.set_xmp(xmp);
        metadata
    }

    fn finish_box(&mut self, scan: &mut BoxScan) {
        if scan.open_box().is_some() {
            if let Some((buffer, remaining)) = self.backend.release_box_buffer() {
                scan.finish(buffer, remaining);
            }
        }
    }

    fn scan_boxes(&mut self, scan: &mut BoxScan) -> Result<(), JxlErrors> {
        self.backend.release_input();
        self.backend.rewind();
        self.backend.set_input(self.data);
        self.backend.close_input();
        self.backend.subscribe_events(Events::BOX);

        while scan.searching() {
            match self.backend.process_input() {
                DecoderStatus::Success => {
                    self.finish_box(scan);
                    break;
                }
                DecoderStatus::Error => {
                    return Err(JxlErrors::MetadataIncomplete(
                        "Decoder failed while reading boxes"
                    ));
                }
                DecoderStatus::NeedMoreInput => {
                    return Err(JxlErrors::MetadataIncomplete("File ended inside a box"));
                }
                DecoderStatus::Box => {
                    self.backend.set_decompress_boxes(true);
                    self.finish_box(scan);

                    let box_type = self
                        .backend
                        .box_type(true)
                        .map_err(|_| JxlErrors::MetadataIncomplete("Could not read a box type"))?;

                    if let Some(kind) =
                        MetadataBox::from_box_type(box_type).filter(|x| scan.wants(*x))
                    {
                        let buffer = scan.open(kind).map_err(|_| {
                            JxlErrors::MetadataIncomplete("Could not allocate a box buffer")
                        })?;
                        self.backend.set_box_buffer(buffer, 0);
                    }
                }
                DecoderStatus::BoxNeedMoreOutput => {
                    if scan.open_box().is_none() {
                        break;
                    }
                    let (buffer, remaining) = self.backend.release_box_buffer().ok_or(
                        JxlErrors::MetadataIncomplete("Decoder did not return the box buffer")
                    )?;
                    let (buffer, offset) = grow_box_buffer(buffer, remaining).map_err(|_| {
                        JxlErrors::MetadataIncomplete("Could not grow a box buffer")
                    })?;
                    self.backend.set_box_buffer(buffer, offset);
                }
                _ => {
                    return Err(JxlErrors::MetadataIncomplete(
                        "Unexpected event while reading boxes"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<'a, B: JxlDecoderBackend<'a>> Drop for JxlDecoder<'a, B> {
    fn drop(&mut self) {
        self.release_runner();
    }
}

#[cfg(test)]
mod tests {
    use prism_core::bit_depth::BitDepth;
    use prism_core::colorspace::ColorSpace;
    use prism_core::options::DecoderOptions;
    use prism_image::image::{ColorModel, Precision, Trc};

    use super::*;
    use crate::backend::{ExtraChannelInfo, TransferFunction};
    use crate::signature::CONTAINER_SIGNATURE;
    use crate::testing::{new_log, position, CallLog, ScriptedDecoder};

    const CODESTREAM: [u8; 4] = [0xFF, 0x0A, 0, 0];

    fn rgb_info(width: usize, height: usize) -> BasicInfo {
        BasicInfo {
            width,
            height,
            bits_per_sample: 8,
            num_color_channels: 3,
            uses_original_profile: true,
            ..Default::default()
        }
    }

    fn new_decoder<'a>(
        data: &'a [u8], backend: ScriptedDecoder
    ) -> JxlDecoder<'a, ScriptedDecoder> {
        JxlDecoder::new_with_backend(data, DecoderOptions::default(), backend)
    }

    fn srgb_backend(log: &CallLog, info: BasicInfo) -> ScriptedDecoder {
        let mut backend = ScriptedDecoder::new(log, info, &ScriptedDecoder::happy_path());
        backend.encoded = Some(EncodedColor::srgb(info.num_color_channels == 1));
        backend
    }

    #[test]
    fn decode_rgb8() {
        let log = new_log();
        let backend = srgb_backend(&log, rgb_info(3, 2));
        let mut decoder = new_decoder(&CODESTREAM, backend);

        let decoded = decoder.decode().unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.precision(), Precision::U8_NON_LINEAR);
        assert_eq!(decoded.primary().format().num_channels(), 3);
        assert_eq!(decoded.primary().samples().as_u8().unwrap()[5], 5);
        assert!(decoder.warnings().is_empty());

        let image = decoded.into_image().unwrap();
        assert_eq!(image.base(), ColorModel::Rgb);
        assert_eq!(image.profile(), Some(&ColorProfile::Srgb));
        let layer = image.layer(0).unwrap();
        assert_eq!(layer.name(), LAYER_NAME);
        assert_eq!(layer.colorspace(), ColorSpace::RGB);
    }

    #[test]
    fn runner_is_released_before_backend_drop() {
        let log = new_log();
        {
            let backend = srgb_backend(&log, rgb_info(2, 2));
            let mut decoder = new_decoder(&CODESTREAM, backend);
            decoder.decode().unwrap();
        }
        let release = position(&log, "release_parallel_runner").unwrap();
        let drop = position(&log, "drop").unwrap();
        assert!(position(&log, "set_parallel_runner").unwrap() < release);
        assert!(release < drop);
        assert_eq!(
            log.borrow()
                .iter()
                .filter(|x| **x == "release_parallel_runner")
                .count(),
            1
        );
    }

    #[test]
    fn runner_is_released_on_failure() {
        let log = new_log();
        {
            let backend = ScriptedDecoder::new(
                &log,
                rgb_info(2, 2),
                &[DecoderStatus::BasicInfo, DecoderStatus::FullImage]
            );
            let mut decoder = new_decoder(&CODESTREAM, backend);
            assert!(decoder.decode().is_err());
        }
        let release = position(&log, "release_parallel_runner").unwrap();
        assert!(release < position(&log, "drop").unwrap());
    }

    #[test]
    fn rejects_bad_signature_before_touching_backend() {
        let log = new_log();
        let backend = srgb_backend(&log, rgb_info(2, 2));
        let mut decoder = new_decoder(&[0x89, b'P', b'N', b'G'], backend);
        assert!(matches!(decoder.decode(), Err(JxlErrors::FormatMismatch)));
        assert!(position(&log, "set_parallel_runner").is_none());

        let backend = srgb_backend(&log, rgb_info(2, 2));
        let mut decoder = JxlDecoder::new_with_backend(&[], DecoderOptions::default(), backend);
        assert!(matches!(decoder.decode(), Err(JxlErrors::FormatMismatch)));
    }

    #[test]
    fn events_out_of_order_are_protocol_violations() {
        let log = new_log();
        let backend = ScriptedDecoder::new(
            &log,
            rgb_info(2, 2),
            &[DecoderStatus::BasicInfo, DecoderStatus::FullImage]
        );
        let mut decoder = new_decoder(&CODESTREAM, backend);
        match decoder.decode() {
            Err(JxlErrors::ProtocolViolation { expected, observed }) => {
                assert_eq!(expected, &[DecoderStatus::ColorEncoding]);
                assert_eq!(observed, DecoderStatus::FullImage);
            }
            _ => panic!("expected a protocol violation")
        }
        // a failed decoder stays failed
        assert!(decoder.decode().is_err());
        assert_eq!(decoder.state(), "Failed");
    }

    #[test]
    fn truncation_and_backend_errors() {
        let log = new_log();
        let backend = ScriptedDecoder::new(&log, rgb_info(2, 2), &[DecoderStatus::NeedMoreInput]);
        assert!(matches!(
            new_decoder(&CODESTREAM, backend).decode(),
            Err(JxlErrors::Truncated)
        ));

        let backend = ScriptedDecoder::new(&log, rgb_info(2, 2), &[DecoderStatus::Error]);
        match new_decoder(&CODESTREAM, backend).decode() {
            Err(JxlErrors::Backend(msg)) => assert_eq!(msg, "scripted failure"),
            _ => panic!("expected a backend error")
        }
    }

    #[test]
    fn late_short_reads_and_errors_are_protocol_violations() {
        for late in [DecoderStatus::NeedMoreInput, DecoderStatus::Error] {
            let log = new_log();
            let mut backend = ScriptedDecoder::new(
                &log,
                rgb_info(2, 2),
                &[
                    DecoderStatus::BasicInfo,
                    DecoderStatus::ColorEncoding,
                    DecoderStatus::NeedImageOutBuffer,
                    late
                ]
            );
            backend.encoded = Some(EncodedColor::srgb(false));

            match new_decoder(&CODESTREAM, backend).decode() {
                Err(JxlErrors::ProtocolViolation { expected, observed }) => {
                    assert_eq!(expected, &[DecoderStatus::FullImage]);
                    assert_eq!(observed, late);
                }
                other => panic!("expected a protocol violation, got {other:?}")
            }
            assert!(
                position(&log, "release_parallel_runner").unwrap()
                    < position(&log, "drop").unwrap()
            );
        }
    }

    #[test]
    fn zero_and_oversized_dimensions() {
        let log = new_log();
        let backend = srgb_backend(&log, rgb_info(0, 5));
        assert!(matches!(
            new_decoder(&CODESTREAM, backend).decode(),
            Err(JxlErrors::InvalidDimensions(0, 5))
        ));

        let backend = srgb_backend(&log, rgb_info(100, 5));
        let options = DecoderOptions::default().set_max_width(64);
        let mut decoder = JxlDecoder::new_with_backend(&CODESTREAM, options, backend);
        assert!(matches!(
            decoder.decode(),
            Err(JxlErrors::TooLargeDimensions("width", 100, 64))
        ));
    }

    #[test]
    fn headers_can_be_read_alone() {
        let log = new_log();
        let backend = srgb_backend(&log, rgb_info(7, 9));
        let mut decoder = new_decoder(&CODESTREAM, backend);
        assert!(decoder.dimensions().is_none());
        let info = decoder.decode_headers().unwrap();
        assert_eq!((info.width, info.height), (7, 9));
        assert_eq!(decoder.dimensions(), Some((7, 9)));
        // carrying on from the headers
        assert!(decoder.decode().is_ok());
    }

    #[test]
    fn xyb_images_decode_to_float_and_ask_for_srgb() {
        let log = new_log();
        let mut info = rgb_info(2, 2);
        info.uses_original_profile = false;
        info.alpha_bits = 8;
        info.num_extra_channels = 1;

        let backend = srgb_backend(&log, info);
        let mut decoder = new_decoder(&CODESTREAM, backend);
        let decoded = decoder.decode().unwrap();
        assert_eq!(decoded.precision(), Precision::FLOAT_NON_LINEAR);
        assert_eq!(decoded.primary().format().num_channels(), 4);
        assert!(position(&log, "set_preferred_color_profile").is_some());

        let image = decoded.into_image().unwrap();
        assert_eq!(image.layer(0).unwrap().colorspace(), ColorSpace::RGBA);
    }

    #[test]
    fn linear_gray16() {
        let log = new_log();
        let info = BasicInfo {
            width: 2,
            height: 2,
            bits_per_sample: 12,
            num_color_channels: 1,
            uses_original_profile: true,
            ..Default::default()
        };
        let mut backend = ScriptedDecoder::new(&log, info, &ScriptedDecoder::happy_path());
        backend.encoded = Some(EncodedColor::linear_srgb(true));

        let decoded = new_decoder(&CODESTREAM, backend).decode().unwrap();
        assert_eq!(decoded.precision(), Precision::U16_LINEAR);
        assert_eq!(decoded.precision().trc(), Trc::Linear);

        let image = decoded.into_image().unwrap();
        assert_eq!(image.base(), ColorModel::Gray);
        assert_eq!(image.precision().depth(), BitDepth::Sixteen);
        assert_eq!(image.profile(), Some(&ColorProfile::GrayD65Linear));
        assert_eq!(image.layer(0).unwrap().colorspace(), ColorSpace::Luma);
    }

    #[test]
    fn missing_or_broken_profile_is_not_fatal() {
        let log = new_log();
        // no structured description and no ICC profile
        let backend = ScriptedDecoder::new(&log, rgb_info(2, 2), &ScriptedDecoder::happy_path());
        let mut decoder = new_decoder(&CODESTREAM, backend);
        let image = decoder.decode_image().unwrap();
        assert!(image.profile().is_none());
        assert_eq!(decoder.warnings().len(), 1);
        assert!(matches!(
            decoder.warnings()[0],
            JxlErrors::ProfileConstructionFailed(_)
        ));

        // PQ is not a preset, garbage ICC is offered instead
        let mut backend =
            ScriptedDecoder::new(&log, rgb_info(2, 2), &ScriptedDecoder::happy_path());
        let mut pq = EncodedColor::srgb(false);
        pq.transfer = TransferFunction::Pq;
        backend.encoded = Some(pq);
        backend.icc = Some(vec![1, 2, 3]);
        let mut decoder = new_decoder(&CODESTREAM, backend);
        assert!(decoder.decode().unwrap().profile().is_none());
        assert!(decoder.warnings()[0].is_recoverable());
    }

    #[test]
    fn cmyk_key_is_merged() {
        let log = new_log();
        let backend = cmyk_backend(&log);
        let mut decoder = new_decoder(&CODESTREAM, backend);
        let decoded = decoder.decode().unwrap();
        assert_eq!(decoded.color_model(), ColorModel::Cmyk);
        assert_eq!(decoded.primary().format().num_channels(), 4);
        assert!(position(&log, "set_extra_channel_buffer").is_some());

        let image = decoded.into_image().unwrap();
        assert_eq!(image.base(), ColorModel::Rgb);
        let layer = image.layer(0).unwrap();
        assert_eq!(layer.colorspace(), ColorSpace::CMYK);
        // primary sample i holds i, key samples hold 200
        assert_eq!(
            layer.buffer().samples().as_u8().unwrap(),
            &[0, 1, 2, 200, 4, 5, 6, 200, 8, 9, 10, 200, 12, 13, 14, 200]
        );
    }

    fn cmyk_backend(log: &CallLog) -> ScriptedDecoder {
        let info = BasicInfo {
            width: 2,
            height: 2,
            bits_per_sample: 8,
            num_color_channels: 3,
            num_extra_channels: 2,
            uses_original_profile: true,
            ..Default::default()
        };
        let mut backend = srgb_backend(log, info);
        backend.extra = vec![
            ExtraChannelInfo {
                kind:            ExtraChannelKind::SpotColor,
                bits_per_sample: 8
            },
            ExtraChannelInfo {
                kind:            ExtraChannelKind::Black,
                bits_per_sample: 8
            }
        ];
        backend
    }

    #[test]
    fn key_buffer_oom_is_fatal_and_tears_down() {
        let log = new_log();
        {
            let mut backend = cmyk_backend(&log);
            backend.key_size = Some(usize::MAX / 4);

            let mut decoder = new_decoder(&CODESTREAM, backend);
            assert!(matches!(decoder.decode(), Err(JxlErrors::OutOfMemory(_))));
            assert_eq!(decoder.state(), "Failed");
            assert!(position(&log, "set_extra_channel_buffer").is_none());
        }
        let release = position(&log, "release_parallel_runner").unwrap();
        assert!(release < position(&log, "drop").unwrap());
    }

    fn container_backend(log: &CallLog) -> ScriptedDecoder {
        let mut info = rgb_info(2, 2);
        info.have_container = true;
        srgb_backend(log, info)
    }

    #[test]
    fn metadata_boxes_are_collected() {
        let log = new_log();
        let mut backend = container_backend(&log);

        let mut exif = vec![0, 0, 0, 0];
        exif.extend_from_slice(b"II*\0\x08\0\0\0");
        // larger than two chunks to force the buffer to grow
        let xmp: Vec<u8> = (0..9000).map(|x| (x % 251) as u8).collect();
        backend.boxes = [
            (*b"ftyp", b"jxl ".to_vec()),
            (*b"Exif", exif),
            (*b"jxlc", vec![0xFF, 0x0A]),
            (*b"xml ", xmp.clone())
        ]
        .into_iter()
        .collect();

        let mut decoder = new_decoder(&CONTAINER_SIGNATURE, backend);
        let decoded = decoder.decode().unwrap();
        assert!(decoder.warnings().is_empty(), "{:?}", decoder.warnings());
        assert_eq!(decoded.metadata().exif().unwrap(), b"II*\0\x08\0\0\0");
        assert_eq!(decoded.metadata().xmp().unwrap(), &xmp[..]);

        let rewind = position(&log, "rewind").unwrap();
        assert!(position(&log, "release_input").unwrap() < rewind);
        assert_eq!(
            log.borrow()
                .iter()
                .filter(|x| **x == "set_box_buffer")
                .count(),
            // exif once, xmp once plus two growths
            4
        );
    }

    #[test]
    fn metadata_is_skipped_without_container_or_when_disabled() {
        let log = new_log();
        let backend = srgb_backend(&log, rgb_info(2, 2));
        new_decoder(&CODESTREAM, backend).decode().unwrap();
        assert!(position(&log, "rewind").is_none());

        let backend = container_backend(&log);
        let options = DecoderOptions::default().set_read_metadata(false);
        JxlDecoder::new_with_backend(&CONTAINER_SIGNATURE, options, backend)
            .decode()
            .unwrap();
        assert!(position(&log, "rewind").is_none());
    }

    #[test]
    fn broken_metadata_does_not_fail_the_decode() {
        let log = new_log();
        let mut backend = container_backend(&log);
        backend.boxes = [(*b"Exif", b"\0\0\0\0no header here".to_vec())]
            .into_iter()
            .collect();
        let mut decoder = new_decoder(&CONTAINER_SIGNATURE, backend);
        let decoded = decoder.decode().unwrap();
        assert!(decoded.metadata().exif().is_none());
        assert!(matches!(
            decoder.warnings(),
            [JxlErrors::MetadataIncomplete(_)]
        ));

        let mut backend = container_backend(&log);
        backend.boxes = [(*b"xml ", b"<x:xmpmeta/>".to_vec())].into_iter().collect();
        backend.boxes_end = DecoderStatus::NeedMoreInput;
        let mut decoder = new_decoder(&CONTAINER_SIGNATURE, backend);
        let image = decoder.decode_image().unwrap();
        assert!(image.metadata().is_empty());
        assert!(matches!(
            decoder.warnings(),
            [JxlErrors::MetadataIncomplete(_)]
        ));
    }
}
