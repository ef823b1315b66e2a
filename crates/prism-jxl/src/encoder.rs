/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Encoding prism images into JPEG XL
//!
//! Encoding happens in two steps. [`EncodeRequest::plan`] looks at the image
//! and the options and decides everything up front: the pixel format and the
//! pixels in it, the color description, quality, container and metadata boxes.
//! [`JxlEncoder`] then replays that plan against a [`JxlEncoderBackend`] and
//! drains its output.
use prism_core::bit_depth::BitDepth;
use prism_core::colorspace::ColorSpace;
use prism_core::log::{debug, trace, warn};
use prism_core::options::{EncoderOptions, MAX_DISTANCE, MIN_LOSSY_DISTANCE};
use prism_image::buffer::PixelBuffer;
use prism_image::convert::convert_buffer;
use prism_image::image::{Image, Layer, Trc};

use crate::backend::{BasicInfo, ColorEncoding, EncoderStatus, JxlEncoderBackend};
use crate::errors::JxlErrors;
use crate::format::{encode_format_name, plan_container, ContainerPlan};
use crate::runner::ParallelRunner;

/// Size of the first output buffer, it doubles whenever it fills up
pub const OUTPUT_CHUNK_SIZE: usize = 4096;

/// Frame quality
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Quality {
    Lossless,
    /// Butteraugli distance, never below [`MIN_LOSSY_DISTANCE`]
    Lossy { distance: f32 }
}

/// Everything decided about an encode before the backend is touched
#[derive(Clone, Debug)]
pub struct EncodeRequest {
    /// Pixels already converted to the output sample type and transfer
    pub pixels:      PixelBuffer,
    pub format_name: &'static str,
    pub color:       ColorEncoding,
    pub quality:     Quality,
    pub effort:      u8,
    pub info:        BasicInfo,
    pub container:   ContainerPlan,
    /// Exif as a TIFF stream
    pub exif:        Option<Vec<u8>>,
    pub xmp:         Option<Vec<u8>>
}

const fn structured_color(linear: bool, gray: bool) -> ColorEncoding {
    if linear {
        ColorEncoding::LinearSrgb { gray }
    } else {
        ColorEncoding::Srgb { gray }
    }
}

impl EncodeRequest {
    /// Plan the encode of layer `index` of `image`
    ///
    /// # Errors
    /// - [`JxlErrors::UnsupportedLayout`] for layers that are not gray or RGB
    /// - Image errors if the layer does not exist or its pixels cannot be converted
    pub fn plan(
        image: &Image, index: usize, options: &EncoderOptions
    ) -> Result<EncodeRequest, JxlErrors> {
        let layer = image.layer(index)?;
        let colorspace = layer.colorspace();

        if !matches!(
            colorspace,
            ColorSpace::Luma | ColorSpace::LumaA | ColorSpace::RGB | ColorSpace::RGBA
        ) {
            return Err(JxlErrors::UnsupportedLayout(colorspace));
        }
        let gray = colorspace.is_grayscale();
        let keep_profile = options.get_keep_profile();

        let profile = image.effective_profile();
        let linear = keep_profile && profile.is_linear();

        let depth = options.get_depth();
        let format_name = encode_format_name(colorspace, linear, depth)?;
        let bit_type = depth
            .bit_type()
            .ok_or(JxlErrors::UnsupportedLayout(colorspace))?;

        let pixels = if keep_profile {
            None
        } else {
            srgb_pixels(image, layer)?
        };
        let pixels = match pixels {
            Some(srgb) => convert_buffer(&srgb, colorspace, Trc::NonLinear, bit_type, Trc::NonLinear)?,
            None => convert_buffer(
                layer.buffer(),
                colorspace,
                image.precision().trc(),
                bit_type,
                Trc::from_linear(linear)
            )?
        };

        let color = match profile.icc_bytes() {
            Some(icc) if keep_profile && !gray => ColorEncoding::Icc(icc.to_vec()),
            _ => structured_color(linear, gray)
        };

        let quality = if options.get_lossless() {
            Quality::Lossless
        } else {
            Quality::Lossy {
                distance: options
                    .get_distance()
                    .clamp(MIN_LOSSY_DISTANCE, MAX_DISTANCE)
            }
        };

        let metadata = image.metadata();
        let exif = metadata
            .exif()
            .filter(|_| options.get_save_exif())
            .map(<[u8]>::to_vec);
        let xmp = metadata
            .xmp()
            .filter(|_| options.get_save_xmp())
            .map(<[u8]>::to_vec);

        let bits = depth.bits();
        let alpha_bits = if colorspace.has_alpha() { bits } else { 0 };
        let container = plan_container(
            bits,
            keep_profile,
            alpha_bits,
            exif.is_some() || xmp.is_some()
        );
        let (width, height) = image.dimensions();

        let info = BasicInfo {
            width,
            height,
            bits_per_sample: bits,
            exponent_bits_per_sample: 0,
            num_color_channels: if gray { 1 } else { 3 },
            alpha_bits,
            num_extra_channels: u32::from(colorspace.has_alpha()),
            uses_original_profile: keep_profile,
            have_container: container.container
        };

        debug!("Encoding layer {index} as {format_name}");
        trace!("Color: {color:?}, quality: {quality:?}, container: {container:?}");

        Ok(EncodeRequest {
            pixels,
            format_name,
            color,
            quality,
            effort: options.get_effort(),
            info,
            container,
            exif,
            xmp
        })
    }

    pub const fn depth(&self) -> BitDepth {
        self.pixels.format().bit_type().to_depth()
    }
}

/// Pixels of an RGB layer whose ICC profile is not sRGB, transformed into sRGB
///
/// `None` when no transform is needed
#[cfg(feature = "cms")]
fn srgb_pixels(image: &Image, layer: &Layer) -> Result<Option<PixelBuffer>, JxlErrors> {
    let colorspace = layer.colorspace();
    if colorspace.is_grayscale() {
        return Ok(None);
    }
    let icc = image
        .profile()
        .filter(|x| x.is_rgb() && !x.is_srgb_compatible())
        .and_then(|x| x.icc_bytes());

    match icc {
        Some(icc) => {
            debug!("Transforming layer into sRGB before encoding");
            Ok(Some(prism_image::convert::icc_to_srgb(layer.buffer(), colorspace, icc)?))
        }
        None => Ok(None)
    }
}

#[cfg(not(feature = "cms"))]
fn srgb_pixels(_: &Image, _: &Layer) -> Result<Option<PixelBuffer>, JxlErrors> {
    Ok(None)
}

fn config_failed(stage: &'static str) -> impl Fn(JxlErrors) -> JxlErrors {
    move |err| {
        let reason = format!("{err:?}");
        JxlErrors::EncodeConfigFailed(format!("{stage}: {}", reason.trim_end()))
    }
}

/// Drain the encoded stream out of a backend
///
/// Starts with a [`OUTPUT_CHUNK_SIZE`] buffer and doubles it whenever the
/// backend reports it needs more room, writing resumes where it stopped.
///
/// # Errors
/// - [`JxlErrors::Backend`] if the backend reports an error
/// - [`JxlErrors::EmptyOutput`] if it finished without writing anything
pub fn drain_output<B: JxlEncoderBackend + ?Sized>(backend: &mut B) -> Result<Vec<u8>, JxlErrors> {
    let mut output = Vec::new();
    output
        .try_reserve_exact(OUTPUT_CHUNK_SIZE)
        .map_err(|_| JxlErrors::OutOfMemory(OUTPUT_CHUNK_SIZE))?;
    output.resize(OUTPUT_CHUNK_SIZE, 0);

    let mut written = 0;

    loop {
        let (status, count) = backend.process_output(&mut output[written..]);
        written = written.saturating_add(count).min(output.len());

        match status {
            EncoderStatus::Success => break,
            EncoderStatus::NeedMoreOutput => {
                let new_len = output
                    .len()
                    .checked_mul(2)
                    .ok_or(JxlErrors::OutOfMemory(usize::MAX))?;
                output
                    .try_reserve_exact(new_len - output.len())
                    .map_err(|_| JxlErrors::OutOfMemory(new_len))?;
                output.resize(new_len, 0);
                trace!("Output buffer grown to {new_len} bytes");
            }
            EncoderStatus::Error => {
                return Err(JxlErrors::Backend(
                    backend
                        .last_error()
                        .unwrap_or_else(|| "Encoder failed while writing output".to_string())
                ));
            }
        }
    }
    if written == 0 {
        return Err(JxlErrors::EmptyOutput);
    }
    output.truncate(written);
    Ok(output)
}

/// A JPEG XL encoder
///
/// Each encoder writes a single image, a backend is not reused
pub struct JxlEncoder<B: JxlEncoderBackend> {
    runner:  Option<ParallelRunner>,
    backend: B,
    options: EncoderOptions
}

impl<B: JxlEncoderBackend> JxlEncoder<B> {
    pub fn new_with_backend(options: EncoderOptions, backend: B) -> JxlEncoder<B> {
        JxlEncoder {
            runner: None,
            backend,
            options
        }
    }

    pub const fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Encode the bottom layer of `image`
    pub fn encode(&mut self, image: &Image) -> Result<Vec<u8>, JxlErrors> {
        self.encode_layer(image, 0)
    }

    /// Encode layer `index` of `image`
    pub fn encode_layer(&mut self, image: &Image, index: usize) -> Result<Vec<u8>, JxlErrors> {
        let request = EncodeRequest::plan(image, index, &self.options)?;
        self.encode_request(&request)
    }

    /// Run an already planned encode
    pub fn encode_request(&mut self, request: &EncodeRequest) -> Result<Vec<u8>, JxlErrors> {
        let result = self.run(request);
        self.release_runner();
        result
    }

    fn release_runner(&mut self) {
        if let Some(runner) = self.runner.take() {
            self.backend.release_parallel_runner();
            drop(runner);
        }
    }

    fn run(&mut self, request: &EncodeRequest) -> Result<Vec<u8>, JxlErrors> {
        let runner = ParallelRunner::new(self.options.get_num_threads());
        self.backend
            .set_parallel_runner(&runner)
            .map_err(config_failed("parallel runner"))?;
        self.runner = Some(runner);

        let backend = &mut self.backend;

        if request.container.container {
            backend
                .use_container(true)
                .map_err(config_failed("container"))?;
            if let Some(level) = request.container.codestream_level {
                backend
                    .set_codestream_level(level)
                    .map_err(config_failed("codestream level"))?;
            }
        }
        if request.container.boxes {
            backend.use_boxes().map_err(config_failed("boxes"))?;
        }
        backend
            .set_basic_info(&request.info)
            .map_err(config_failed("basic info"))?;

        match &request.color {
            ColorEncoding::Icc(icc) => backend.set_icc_profile(icc),
            color => match color.as_encoded() {
                Some(encoded) => backend.set_color_encoding(&encoded),
                None => Err(JxlErrors::Backend("Unknown color encoding".to_string()))
            }
        }
        .map_err(config_failed("color encoding"))?;

        match request.quality {
            Quality::Lossless => backend
                .set_frame_distance(0.0)
                .and_then(|()| backend.set_frame_lossless(true)),
            Quality::Lossy { distance } => backend
                .set_frame_distance(distance.max(MIN_LOSSY_DISTANCE))
                .and_then(|()| backend.set_frame_lossless(false))
        }
        .map_err(config_failed("frame settings"))?;

        if let Err(err) = backend.set_effort(request.effort) {
            warn!("Could not set effort {}: {:?}", request.effort, err);
        }

        backend
            .add_image_frame(request.pixels.format(), request.pixels.samples().as_bytes())
            .map_err(config_failed("image frame"))?;

        if let Some(exif) = request.exif.as_ref().filter(|x| x.len() >= 4) {
            // Exif boxes start with the offset to the TIFF header
            let mut payload = vec![0; 4];
            payload.extend_from_slice(exif);
            if let Err(err) = backend.add_box(*b"Exif", &payload, false) {
                warn!("Could not add Exif box: {:?}", err);
            }
        }
        if let Some(xmp) = request.xmp.as_ref().filter(|x| !x.is_empty()) {
            if let Err(err) = backend.add_box(*b"xml ", xmp, false) {
                warn!("Could not add XMP box: {:?}", err);
            }
        }
        backend.close_input();

        let output = drain_output(backend)?;
        debug!("Encoded {} bytes", output.len());
        Ok(output)
    }
}

impl<B: JxlEncoderBackend> Drop for JxlEncoder<B> {
    fn drop(&mut self) {
        self.release_runner();
    }
}

#[cfg(test)]
mod tests {
    use prism_core::bit_depth::{BitDepth, BitType};
    use prism_core::colorspace::ColorSpace;
    use prism_image::buffer::{PixelBuffer, PixelFormat, SampleBuffer};
    use prism_image::image::{ColorModel, Image, Layer, Precision};
    use prism_image::profile::ColorProfile;

    use super::*;
    use crate::backend::EncodedColor;
    use crate::testing::{new_log, position, ScriptedEncoder};

    fn image_with(colorspace: ColorSpace, precision: Precision, samples: SampleBuffer) -> Image {
        let base = if colorspace.is_grayscale() {
            ColorModel::Gray
        } else {
            ColorModel::Rgb
        };
        let format = PixelFormat::for_colorspace(colorspace, samples.bit_type()).unwrap();
        let buffer = PixelBuffer::from_samples(2, 2, format, samples).unwrap();
        let mut image = Image::new(2, 2, base, precision).unwrap();
        image
            .insert_layer(Layer::new("layer", colorspace, buffer).unwrap(), 0)
            .unwrap();
        image
    }

    fn rgb8() -> Image {
        image_with(
            ColorSpace::RGB,
            Precision::U8_NON_LINEAR,
            SampleBuffer::U8((0..12).collect())
        )
    }

    #[test]
    fn plan_defaults_to_srgb_without_container() {
        let request = EncodeRequest::plan(&rgb8(), 0, &EncoderOptions::default()).unwrap();
        assert_eq!(request.format_name, "R'G'B' u8");
        assert_eq!(request.color, ColorEncoding::Srgb { gray: false });
        assert_eq!(request.quality, Quality::Lossy { distance: 1.0 });
        assert_eq!(request.container, ContainerPlan::default());
        assert_eq!(request.info.num_color_channels, 3);
        assert!(!request.info.uses_original_profile);
        assert_eq!(request.pixels.samples().as_u8().unwrap(), &(0..12).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn plan_linear_gray16_keeping_profile() {
        let mut image = image_with(
            ColorSpace::LumaA,
            Precision::FLOAT_LINEAR,
            SampleBuffer::F32(vec![0.0, 1.0, 0.5, 1.0, 1.0, 0.0, 0.25, 1.0])
        );
        image.set_profile(Some(ColorProfile::GrayD65Linear));
        let options = EncoderOptions::default()
            .set_keep_profile(true)
            .set_depth(BitDepth::Sixteen);

        let request = EncodeRequest::plan(&image, 0, &options).unwrap();
        assert_eq!(request.format_name, "YA u16");
        assert_eq!(request.color, ColorEncoding::LinearSrgb { gray: true });
        assert_eq!(request.depth(), BitDepth::Sixteen);
        // 16 bits with the original profile needs level 10 in a container
        assert!(request.container.container);
        assert_eq!(request.container.codestream_level, Some(10));
        assert_eq!(request.info.alpha_bits, 16);
        assert_eq!(request.info.num_extra_channels, 1);
        // linear samples stay linear
        let samples = request.pixels.samples().as_u16().unwrap();
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], u16::MAX);
        assert_eq!(samples[2], 32768);
    }

    #[test]
    fn plan_without_keep_profile_converts_to_srgb_curve() {
        let image = image_with(
            ColorSpace::Luma,
            Precision::FLOAT_LINEAR,
            SampleBuffer::F32(vec![0.0, 1.0, 0.5, 0.25])
        );
        let request = EncodeRequest::plan(&image, 0, &EncoderOptions::default()).unwrap();
        assert_eq!(request.format_name, "Y' u8");
        assert_eq!(request.color, ColorEncoding::Srgb { gray: true });
        let samples = request.pixels.samples().as_u8().unwrap();
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], 255);
        // linear 0.5 is brighter once encoded
        assert!(samples[2] > 180);
    }

    #[test]
    fn plan_rejects_cmyk_layers() {
        let image = image_with(
            ColorSpace::CMYK,
            Precision::U8_NON_LINEAR,
            SampleBuffer::U8(vec![0; 16])
        );
        assert!(matches!(
            EncodeRequest::plan(&image, 0, &EncoderOptions::default()),
            Err(JxlErrors::UnsupportedLayout(ColorSpace::CMYK))
        ));
    }

    #[test]
    fn plan_metadata_triggers_container() {
        let mut image = rgb8();
        image
            .metadata_mut()
            .set_xmp(Some(b"<x:xmpmeta/>".to_vec()));

        let request = EncodeRequest::plan(&image, 0, &EncoderOptions::default()).unwrap();
        assert!(request.container.container && request.container.boxes);
        assert_eq!(request.container.codestream_level, None);

        let options = EncoderOptions::default().set_save_xmp(false);
        let request = EncodeRequest::plan(&image, 0, &options).unwrap();
        assert!(!request.container.container);
        assert!(request.xmp.is_none());
    }

    #[test]
    fn encode_call_order_and_output() {
        let log = new_log();
        let stream: Vec<u8> = (0..100).collect();
        let backend = ScriptedEncoder::new(&log, stream.clone());
        let record = backend.record.clone();

        let mut image = rgb8();
        image
            .metadata_mut()
            .set_exif(Some(b"MM\0*\0\0\0\x08".to_vec()));
        image.metadata_mut().set_xmp(Some(b"<x/>".to_vec()));

        let options = EncoderOptions::default().set_lossless(true);
        let mut encoder = JxlEncoder::new_with_backend(options, backend);
        assert_eq!(encoder.encode(&image).unwrap(), stream);

        let record = record.borrow();
        assert!(record.container && record.boxes_on);
        assert_eq!(record.distance, Some(0.0));
        assert_eq!(record.lossless, Some(true));
        assert_eq!(record.color, Some(EncodedColor::srgb(false)));
        assert_eq!(record.effort, Some(7));
        assert_eq!(record.boxes.len(), 2);
        assert_eq!(&record.boxes[0].0, b"Exif");
        assert_eq!(&record.boxes[0].1[..4], &[0, 0, 0, 0]);
        assert_eq!(&record.boxes[0].1[4..], b"MM\0*\0\0\0\x08");
        assert_eq!(&record.boxes[1].0, b"xml ");

        let order = [
            "set_parallel_runner",
            "use_container",
            "use_boxes",
            "set_basic_info",
            "set_color_encoding",
            "set_frame_distance",
            "set_effort",
            "add_image_frame",
            "add_box",
            "close_input",
            "process_output",
            "release_parallel_runner"
        ];
        let positions: Vec<_> = order
            .iter()
            .map(|x| position(&log, x).unwrap())
            .collect();
        assert!(positions.windows(2).all(|x| x[0] < x[1]), "{:?}", log.borrow());
    }

    #[test]
    fn lossy_distance_is_never_zero() {
        let log = new_log();
        let backend = ScriptedEncoder::new(&log, vec![1]);
        let record = backend.record.clone();
        let options = EncoderOptions::default().set_distance(0.0);
        JxlEncoder::new_with_backend(options, backend)
            .encode(&rgb8())
            .unwrap();
        assert_eq!(record.borrow().distance, Some(MIN_LOSSY_DISTANCE));
        assert_eq!(record.borrow().lossless, Some(false));
    }

    #[test]
    fn tiny_exif_is_not_attached() {
        let log = new_log();
        let backend = ScriptedEncoder::new(&log, vec![1]);
        let record = backend.record.clone();
        let mut image = rgb8();
        image.metadata_mut().set_exif(Some(vec![b'M', b'M']));
        JxlEncoder::new_with_backend(EncoderOptions::default(), backend)
            .encode(&image)
            .unwrap();
        assert!(record.borrow().boxes.is_empty());
        assert!(record.borrow().container);
    }

    #[test]
    fn drain_grows_through_repeated_need_more_output() {
        let log = new_log();
        let stream: Vec<u8> = (0..10_000).map(|x| (x % 256) as u8).collect();
        let mut backend = ScriptedEncoder::new(&log, stream.clone());
        let output = drain_output(&mut backend).unwrap();
        assert_eq!(output.len(), stream.len());
        assert_eq!(output, stream);
        // 4096, then 4096 more in an 8192 buffer, then the rest in 16384
        assert_eq!(
            log.borrow()
                .iter()
                .filter(|x| **x == "process_output")
                .count(),
            3
        );
    }

    #[test]
    fn drain_rejects_empty_output_and_errors() {
        let log = new_log();
        let mut backend = ScriptedEncoder::new(&log, vec![]);
        assert!(matches!(
            drain_output(&mut backend),
            Err(JxlErrors::EmptyOutput)
        ));

        let mut backend = ScriptedEncoder::new(&log, vec![1, 2, 3]);
        backend.fail_output = true;
        assert!(matches!(
            drain_output(&mut backend),
            Err(JxlErrors::Backend(_))
        ));
    }

    #[test]
    fn config_failures_abort_and_tear_down() {
        let log = new_log();
        {
            let mut backend = ScriptedEncoder::new(&log, vec![1]);
            backend.fail_call = Some("set_basic_info");
            let mut encoder = JxlEncoder::new_with_backend(EncoderOptions::default(), backend);
            match encoder.encode(&rgb8()) {
                Err(JxlErrors::EncodeConfigFailed(stage)) => assert!(stage.starts_with("basic info")),
                _ => panic!("expected a configuration failure")
            }
        }
        assert!(position(&log, "add_image_frame").is_none());
        assert!(
            position(&log, "release_parallel_runner").unwrap() < position(&log, "drop").unwrap()
        );
    }

    #[test]
    fn effort_failure_is_only_logged() {
        let log = new_log();
        let mut backend = ScriptedEncoder::new(&log, vec![9]);
        backend.fail_call = Some("set_effort");
        let mut encoder = JxlEncoder::new_with_backend(EncoderOptions::default(), backend);
        assert_eq!(encoder.encode(&rgb8()).unwrap(), [9]);
    }

    #[test]
    fn frame_is_handed_over_in_target_format() {
        let log = new_log();
        let backend = ScriptedEncoder::new(&log, vec![1]);
        let record = backend.record.clone();
        let options = EncoderOptions::default().set_depth(BitDepth::Sixteen);
        JxlEncoder::new_with_backend(options, backend)
            .encode(&rgb8())
            .unwrap();
        let record = record.borrow();
        let (format, bytes) = record.frame.as_ref().unwrap();
        assert_eq!(format.bit_type(), BitType::U16);
        assert_eq!(format.num_channels(), 3);
        assert_eq!(bytes.len(), 2 * 2 * 3 * 2);
    }
}
