/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! A decoder backend on top of [`jxl-oxide`](jxl_oxide)
//!
//! jxl-oxide decodes a whole file in one go, this backend replays the
//! result as the event stream [`JxlDecoder`](crate::decoder::JxlDecoder) expects.
//!
//! jxl-oxide renders into floats described by its rendered ICC profile, so
//! images are always reported as not using their original profile and the
//! preferred profile hint is ignored.
#![cfg(feature = "oxide")]

use std::io::Cursor;

use jxl_oxide::JxlImage;
use prism_core::log::trace;
use prism_image::buffer::{PixelFormat, SampleBuffer};
use prism_image::convert::from_f32_samples;

use crate::backend::{
    BasicInfo, DecoderStatus, EncodedColor, Events, ExtraChannelInfo, ExtraChannelKind,
    JxlDecoderBackend
};
use crate::boxes::BoxReader;
use crate::errors::JxlErrors;
use crate::runner::ParallelRunner;
use crate::signature::{check_signature, JxlSignature};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Stage {
    Start,
    BasicInfo,
    ColorEncoding,
    NeedBuffer,
    FullImage,
    Finished
}

/// Interleaved color channels of each jxl-oxide pixel format, and whether
/// a key plane follows them
fn layout(format: jxl_oxide::PixelFormat) -> Option<(usize, bool, bool)> {
    // (color planes, alpha, key)
    match format {
        jxl_oxide::PixelFormat::Gray => Some((1, false, false)),
        jxl_oxide::PixelFormat::Graya => Some((1, true, false)),
        jxl_oxide::PixelFormat::Rgb => Some((3, false, false)),
        jxl_oxide::PixelFormat::Rgba => Some((3, true, false)),
        jxl_oxide::PixelFormat::Cmyk => Some((3, false, true)),
        jxl_oxide::PixelFormat::Cmyka => None
    }
}

struct OpenBox {
    box_type: [u8; 4],
    start:    usize,
    end:      usize,
    /// Payload bytes handed out so far
    copied:   usize
}

/// Decoder backend powered by jxl-oxide
pub struct OxideDecoder<'a> {
    input:      &'a [u8],
    events:     Events,
    stage:      Stage,
    threads:    usize,
    image:      Option<JxlImage>,
    info:       Option<BasicInfo>,
    key:        bool,
    out:        Option<(PixelFormat, SampleBuffer)>,
    key_out:    Option<(PixelFormat, SampleBuffer)>,
    // box walk
    box_offset: usize,
    open_box:   Option<OpenBox>,
    box_buffer: Option<(Vec<u8>, usize)>,
    error:      Option<String>
}

impl<'a> Default for OxideDecoder<'a> {
    fn default() -> Self {
        OxideDecoder::new()
    }
}

impl<'a> OxideDecoder<'a> {
    pub fn new() -> OxideDecoder<'a> {
        OxideDecoder {
            input:      &[],
            events:     Events::empty(),
            stage:      Stage::Start,
            threads:    1,
            image:      None,
            info:       None,
            key:        false,
            out:        None,
            key_out:    None,
            box_offset: 0,
            open_box:   None,
            box_buffer: None,
            error:      None
        }
    }

    fn fail(&mut self, reason: String) -> DecoderStatus {
        self.error = Some(reason);
        DecoderStatus::Error
    }

    fn parse(&mut self) -> DecoderStatus {
        let builder = JxlImage::builder();
        #[cfg(feature = "threads")]
        let builder = builder.pool(jxl_oxide::JxlThreadPool::rayon(Some(self.threads)));

        let image = match builder.read(Cursor::new(self.input)) {
            Ok(image) => image,
            Err(err) => return self.fail(format!("{err}"))
        };
        let Some((color, alpha, key)) = layout(image.pixel_format()) else {
            return self.fail("CMYK images with alpha are not supported".to_string());
        };
        let container = check_signature(self.input) == Some(JxlSignature::Container);

        self.info = Some(BasicInfo {
            width:                    image.width() as usize,
            height:                   image.height() as usize,
            bits_per_sample:          32,
            exponent_bits_per_sample: 8,
            num_color_channels:       color as u32,
            alpha_bits:               if alpha { 32 } else { 0 },
            num_extra_channels:       u32::from(alpha) + u32::from(key),
            uses_original_profile:    false,
            have_container:           container
        });
        self.key = key;
        self.image = Some(image);
        DecoderStatus::BasicInfo
    }

    /// Render the first frame into the buffers handed out
    fn render(&mut self) -> Result<(), JxlErrors> {
        let image = self
            .image
            .as_ref()
            .ok_or(JxlErrors::Backend("Image not parsed".to_string()))?;
        let info = self
            .info
            .ok_or(JxlErrors::Backend("Image not parsed".to_string()))?;

        let render = image
            .render_frame(0)
            .map_err(|x| JxlErrors::Backend(format!("{x}")))?;
        let planes = render.image_planar();

        let (format, _) = self
            .out
            .as_ref()
            .ok_or(JxlErrors::Backend("No output buffer".to_string()))?;
        let channels = format.num_channels();
        let bit_type = format.bit_type();

        let color = info.num_color_channels as usize;
        let alpha = usize::from(info.has_alpha());
        // planes are color, then key for CMYK, then alpha
        let alpha_plane = color + usize::from(self.key);

        let pixels = info.width * info.height;
        let mut interleaved = vec![0.0_f32; pixels * channels];

        for c in 0..channels.min(color + alpha) {
            let index = if c < color { c } else { alpha_plane };
            let Some(plane) = planes.get(index) else {
                return Err(JxlErrors::Backend(format!("Missing plane {index}")));
            };
            for (out, value) in interleaved
                .chunks_exact_mut(channels)
                .zip(plane.buf())
            {
                out[c] = *value;
            }
        }
        let samples = from_f32_samples(&interleaved, bit_type)?;
        self.out = Some((*format, samples));

        if let Some((key_format, _)) = self.key_out.take() {
            let plane = planes
                .get(color)
                .ok_or(JxlErrors::Backend("Missing key plane".to_string()))?;
            let samples = from_f32_samples(plane.buf(), key_format.bit_type())?;
            self.key_out = Some((key_format, samples));
        }
        trace!("Rendered {} planes", planes.len());
        Ok(())
    }

    fn advance_image(&mut self) -> DecoderStatus {
        loop {
            let (next, event) = match self.stage {
                Stage::Start => {
                    let status = self.parse();
                    if status != DecoderStatus::BasicInfo {
                        return status;
                    }
                    (Stage::BasicInfo, Events::BASIC_INFO)
                }
                Stage::BasicInfo => (Stage::ColorEncoding, Events::COLOR_ENCODING),
                Stage::ColorEncoding => {
                    if !self.events.contains(Events::FULL_IMAGE) {
                        self.stage = Stage::Finished;
                        return DecoderStatus::Success;
                    }
                    self.stage = Stage::NeedBuffer;
                    return DecoderStatus::NeedImageOutBuffer;
                }
                Stage::NeedBuffer => {
                    if self.out.is_none() {
                        return DecoderStatus::NeedImageOutBuffer;
                    }
                    if let Err(err) = self.render() {
                        return self.fail(format!("{err:?}"));
                    }
                    (Stage::FullImage, Events::FULL_IMAGE)
                }
                Stage::FullImage | Stage::Finished => {
                    self.stage = Stage::Finished;
                    return DecoderStatus::Success;
                }
            };
            self.stage = next;
            if self.events.contains(event) {
                return if event == Events::BASIC_INFO {
                    DecoderStatus::BasicInfo
                } else if event == Events::COLOR_ENCODING {
                    DecoderStatus::ColorEncoding
                } else {
                    DecoderStatus::FullImage
                };
            }
        }
    }

    /// Copy as much of the open box as fits into the box buffer
    ///
    /// Returns false when the buffer filled up before the box ended
    fn copy_box(&mut self) -> bool {
        let (Some(open), Some((buffer, offset))) = (self.open_box.as_mut(), self.box_buffer.as_mut())
        else {
            return true;
        };
        let payload = &self.input[open.start + open.copied..open.end];
        let room = buffer.len().saturating_sub(*offset);
        let count = room.min(payload.len());

        buffer[*offset..*offset + count].copy_from_slice(&payload[..count]);
        *offset += count;
        open.copied += count;

        open.start + open.copied == open.end
    }

    fn advance_boxes(&mut self) -> DecoderStatus {
        if !self.copy_box() {
            return DecoderStatus::BoxNeedMoreOutput;
        }
        if self.box_offset >= self.input.len() {
            self.open_box = None;
            return DecoderStatus::Success;
        }
        let rest = &self.input[self.box_offset..];
        let mut reader = BoxReader::new(rest);

        match reader.next() {
            Some(found) => {
                // the payload is the tail of the box
                let end = self.box_offset + reader.position();
                let start = end - found.payload.len();
                trace!("Box {:?} of {} bytes", found.box_type, found.payload.len());

                self.open_box = Some(OpenBox {
                    box_type: found.box_type,
                    start,
                    end,
                    copied: 0
                });
                self.box_offset = end;
                DecoderStatus::Box
            }
            None => {
                self.open_box = None;
                DecoderStatus::NeedMoreInput
            }
        }
    }
}

impl<'a> JxlDecoderBackend<'a> for OxideDecoder<'a> {
    fn set_parallel_runner(&mut self, runner: &ParallelRunner) -> Result<(), JxlErrors> {
        self.threads = runner.num_threads();
        Ok(())
    }

    fn release_parallel_runner(&mut self) {
        self.threads = 1;
    }

    fn set_input(&mut self, data: &'a [u8]) {
        self.input = data;
    }

    fn close_input(&mut self) {}

    fn release_input(&mut self) {
        self.input = &[];
    }

    fn rewind(&mut self) {
        self.stage = Stage::Start;
        self.box_offset = 0;
        self.open_box = None;
        self.box_buffer = None;
    }

    fn subscribe_events(&mut self, events: Events) {
        self.events = events;
    }

    fn process_input(&mut self) -> DecoderStatus {
        if self.events == Events::BOX {
            self.advance_boxes()
        } else {
            self.advance_image()
        }
    }

    fn basic_info(&self) -> Option<BasicInfo> {
        self.info
    }

    fn extra_channel_info(&self, index: usize) -> Option<ExtraChannelInfo> {
        let info = self.info?;
        // extra channels are the key, then alpha
        let kinds = [
            self.key.then_some(ExtraChannelKind::Black),
            info.has_alpha().then_some(ExtraChannelKind::Alpha)
        ];
        let kind = kinds.into_iter().flatten().nth(index)?;
        Some(ExtraChannelInfo {
            kind,
            bits_per_sample: 32
        })
    }

    fn set_preferred_color_profile(&mut self, _: &EncodedColor) {}

    fn color_as_encoded_profile(&self) -> Option<EncodedColor> {
        None
    }

    fn icc_profile(&self) -> Option<Vec<u8>> {
        self.image.as_ref().map(JxlImage::rendered_icc)
    }

    fn set_image_out_buffer(
        &mut self, format: PixelFormat, buffer: SampleBuffer
    ) -> Result<(), JxlErrors> {
        self.out = Some((format, buffer));
        Ok(())
    }

    fn take_image_out_buffer(&mut self) -> Option<SampleBuffer> {
        self.out.take().map(|(_, x)| x)
    }

    fn extra_channel_buffer_size(&self, format: PixelFormat, index: usize) -> Option<usize> {
        let info = self.info?;
        if index >= info.num_extra_channels as usize {
            return None;
        }
        info.width
            .checked_mul(info.height)?
            .checked_mul(format.bytes_per_pixel())
    }

    fn set_extra_channel_buffer(
        &mut self, format: PixelFormat, buffer: SampleBuffer, index: usize
    ) -> Result<(), JxlErrors> {
        match self.extra_channel_info(index).map(|x| x.kind) {
            Some(ExtraChannelKind::Black) => {
                self.key_out = Some((format, buffer));
                Ok(())
            }
            _ => Err(JxlErrors::Backend(format!(
                "Extra channel {index} cannot be written separately"
            )))
        }
    }

    fn take_extra_channel_buffer(&mut self, index: usize) -> Option<SampleBuffer> {
        match self.extra_channel_info(index)?.kind {
            ExtraChannelKind::Black => self.key_out.take().map(|(_, x)| x),
            _ => None
        }
    }

    fn set_decompress_boxes(&mut self, _: bool) {}

    fn box_type(&self, _: bool) -> Result<[u8; 4], JxlErrors> {
        // brob boxes are reported as is, their contents are never handed out
        self.open_box
            .as_ref()
            .map(|x| x.box_type)
            .ok_or(JxlErrors::Backend("No box is open".to_string()))
    }

    fn set_box_buffer(&mut self, buffer: Vec<u8>, offset: usize) {
        self.box_buffer = Some((buffer, offset));
    }

    fn release_box_buffer(&mut self) -> Option<(Vec<u8>, usize)> {
        self.box_buffer.take().map(|(buffer, offset)| {
            let remaining = buffer.len() - offset.min(buffer.len());
            (buffer, remaining)
        })
    }

    fn last_error(&self) -> Option<String> {
        self.error.clone()
    }
}
