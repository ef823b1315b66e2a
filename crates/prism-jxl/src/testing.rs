/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Scripted backends for exercising the adapter without real files
//!
//! The decoder replays a programmed list of statuses and emulates the box
//! protocol over a list of boxes, the encoder records its configuration and
//! hands out a fixed byte stream. Both append every call to a shared log so
//! tests can assert ordering.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use prism_image::buffer::{PixelFormat, SampleBuffer};

use crate::backend::{
    BasicInfo, DecoderStatus, EncodedColor, EncoderStatus, Events, ExtraChannelInfo,
    JxlDecoderBackend, JxlEncoderBackend
};
use crate::errors::JxlErrors;
use crate::runner::ParallelRunner;

pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(vec![]))
}

/// Position of the first occurrence of `call` in the log
pub fn position(log: &CallLog, call: &str) -> Option<usize> {
    log.borrow().iter().position(|x| *x == call)
}

pub struct ScriptedDecoder {
    log:            CallLog,
    script:         VecDeque<DecoderStatus>,
    pub info:       BasicInfo,
    pub extra:      Vec<ExtraChannelInfo>,
    pub encoded:    Option<EncodedColor>,
    pub icc:        Option<Vec<u8>>,
    pub preferred:  Option<EncodedColor>,
    /// Boxes handed out after subscribing to box events
    pub boxes:      VecDeque<([u8; 4], Vec<u8>)>,
    /// Status reported once all boxes are handed out
    pub boxes_end:  DecoderStatus,
    /// Key channel buffer size in samples, defaults to width * height
    pub key_size:   Option<usize>,
    runner_threads: Option<usize>,
    box_mode:       bool,
    image:          Option<SampleBuffer>,
    key:            Option<(usize, SampleBuffer)>,
    current_box:    Option<([u8; 4], Vec<u8>, usize)>,
    box_buffer:     Option<(Vec<u8>, usize)>
}

impl ScriptedDecoder {
    pub fn new(log: &CallLog, info: BasicInfo, script: &[DecoderStatus]) -> ScriptedDecoder {
        ScriptedDecoder {
            log: log.clone(),
            script: script.iter().copied().collect(),
            info,
            extra: vec![],
            encoded: None,
            icc: None,
            preferred: None,
            boxes: VecDeque::new(),
            boxes_end: DecoderStatus::Success,
            key_size: None,
            runner_threads: None,
            box_mode: false,
            image: None,
            key: None,
            current_box: None,
            box_buffer: None
        }
    }

    /// The usual event order for a full decode
    pub fn happy_path() -> [DecoderStatus; 5] {
        [
            DecoderStatus::BasicInfo,
            DecoderStatus::ColorEncoding,
            DecoderStatus::NeedImageOutBuffer,
            DecoderStatus::FullImage,
            DecoderStatus::Success
        ]
    }

    fn call(&self, name: &'static str) {
        self.log.borrow_mut().push(name);
    }

    // sample i of the image holds i, the key holds 200
    fn fill_buffers(&mut self) {
        match &mut self.image {
            Some(SampleBuffer::U8(v)) => v.iter_mut().enumerate().for_each(|(i, x)| *x = i as u8),
            Some(SampleBuffer::U16(v)) => v.iter_mut().enumerate().for_each(|(i, x)| *x = i as u16),
            Some(SampleBuffer::F32(v)) => v.iter_mut().enumerate().for_each(|(i, x)| *x = i as f32),
            None => ()
        }
        match &mut self.key {
            Some((_, SampleBuffer::U8(v))) => v.fill(200),
            Some((_, SampleBuffer::U16(v))) => v.fill(200),
            Some((_, SampleBuffer::F32(v))) => v.fill(200.0),
            None => ()
        }
    }

    fn process_box(&mut self) -> DecoderStatus {
        if let Some((_, contents, consumed)) = &mut self.current_box {
            if let Some((buffer, written)) = &mut self.box_buffer {
                let space = buffer.len() - *written;
                let count = space.min(contents.len() - *consumed);
                buffer[*written..*written + count]
                    .copy_from_slice(&contents[*consumed..*consumed + count]);
                *written += count;
                *consumed += count;
                if *consumed < contents.len() {
                    return DecoderStatus::BoxNeedMoreOutput;
                }
            }
        }
        match self.boxes.pop_front() {
            Some((box_type, contents)) => {
                self.current_box = Some((box_type, contents, 0));
                DecoderStatus::Box
            }
            None => {
                self.current_box = None;
                self.boxes_end
            }
        }
    }
}

impl Drop for ScriptedDecoder {
    fn drop(&mut self) {
        self.call("drop");
    }
}

impl<'a> JxlDecoderBackend<'a> for ScriptedDecoder {
    fn set_parallel_runner(&mut self, runner: &ParallelRunner) -> Result<(), JxlErrors> {
        self.call("set_parallel_runner");
        self.runner_threads = Some(runner.num_threads());
        Ok(())
    }

    fn release_parallel_runner(&mut self) {
        self.call("release_parallel_runner");
        self.runner_threads = None;
    }

    fn set_input(&mut self, _: &'a [u8]) {
        self.call("set_input");
    }

    fn close_input(&mut self) {
        self.call("close_input");
    }

    fn release_input(&mut self) {
        self.call("release_input");
    }

    fn rewind(&mut self) {
        self.call("rewind");
    }

    fn subscribe_events(&mut self, events: Events) {
        self.call("subscribe_events");
        self.box_mode = events.contains(Events::BOX);
    }

    fn process_input(&mut self) -> DecoderStatus {
        self.call("process_input");
        if self.box_mode {
            return self.process_box();
        }
        let status = self.script.pop_front().unwrap_or(DecoderStatus::Error);
        if status == DecoderStatus::FullImage {
            self.fill_buffers();
        }
        status
    }

    fn basic_info(&self) -> Option<BasicInfo> {
        Some(self.info)
    }

    fn extra_channel_info(&self, index: usize) -> Option<ExtraChannelInfo> {
        self.extra.get(index).copied()
    }

    fn set_preferred_color_profile(&mut self, color: &EncodedColor) {
        self.call("set_preferred_color_profile");
        self.preferred = Some(*color);
    }

    fn color_as_encoded_profile(&self) -> Option<EncodedColor> {
        self.encoded
    }

    fn icc_profile(&self) -> Option<Vec<u8>> {
        self.call("icc_profile");
        self.icc.clone()
    }

    fn set_image_out_buffer(
        &mut self, _: PixelFormat, buffer: SampleBuffer
    ) -> Result<(), JxlErrors> {
        self.call("set_image_out_buffer");
        self.image = Some(buffer);
        Ok(())
    }

    fn take_image_out_buffer(&mut self) -> Option<SampleBuffer> {
        self.image.take()
    }

    fn extra_channel_buffer_size(&self, format: PixelFormat, _: usize) -> Option<usize> {
        let samples = self
            .key_size
            .unwrap_or(self.info.width * self.info.height);
        Some(samples * format.sample_size())
    }

    fn set_extra_channel_buffer(
        &mut self, _: PixelFormat, buffer: SampleBuffer, index: usize
    ) -> Result<(), JxlErrors> {
        self.call("set_extra_channel_buffer");
        self.key = Some((index, buffer));
        Ok(())
    }

    fn take_extra_channel_buffer(&mut self, index: usize) -> Option<SampleBuffer> {
        match self.key.take() {
            Some((i, buffer)) if i == index => Some(buffer),
            other => {
                self.key = other;
                None
            }
        }
    }

    fn set_decompress_boxes(&mut self, _: bool) {}

    fn box_type(&self, _: bool) -> Result<[u8; 4], JxlErrors> {
        self.current_box
            .as_ref()
            .map(|(box_type, _, _)| *box_type)
            .ok_or(JxlErrors::Backend("no current box".to_string()))
    }

    fn set_box_buffer(&mut self, buffer: Vec<u8>, offset: usize) {
        self.call("set_box_buffer");
        self.box_buffer = Some((buffer, offset));
    }

    fn release_box_buffer(&mut self) -> Option<(Vec<u8>, usize)> {
        self.call("release_box_buffer");
        self.box_buffer
            .take()
            .map(|(buffer, written)| {
                let remaining = buffer.len() - written;
                (buffer, remaining)
            })
    }

    fn last_error(&self) -> Option<String> {
        Some("scripted failure".to_string())
    }
}

/// Everything the adapter told a [`ScriptedEncoder`]
#[derive(Debug, Default)]
pub struct EncoderRecord {
    pub container: bool,
    pub level:     Option<u8>,
    pub boxes_on:  bool,
    pub info:      Option<BasicInfo>,
    pub icc:       Option<Vec<u8>>,
    pub color:     Option<EncodedColor>,
    pub distance:  Option<f32>,
    pub lossless:  Option<bool>,
    pub effort:    Option<u8>,
    pub frame:     Option<(PixelFormat, Vec<u8>)>,
    pub boxes:     Vec<([u8; 4], Vec<u8>)>
}

pub struct ScriptedEncoder {
    log:             CallLog,
    pub record:      Rc<RefCell<EncoderRecord>>,
    /// Configuration call that fails
    pub fail_call:   Option<&'static str>,
    /// Report an error instead of output
    pub fail_output: bool,
    output:          Vec<u8>,
    position:        usize
}

impl ScriptedEncoder {
    pub fn new(log: &CallLog, output: Vec<u8>) -> ScriptedEncoder {
        ScriptedEncoder {
            log: log.clone(),
            record: Rc::new(RefCell::new(EncoderRecord::default())),
            fail_call: None,
            fail_output: false,
            output,
            position: 0
        }
    }

    fn call(&self, name: &'static str) -> Result<(), JxlErrors> {
        self.log.borrow_mut().push(name);
        if self.fail_call == Some(name) {
            return Err(JxlErrors::Backend(format!("{name} refused")));
        }
        Ok(())
    }
}

impl Drop for ScriptedEncoder {
    fn drop(&mut self) {
        self.log.borrow_mut().push("drop");
    }
}

impl JxlEncoderBackend for ScriptedEncoder {
    fn set_parallel_runner(&mut self, _: &ParallelRunner) -> Result<(), JxlErrors> {
        self.call("set_parallel_runner")
    }

    fn release_parallel_runner(&mut self) {
        self.log.borrow_mut().push("release_parallel_runner");
    }

    fn use_container(&mut self, container: bool) -> Result<(), JxlErrors> {
        self.call("use_container")?;
        self.record.borrow_mut().container = container;
        Ok(())
    }

    fn set_codestream_level(&mut self, level: u8) -> Result<(), JxlErrors> {
        self.call("set_codestream_level")?;
        self.record.borrow_mut().level = Some(level);
        Ok(())
    }

    fn use_boxes(&mut self) -> Result<(), JxlErrors> {
        self.call("use_boxes")?;
        self.record.borrow_mut().boxes_on = true;
        Ok(())
    }

    fn set_basic_info(&mut self, info: &BasicInfo) -> Result<(), JxlErrors> {
        self.call("set_basic_info")?;
        self.record.borrow_mut().info = Some(*info);
        Ok(())
    }

    fn set_icc_profile(&mut self, icc: &[u8]) -> Result<(), JxlErrors> {
        self.call("set_icc_profile")?;
        self.record.borrow_mut().icc = Some(icc.to_vec());
        Ok(())
    }

    fn set_color_encoding(&mut self, color: &EncodedColor) -> Result<(), JxlErrors> {
        self.call("set_color_encoding")?;
        self.record.borrow_mut().color = Some(*color);
        Ok(())
    }

    fn set_frame_distance(&mut self, distance: f32) -> Result<(), JxlErrors> {
        self.call("set_frame_distance")?;
        self.record.borrow_mut().distance = Some(distance);
        Ok(())
    }

    fn set_frame_lossless(&mut self, lossless: bool) -> Result<(), JxlErrors> {
        self.call("set_frame_lossless")?;
        self.record.borrow_mut().lossless = Some(lossless);
        Ok(())
    }

    fn set_effort(&mut self, effort: u8) -> Result<(), JxlErrors> {
        self.call("set_effort")?;
        self.record.borrow_mut().effort = Some(effort);
        Ok(())
    }

    fn add_image_frame(&mut self, format: PixelFormat, pixels: &[u8]) -> Result<(), JxlErrors> {
        self.call("add_image_frame")?;
        self.record.borrow_mut().frame = Some((format, pixels.to_vec()));
        Ok(())
    }

    fn add_box(
        &mut self, box_type: [u8; 4], contents: &[u8], _: bool
    ) -> Result<(), JxlErrors> {
        self.call("add_box")?;
        self.record
            .borrow_mut()
            .boxes
            .push((box_type, contents.to_vec()));
        Ok(())
    }

    fn close_input(&mut self) {
        self.log.borrow_mut().push("close_input");
    }

    fn process_output(&mut self, output: &mut [u8]) -> (EncoderStatus, usize) {
        self.log.borrow_mut().push("process_output");
        if self.fail_output {
            return (EncoderStatus::Error, 0);
        }
        let count = output.len().min(self.output.len() - self.position);
        output[..count].copy_from_slice(&self.output[self.position..self.position + count]);
        self.position += count;

        if self.position < self.output.len() {
            (EncoderStatus::NeedMoreOutput, count)
        } else {
            (EncoderStatus::Success, count)
        }
    }
}
