/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! This module represents a single image
//!
//! An image is represented as
//!
//! - a stack of layers
//!     - each holding one interleaved pixel buffer
//!         - in a colorspace and at the image precision
//!             - with the same width and height as the image
//!
//! Codecs only create images, insert layers, read layer buffers and
//! replace layer pixels, the rest of the image is theirs to describe
//! through the profile and metadata.
use prism_core::bit_depth::BitDepth;
use prism_core::colorspace::ColorSpace;
use prism_core::log::trace;

use crate::buffer::PixelBuffer;
use crate::errors::ImageErrors;
use crate::metadata::ImageMetadata;
use crate::profile::ColorProfile;

/// The color model pixels are expressed in
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk
}

/// Whether samples are linear light or perceptually encoded
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Trc {
    Linear,
    NonLinear
}

impl Trc {
    pub const fn from_linear(linear: bool) -> Trc {
        if linear {
            Trc::Linear
        } else {
            Trc::NonLinear
        }
    }

    pub const fn is_linear(self) -> bool {
        matches!(self, Trc::Linear)
    }
}

/// Storage precision of an image
///
/// One of six combinations of a transfer and a bit depth
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Precision {
    depth: BitDepth,
    trc:   Trc
}

impl Precision {
    pub const U8_LINEAR: Precision = Precision::new(BitDepth::Eight, Trc::Linear);
    pub const U8_NON_LINEAR: Precision = Precision::new(BitDepth::Eight, Trc::NonLinear);
    pub const U16_LINEAR: Precision = Precision::new(BitDepth::Sixteen, Trc::Linear);
    pub const U16_NON_LINEAR: Precision = Precision::new(BitDepth::Sixteen, Trc::NonLinear);
    pub const FLOAT_LINEAR: Precision = Precision::new(BitDepth::Float32, Trc::Linear);
    pub const FLOAT_NON_LINEAR: Precision = Precision::new(BitDepth::Float32, Trc::NonLinear);

    pub const fn new(depth: BitDepth, trc: Trc) -> Precision {
        Precision { depth, trc }
    }

    pub const fn depth(&self) -> BitDepth {
        self.depth
    }

    pub const fn trc(&self) -> Trc {
        self.trc
    }

    pub const fn is_linear(&self) -> bool {
        self.trc.is_linear()
    }
}

/// A single layer of an image
#[derive(Clone, Debug)]
pub struct Layer {
    name:       String,
    colorspace: ColorSpace,
    opacity:    f32,
    buffer:     PixelBuffer
}

impl Layer {
    /// Create a fully opaque layer
    ///
    /// # Errors
    /// If the buffer's channel count does not match the colorspace
    pub fn new(
        name: impl Into<String>, colorspace: ColorSpace, buffer: PixelBuffer
    ) -> Result<Layer, ImageErrors> {
        let expected = colorspace.num_components();
        if expected != buffer.format().num_channels() {
            return Err(ImageErrors::GenericString(format!(
                "Colorspace {colorspace:?} needs {expected} channels but the buffer has {}",
                buffer.format().num_channels()
            )));
        }
        Ok(Layer {
            name: name.into(),
            colorspace,
            opacity: 1.0,
            buffer
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn colorspace(&self) -> ColorSpace {
        self.colorspace
    }

    pub const fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set the layer opacity, clamped to `[0,1]`
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub const fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }
}

/// Represents a single image
#[derive(Clone, Debug)]
pub struct Image {
    width:              usize,
    height:             usize,
    base:               ColorModel,
    precision:          Precision,
    profile:            Option<ColorProfile>,
    simulation_profile: Option<ColorProfile>,
    layers:             Vec<Layer>,
    metadata:           ImageMetadata
}

impl Image {
    /// Create a new image with no layers
    ///
    /// `base` is the image's working color model, only gray and RGB images
    /// exist, CMYK data lives in RGB images
    pub fn new(
        width: usize, height: usize, base: ColorModel, precision: Precision
    ) -> Result<Image, ImageErrors> {
        if width == 0 || height == 0 {
            return Err(ImageErrors::ZeroOrOverflowDimensions(width, height));
        }
        if base == ColorModel::Cmyk {
            return Err(ImageErrors::GenericStr(
                "Images are gray or RGB, CMYK is a layer colorspace"
            ));
        }
        if precision.depth() == BitDepth::Unknown {
            return Err(ImageErrors::GenericStr("Image precision needs a known depth"));
        }
        Ok(Image {
            width,
            height,
            base,
            precision,
            profile: None,
            simulation_profile: None,
            layers: vec![],
            metadata: ImageMetadata::default()
        })
    }

    /// Get image dimensions as a tuple of (width,height)
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub const fn base(&self) -> ColorModel {
        self.base
    }

    pub const fn precision(&self) -> Precision {
        self.precision
    }

    pub const fn profile(&self) -> Option<&ColorProfile> {
        self.profile.as_ref()
    }

    pub fn set_profile(&mut self, profile: Option<ColorProfile>) {
        self.profile = profile;
    }

    pub const fn simulation_profile(&self) -> Option<&ColorProfile> {
        self.simulation_profile.as_ref()
    }

    pub fn set_simulation_profile(&mut self, profile: Option<ColorProfile>) {
        self.simulation_profile = profile;
    }

    /// The profile pixels are in: the attached one, or the sRGB
    /// preset for the base model and precision
    pub fn effective_profile(&self) -> ColorProfile {
        match &self.profile {
            Some(profile) => profile.clone(),
            None => ColorProfile::preset(self.base, self.precision.is_linear())
        }
    }

    pub const fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ImageMetadata {
        &mut self.metadata
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Insert a layer at `position`, clamped to the end of the stack
    ///
    /// # Errors
    /// If the layer dimensions differ from the image, or its samples are
    /// not stored at the image depth
    pub fn insert_layer(&mut self, layer: Layer, position: usize) -> Result<(), ImageErrors> {
        self.check_buffer(layer.buffer())?;

        trace!(
            "Inserting layer \"{}\" ({:?}) at {position}",
            layer.name(),
            layer.colorspace()
        );
        let position = position.min(self.layers.len());
        self.layers.insert(position, layer);
        Ok(())
    }

    pub fn layer(&self, index: usize) -> Result<&Layer, ImageErrors> {
        self.layers.get(index).ok_or(ImageErrors::NoLayer(index))
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer, ImageErrors> {
        self.layers.get_mut(index).ok_or(ImageErrors::NoLayer(index))
    }

    /// Get the pixel buffer of a layer
    pub fn layer_buffer(&self, index: usize) -> Result<&PixelBuffer, ImageErrors> {
        self.layer(index).map(Layer::buffer)
    }

    /// Replace the pixels of a layer
    ///
    /// The new buffer must have the layer's dimensions and pixel format,
    /// the old buffer is returned
    pub fn set_layer_pixels(
        &mut self, index: usize, buffer: PixelBuffer
    ) -> Result<PixelBuffer, ImageErrors> {
        let layer = self.layer(index)?;
        if layer.buffer.format() != buffer.format() {
            return Err(ImageErrors::GenericString(format!(
                "Layer format {:?} differs from the new pixels {:?}",
                layer.buffer.format(),
                buffer.format()
            )));
        }
        self.check_buffer(&buffer)?;

        let layer = self.layer_mut(index)?;
        Ok(core::mem::replace(&mut layer.buffer, buffer))
    }

    /// Take all layers out of the image
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
    }

    fn check_buffer(&self, buffer: &PixelBuffer) -> Result<(), ImageErrors> {
        if buffer.dimensions() != self.dimensions() {
            return Err(ImageErrors::DimensionsMisMatch(
                self.dimensions(),
                buffer.dimensions()
            ));
        }
        let depth = buffer.format().bit_type().to_depth();
        if depth != self.precision.depth() {
            return Err(ImageErrors::GenericString(format!(
                "Layer depth {depth:?} differs from image depth {:?}",
                self.precision.depth()
            )));
        }
        Ok(())
    }
}
