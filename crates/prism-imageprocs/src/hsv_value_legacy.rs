/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! The legacy "HSV Value" layer mode
//!
//! The result keeps the hue and saturation of the base and takes the value
//! of the layer. It is then mixed over the base by the layer's coverage,
//! the alpha of the base is never changed.
//!
//! ## Algorithm
//! For every pixel
//! - `composite = hsv_to_rgb(base.h, base.s, layer.v)`
//! - `coverage = min(base.a, layer.a) * opacity * mask`
//! - `new_alpha = base.a + (1 - base.a) * coverage`
//! - if both are non zero, `ratio = coverage / new_alpha` and
//!   `out.rgb = composite * ratio + base.rgb * (1 - ratio)`
//! - otherwise `out.rgb = base.rgb`
//! - `out.a = base.a`
use prism_core::bit_depth::BitType;
use prism_core::colorspace::ColorSpace;
use prism_core::log::trace;
use prism_image::buffer::{PixelBuffer, SampleBuffer};
use prism_image::errors::ImageErrors;
use prism_image::image::Image;
use prism_image::traits::OperationsTrait;

use crate::hsv::{hsva_to_rgba, rgba_to_hsva};

fn check_lengths(
    base: &[f32], layer: &[f32], mask: Option<&[f32]>, output: &[f32]
) -> Result<usize, ImageErrors> {
    if base.len() % 4 != 0 {
        return Err(ImageErrors::GenericString(format!(
            "RGBA buffer of {} samples is not a whole number of pixels",
            base.len()
        )));
    }
    if layer.len() != base.len() {
        return Err(ImageErrors::LengthMisMatch(base.len(), layer.len()));
    }
    if output.len() != base.len() {
        return Err(ImageErrors::LengthMisMatch(base.len(), output.len()));
    }
    let pixels = base.len() / 4;
    if let Some(mask) = mask {
        if mask.len() != pixels {
            return Err(ImageErrors::LengthMisMatch(pixels, mask.len()));
        }
    }
    Ok(pixels)
}

/// Pixels converted to HSV at a time
const CHUNK_PIXELS: usize = 256;

/// Mix `composite` over `base` by the coverage of the pixel
#[inline(always)]
fn blend_pixel(
    base: &[f32], composite: &[f32], layer_alpha: f32, mask: f32, opacity: f32, out: &mut [f32]
) {
    let coverage = base[3].min(layer_alpha) * opacity * mask;
    let new_alpha = base[3] + (1.0 - base[3]) * coverage;

    if coverage != 0.0 && new_alpha != 0.0 {
        let ratio = coverage / new_alpha;
        let inverse = 1.0 - ratio;

        for c in 0..3 {
            out[c] = composite[c] * ratio + base[c] * inverse;
        }
    } else {
        out[..3].copy_from_slice(&base[..3]);
    }
    out[3] = base[3];
}

/// Blend `layer` onto `base` in HSV value mode, writing into `output`
///
/// All buffers are interleaved RGBA floats of the same length, the mask
/// holds one coverage sample per pixel.
///
/// Both inputs are converted to HSV a chunk at a time, the value of the
/// layer is copied over the base and the result converted back to RGB
/// before it is mixed over the base.
///
/// # Errors
/// If the buffers do not hold the same number of pixels
pub fn hsv_value_legacy(
    base: &[f32], layer: &[f32], mask: Option<&[f32]>, opacity: f32, output: &mut [f32]
) -> Result<(), ImageErrors> {
    check_lengths(base, layer, mask, output)?;

    let mut composite = [0.0_f32; CHUNK_PIXELS * 4];
    let mut layer_hsv = [0.0_f32; CHUNK_PIXELS * 4];

    let mut mask_chunks = mask.map(|x| x.chunks(CHUNK_PIXELS));

    for ((base, layer), output) in base
        .chunks(CHUNK_PIXELS * 4)
        .zip(layer.chunks(CHUNK_PIXELS * 4))
        .zip(output.chunks_mut(CHUNK_PIXELS * 4))
    {
        let samples = base.len();
        let composite = &mut composite[..samples];
        let layer_hsv = &mut layer_hsv[..samples];

        composite.copy_from_slice(base);
        layer_hsv.copy_from_slice(layer);
        rgba_to_hsva(composite);
        rgba_to_hsva(layer_hsv);

        for (dst, src) in composite.chunks_exact_mut(4).zip(layer_hsv.chunks_exact(4)) {
            dst[2] = src[2];
        }
        hsva_to_rgba(composite);

        let pixels = base
            .chunks_exact(4)
            .zip(composite.chunks_exact(4))
            .zip(layer.chunks_exact(4))
            .zip(output.chunks_exact_mut(4));

        match mask_chunks.as_mut().and_then(Iterator::next) {
            Some(mask) => {
                for ((((base, composite), layer), out), m) in pixels.zip(mask) {
                    blend_pixel(base, composite, layer[3], *m, opacity, out);
                }
            }
            None => {
                for (((base, composite), layer), out) in pixels {
                    blend_pixel(base, composite, layer[3], 1.0, opacity, out);
                }
            }
        }
    }
    Ok(())
}

/// Run [`hsv_value_legacy`] over row tiles on scoped threads
///
/// Every thread gets a disjoint run of whole rows of `width` pixels
///
/// # Errors
/// If the buffers do not hold the same number of pixels, or the pixel count
/// is not a whole number of rows
#[cfg(feature = "threads")]
pub fn process_tiled(
    base: &[f32], layer: &[f32], mask: Option<&[f32]>, opacity: f32, output: &mut [f32],
    width: usize, threads: usize
) -> Result<(), ImageErrors> {
    let pixels = check_lengths(base, layer, mask, output)?;

    if width == 0 || pixels % width != 0 {
        return Err(ImageErrors::GenericString(format!(
            "{pixels} pixels do not form rows of width {width}"
        )));
    }
    let rows = pixels / width;
    let rows_per_tile = rows.div_ceil(threads.max(1)).max(1);
    let tile_pixels = rows_per_tile * width;
    let tile = tile_pixels * 4;

    trace!("Blending {rows} rows in tiles of {rows_per_tile} rows");

    // lengths were checked, mask tiles line up with pixel tiles
    let mut mask_tiles = mask.map(|x| x.chunks(tile_pixels));

    std::thread::scope(|s| {
        let mut workers = vec![];

        for ((base, layer), output) in base
            .chunks(tile)
            .zip(layer.chunks(tile))
            .zip(output.chunks_mut(tile))
        {
            let mask = mask_tiles.as_mut().and_then(Iterator::next);

            workers.push(s.spawn(move || hsv_value_legacy(base, layer, mask, opacity, output)));
        }
        workers
            .into_iter()
            .map(|x| {
                x.join()
                    .map_err(|_| ImageErrors::GenericStr("Blend worker panicked"))?
            })
            .collect::<Result<Vec<()>, ImageErrors>>()
    })?;
    Ok(())
}

/// Composite a layer onto the bottom layer of an image in HSV value mode
///
/// Both the image layer and the blended layer must be RGBA floats
pub struct HsvValueLegacy<'src> {
    layer:   &'src PixelBuffer,
    mask:    Option<&'src [f32]>,
    opacity: f32
}

impl<'src> HsvValueLegacy<'src> {
    /// Create a new blend
    ///
    /// # Arguments
    /// - layer: The pixels whose value is taken, RGBA floats
    /// - opacity: Opacity of the layer, clamped to `[0,1]`
    #[must_use]
    pub fn new(layer: &'src PixelBuffer, opacity: f32) -> HsvValueLegacy<'src> {
        HsvValueLegacy {
            layer,
            mask: None,
            opacity: opacity.clamp(0.0, 1.0)
        }
    }

    /// Scale the coverage of each pixel by a mask sample
    #[must_use]
    pub fn set_mask(mut self, mask: &'src [f32]) -> Self {
        self.mask = Some(mask);
        self
    }
}

impl<'src> OperationsTrait for HsvValueLegacy<'src> {
    fn name(&self) -> &'static str {
        "HSV value (legacy)"
    }

    fn execute_impl(&self, image: &mut Image) -> Result<(), ImageErrors> {
        let colorspace = image.layer(0)?.colorspace();
        if colorspace != ColorSpace::RGBA {
            return Err(ImageErrors::UnsupportedColorspace(
                colorspace,
                self.name(),
                &[ColorSpace::RGBA]
            ));
        }
        let base = image.layer_buffer(0)?;
        if base.dimensions() != self.layer.dimensions() {
            return Err(ImageErrors::DimensionsMisMatch(
                base.dimensions(),
                self.layer.dimensions()
            ));
        }
        let (Some(base_samples), Some(layer_samples)) =
            (base.samples().as_f32(), self.layer.samples().as_f32())
        else {
            let bit_type = match base.format().bit_type() {
                BitType::F32 => self.layer.format().bit_type(),
                other => other
            };
            return Err(ImageErrors::UnsupportedBitType(self.name(), bit_type));
        };
        if self.layer.format().num_channels() != 4 {
            return Err(ImageErrors::InvalidChannelCount(
                self.layer.format().num_channels()
            ));
        }

        trace!(
            "Blending a {:?} layer at opacity {}, masked: {}",
            base.dimensions(),
            self.opacity,
            self.mask.is_some()
        );
        let mut output = SampleBuffer::try_zeroed(BitType::F32, base_samples.len())?;
        let out = output
            .as_f32_mut()
            .ok_or(ImageErrors::GenericStr("Allocated the wrong sample type"))?;

        #[cfg(feature = "threads")]
        {
            let threads = prism_core::options::default_num_threads();
            process_tiled(
                base_samples,
                layer_samples,
                self.mask,
                self.opacity,
                out,
                base.width(),
                threads
            )?;
        }
        #[cfg(not(feature = "threads"))]
        {
            hsv_value_legacy(base_samples, layer_samples, self.mask, self.opacity, out)?;
        }

        let (width, height) = base.dimensions();
        let pixels = PixelBuffer::from_samples(width, height, base.format(), output)?;
        image.set_layer_pixels(0, pixels)?;
        Ok(())
    }
}
