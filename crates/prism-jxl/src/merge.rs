/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Recombining CMYK planes
//!
//! JPEG XL stores the key of a CMYK image as an extra channel, decoders
//! hand it out in its own buffer next to the interleaved CMY buffer.
use prism_image::buffer::{PixelBuffer, PixelFormat, SampleBuffer};
use prism_image::errors::ImageErrors;

/// Interleave CMY and K samples into CMYK
///
/// `cmy` holds `cmy_channels` samples per pixel of which the first three are
/// cyan, magenta and yellow, `key` holds one sample per pixel.
/// `output` receives four samples per pixel.
pub fn merge_cmyk_samples<T: Copy>(cmy: &[T], cmy_channels: usize, key: &[T], output: &mut [T]) {
    for ((out, cmy), k) in output
        .chunks_exact_mut(4)
        .zip(cmy.chunks_exact(cmy_channels))
        .zip(key)
    {
        out[..3].copy_from_slice(&cmy[..3]);
        out[3] = *k;
    }
}

/// Merge a CMY(x) buffer and a key buffer into a four channel CMYK buffer
///
/// # Errors
/// If the buffers disagree on dimensions or sample type, or the CMY buffer
/// has fewer than three channels
pub fn merge_cmyk(cmy: &PixelBuffer, key: &PixelBuffer) -> Result<PixelBuffer, ImageErrors> {
    if cmy.dimensions() != key.dimensions() {
        return Err(ImageErrors::DimensionsMisMatch(
            cmy.dimensions(),
            key.dimensions()
        ));
    }
    let cmy_channels = cmy.format().num_channels();
    if cmy_channels < 3 {
        return Err(ImageErrors::InvalidChannelCount(cmy_channels));
    }
    if key.format().num_channels() != 1 {
        return Err(ImageErrors::InvalidChannelCount(key.format().num_channels()));
    }
    let format = PixelFormat::new(4, cmy.format().bit_type())?;
    let mut output = PixelBuffer::new_zeroed(cmy.width(), cmy.height(), format)?;

    match (cmy.samples(), key.samples(), output.samples_mut()) {
        (SampleBuffer::U8(c), SampleBuffer::U8(k), SampleBuffer::U8(o)) => {
            merge_cmyk_samples(c, cmy_channels, k, o);
        }
        (SampleBuffer::U16(c), SampleBuffer::U16(k), SampleBuffer::U16(o)) => {
            merge_cmyk_samples(c, cmy_channels, k, o);
        }
        (SampleBuffer::F32(c), SampleBuffer::F32(k), SampleBuffer::F32(o)) => {
            merge_cmyk_samples(c, cmy_channels, k, o);
        }
        _ => {
            return Err(ImageErrors::GenericStr(
                "CMY and key buffers use different sample types"
            ))
        }
    }
    Ok(output)
}
